use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgcrud::{ColumnRef, StatementBuilder};

fn columns(n: usize) -> Vec<ColumnRef> {
    (0..n)
        .map(|i| {
            if i % 4 == 3 {
                ColumnRef::append(format!("col{i}")).unwrap()
            } else {
                ColumnRef::plain(format!("col{i}")).unwrap()
            }
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let builder = StatementBuilder::postgres();
    let mut group = c.benchmark_group("statement_builder");

    for n in [1, 5, 10, 50, 100] {
        let cols = columns(n);
        let condition = format!("WHERE id = ${}", n + 1);

        group.bench_with_input(BenchmarkId::new("select", n), &cols, |b, cols| {
            b.iter(|| black_box(builder.build_select(cols, "t", "WHERE id = $1").unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("update", n), &cols, |b, cols| {
            b.iter(|| black_box(builder.build_update(cols, "t", &condition, n + 1).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("insert", n), &cols, |b, cols| {
            b.iter(|| black_box(builder.build_insert(cols, "t", "id").unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("delete", n), &cols, |b, cols| {
            b.iter(|| black_box(builder.build_delete(cols, "t").unwrap()));
        });
    }

    group.finish();
}

fn bench_alias_resolution(c: &mut Criterion) {
    let cols = ColumnRef::parse_all(&["id", "u.name AS user_name", "count(*) as total"]).unwrap();
    c.bench_function("statement_builder/record_keys", |b| {
        b.iter(|| {
            black_box(
                cols.iter()
                    .map(ColumnRef::record_key)
                    .collect::<Vec<_>>(),
            )
        });
    });
}

criterion_group!(benches, bench_build, bench_alias_resolution);
criterion_main!(benches);
