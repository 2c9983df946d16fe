use super::*;

fn cols(raw: &[&str]) -> Vec<ColumnRef> {
    ColumnRef::parse_all(raw).unwrap()
}

#[test]
fn select_joins_columns_in_call_order() {
    let b = StatementBuilder::postgres();
    let (sql, keys) = b
        .build_select(&cols(&["id", "username", "email"]), "users", "WHERE id = $1")
        .unwrap();

    assert_eq!(sql, "SELECT id, username, email FROM users WHERE id = $1");
    assert_eq!(keys, vec!["id", "username", "email"]);
}

#[test]
fn select_single_column_without_condition() {
    let b = StatementBuilder::postgres();
    let (sql, keys) = b.build_select(&cols(&["id"]), "public.users", "").unwrap();

    assert_eq!(sql, "SELECT id FROM public.users");
    assert_eq!(keys, vec!["id"]);
}

#[test]
fn select_projection_count_matches_column_count() {
    let b = StatementBuilder::postgres();
    for k in 1..=12 {
        let names: Vec<String> = (0..k).map(|i| format!("c{i}")).collect();
        let columns = ColumnRef::parse_all(&names).unwrap();
        let (sql, keys) = b.build_select(&columns, "t", "").unwrap();

        let projection = sql
            .strip_prefix("SELECT ")
            .and_then(|s| s.strip_suffix(" FROM t"))
            .unwrap();
        let parts: Vec<&str> = projection.split(", ").collect();
        assert_eq!(parts, names);
        assert_eq!(keys, names);
    }
}

#[test]
fn select_resolves_aliases_for_record_keys() {
    let b = StatementBuilder::postgres();
    let (sql, keys) = b
        .build_select(
            &cols(&[
                "u.id",
                "u.name AS user_name",
                "count(*) as total",
                r#"email As "Primary Email""#,
                "cast(score as int)",
            ]),
            "users u",
            "GROUP BY u.id",
        )
        .unwrap();

    assert_eq!(
        sql,
        r#"SELECT u.id, u.name AS user_name, count(*) as total, email As "Primary Email", cast(score as int) FROM users u GROUP BY u.id"#
    );
    assert_eq!(
        keys,
        vec![
            "u.id",
            "user_name",
            "total",
            "Primary Email",
            "cast(score as int)"
        ]
    );
}

#[test]
fn alias_uses_last_as_keyword() {
    let c = ColumnRef::parse("(SELECT name AS n FROM t LIMIT 1) AS first_name").unwrap();
    assert_eq!(c.record_key(), "first_name");

    let c = ColumnRef::parse(r#"name AS "say ""hi""""#).unwrap();
    assert_eq!(c.record_key(), r#"say "hi""#);

    let c = ColumnRef::parse("alias_count").unwrap();
    assert_eq!(c.record_key(), "alias_count");
}

#[test]
fn select_ignores_append_modifier() {
    let b = StatementBuilder::postgres();
    let (sql, keys) = b.build_select(&cols(&["tags.append"]), "posts", "").unwrap();
    assert_eq!(sql, "SELECT tags FROM posts");
    assert_eq!(keys, vec!["tags"]);
}

#[test]
fn update_numbers_columns_from_one() {
    let b = StatementBuilder::postgres();
    let sql = b
        .build_update(&cols(&["name", "email", "age"]), "users", "WHERE id = $4", 4)
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE users SET name = $1, email = $2, age = $3 WHERE id = $4"
    );
}

#[test]
fn update_single_column() {
    let b = StatementBuilder::postgres();
    let sql = b
        .build_update(&cols(&["name"]), "users", "WHERE id = $2", 2)
        .unwrap();
    assert_eq!(sql, "UPDATE users SET name = $1 WHERE id = $2");
}

#[test]
fn update_array_append_keeps_numbering() {
    let b = StatementBuilder::postgres();
    let sql = b
        .build_update(
            &cols(&["title", "tags.append", "views"]),
            "posts",
            "WHERE id = $4",
            4,
        )
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE posts SET title = $1, tags = array_append(tags, $2), views = $3 WHERE id = $4"
    );
}

#[test]
fn update_array_append_on_last_column() {
    let b = StatementBuilder::postgres();
    let sql = b
        .build_update(&cols(&["title", "tags.append"]), "posts", "", 2)
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE posts SET title = $1, tags = array_append(tags, $2)"
    );
}

#[test]
fn update_rejects_too_few_params() {
    let b = StatementBuilder::postgres();
    let err = b
        .build_update(&cols(&["a", "b"]), "t", "", 1)
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn append_suffix_must_match_exactly() {
    let c = ColumnRef::parse("appended_at").unwrap();
    assert_eq!(c.modifier(), Modifier::Plain);
    assert_eq!(c.name(), "appended_at");

    let c = ColumnRef::parse("history.append").unwrap();
    assert_eq!(c.modifier(), Modifier::ArrayAppend);
    assert_eq!(c.name(), "history");
    assert_eq!(c.to_string(), "history.append");

    assert!(ColumnRef::parse(".append").unwrap_err().is_config());
    assert!(ColumnRef::parse("  ").unwrap_err().is_config());
    assert!(ColumnRef::append("").unwrap_err().is_config());
}

#[test]
fn constructors_trim_like_parse() {
    let b = StatementBuilder::postgres();
    let columns = vec![
        ColumnRef::plain(" id ").unwrap(),
        ColumnRef::append("\ttags ").unwrap(),
    ];
    assert_eq!(columns[0], ColumnRef::parse("  id").unwrap());
    assert_eq!(columns[1].name(), "tags");

    let (sql, keys) = b.build_select(&columns[..1], "users", "").unwrap();
    assert_eq!(sql, "SELECT id FROM users");
    assert_eq!(keys, vec!["id"]);

    let sql = b.build_update(&columns, "users", "WHERE id = $3", 3).unwrap();
    assert_eq!(sql, "UPDATE users SET id = $1, tags = array_append(tags, $2) WHERE id = $3");
}

#[test]
fn insert_has_one_placeholder_per_column_and_returning() {
    let b = StatementBuilder::postgres();
    let sql = b
        .build_insert(&cols(&["username", "email", "age"]), "users", "id")
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO users (username, email, age) VALUES ($1, $2, $3) RETURNING id"
    );
}

#[test]
fn insert_requires_primary_key() {
    let b = StatementBuilder::postgres();
    assert!(b.build_insert(&cols(&["a"]), "t", " ").unwrap_err().is_config());
}

#[test]
fn delete_builds_conjunctive_predicates() {
    let b = StatementBuilder::postgres();
    let sql = b
        .build_delete(&cols(&["user_id", "tenant_id"]), "users")
        .unwrap();
    assert_eq!(
        sql,
        "DELETE FROM users WHERE user_id = $1 AND tenant_id = $2"
    );
}

#[test]
fn delete_single_column() {
    let b = StatementBuilder::postgres();
    let sql = b.build_delete(&cols(&["id"]), "users").unwrap();
    assert_eq!(sql, "DELETE FROM users WHERE id = $1");
}

#[test]
fn every_builder_rejects_empty_columns() {
    let b = StatementBuilder::postgres();
    assert!(b.build_select(&[], "t", "").unwrap_err().is_config());
    assert!(b.build_update(&[], "t", "", 0).unwrap_err().is_config());
    assert!(b.build_insert(&[], "t", "id").unwrap_err().is_config());
    assert!(b.build_delete(&[], "t").unwrap_err().is_config());
}

#[test]
fn every_builder_rejects_empty_table() {
    let b = StatementBuilder::postgres();
    let c = cols(&["id"]);
    assert!(b.build_select(&c, "", "").unwrap_err().is_config());
    assert!(b.build_update(&c, " ", "", 1).unwrap_err().is_config());
    assert!(b.build_insert(&c, "", "id").unwrap_err().is_config());
    assert!(b.build_delete(&c, "").unwrap_err().is_config());
}

#[test]
fn placeholders_are_contiguous() {
    let mut p = Placeholders::new(Dialect::Postgres);
    let mut out = String::new();
    for expected in 1..=5 {
        assert_eq!(p.push_next(&mut out), expected);
        out.push(' ');
    }
    assert_eq!(out, "$1 $2 $3 $4 $5 ");
    assert_eq!(p.issued(), 5);
}

#[test]
fn question_mark_dialect() {
    let b = StatementBuilder::new(Dialect::QuestionMark);
    assert_eq!(
        b.build_delete(&cols(&["a", "b"]), "t").unwrap(),
        "DELETE FROM t WHERE a = ? AND b = ?"
    );
    assert_eq!(
        b.build_insert(&cols(&["a", "b"]), "t", "id").unwrap(),
        "INSERT INTO t (a, b) VALUES (?, ?) RETURNING id"
    );
    assert_eq!(
        b.build_update(&cols(&["a", "tags.append"]), "t", "WHERE id = ?", 3)
            .unwrap(),
        "UPDATE t SET a = ?, tags = array_append(tags, ?) WHERE id = ?"
    );
}

#[test]
fn statement_renders_params_for_diagnostics() {
    let id = 7_i64;
    let name = "alice";
    let stmt = Statement::new(
        Verb::Update,
        "UPDATE users SET name = $1 WHERE id = $2",
        &[&name, &id],
    );
    assert_eq!(stmt.verb(), Verb::Update);
    assert_eq!(stmt.params().len(), 2);
    assert_eq!(stmt.rendered_params(), vec!["\"alice\"", "7"]);
}
