//! Generic row decoding into ordered [`Record`]s.

use crate::error::{DbError, DbResult};
use crate::value::{Record, Value};
use std::error::Error;
use std::net::IpAddr;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};

/// A result row whose columns can be scanned into [`Value`]s.
pub trait ScanRow {
    /// Number of columns in the row.
    fn width(&self) -> usize;

    /// Column name as reported by the server.
    fn column_name(&self, idx: usize) -> &str;

    /// Decode column `idx`. SQL `NULL` becomes [`Value::Null`].
    fn scan(&self, idx: usize) -> DbResult<Value>;
}

impl ScanRow for Row {
    fn width(&self) -> usize {
        self.len()
    }

    fn column_name(&self, idx: usize) -> &str {
        self.columns()[idx].name()
    }

    fn scan(&self, idx: usize) -> DbResult<Value> {
        scan_column(self, idx).map_err(|e| {
            DbError::scan(format!("column '{}': {e}", self.columns()[idx].name()))
        })
    }
}

/// Decode every row, keying values by `columns`.
///
/// `columns` is the resolved select list (see
/// [`ColumnRef::record_key`](crate::ColumnRef::record_key)). A select list of
/// exactly `*` keys each row by the server's column names instead.
///
/// Fails on the first row that cannot be decoded; nothing decoded so far is
/// returned in that case.
pub fn decode<R, I>(rows: I, columns: &[String]) -> DbResult<Vec<Record>>
where
    R: ScanRow,
    I: IntoIterator<Item = R>,
{
    let wildcard = is_wildcard(columns);
    rows.into_iter()
        .map(|row| decode_row(&row, columns, wildcard))
        .collect()
}

fn is_wildcard(columns: &[String]) -> bool {
    matches!(columns, [only] if only.trim() == "*")
}

fn decode_row<R: ScanRow>(row: &R, columns: &[String], wildcard: bool) -> DbResult<Record> {
    let width = row.width();
    if !wildcard && width != columns.len() {
        return Err(DbError::scan(format!(
            "row has {width} columns, select list has {}",
            columns.len()
        )));
    }

    let slots = (0..width)
        .map(|idx| row.scan(idx))
        .collect::<DbResult<Vec<Value>>>()?;

    let mut record = Record::with_capacity(width);
    for (idx, value) in slots.into_iter().enumerate() {
        let key = if wildcard {
            row.column_name(idx).to_string()
        } else {
            columns[idx].clone()
        };
        record.insert(key, value);
    }
    Ok(record)
}

type ScanResult = Result<Value, Box<dyn Error + Sync + Send>>;

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, wrap: impl FnOnce(T) -> Value) -> ScanResult {
    Ok(row.try_get::<_, Option<T>>(idx)?.map_or(Value::Null, wrap))
}

fn get_array<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, wrap: impl Fn(T) -> Value) -> ScanResult {
    let Some(items) = row.try_get::<_, Option<Vec<Option<T>>>>(idx)? else {
        return Ok(Value::Null);
    };
    Ok(Value::Array(
        items
            .into_iter()
            .map(|item| item.map_or(Value::Null, &wrap))
            .collect(),
    ))
}

fn scan_column(row: &Row, idx: usize) -> ScanResult {
    let ty = row.columns()[idx].type_();
    match *ty {
        Type::BOOL => get(row, idx, Value::Bool),
        Type::INT2 => get(row, idx, |v: i16| Value::Int(v.into())),
        Type::INT4 => get(row, idx, |v: i32| Value::Int(v.into())),
        Type::INT8 => get(row, idx, Value::Int),
        Type::OID => get(row, idx, |v: u32| Value::Int(v.into())),
        Type::FLOAT4 => get(row, idx, |v: f32| Value::Float(v.into())),
        Type::FLOAT8 => get(row, idx, Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get(row, idx, Value::Text)
        }
        Type::BYTEA => get(row, idx, Value::Bytes),
        Type::TIMESTAMP => get(row, idx, Value::Timestamp),
        Type::TIMESTAMPTZ => get(row, idx, Value::TimestampTz),
        Type::DATE => get(row, idx, Value::Date),
        Type::TIME => get(row, idx, Value::Time),
        Type::UUID => get(row, idx, Value::Uuid),
        Type::JSON | Type::JSONB => get(row, idx, Value::Json),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => get(row, idx, Value::Numeric),

        Type::BOOL_ARRAY => get_array(row, idx, Value::Bool),
        Type::INT2_ARRAY => get_array(row, idx, |v: i16| Value::Int(v.into())),
        Type::INT4_ARRAY => get_array(row, idx, |v: i32| Value::Int(v.into())),
        Type::INT8_ARRAY => get_array(row, idx, Value::Int),
        Type::FLOAT4_ARRAY => get_array(row, idx, |v: f32| Value::Float(v.into())),
        Type::FLOAT8_ARRAY => get_array(row, idx, Value::Float),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY | Type::NAME_ARRAY => {
            get_array(row, idx, Value::Text)
        }
        Type::UUID_ARRAY => get_array(row, idx, Value::Uuid),
        Type::OID_ARRAY => get_array(row, idx, |v: u32| Value::Int(v.into())),
        Type::BYTEA_ARRAY => get_array(row, idx, Value::Bytes),
        Type::TIMESTAMP_ARRAY => get_array(row, idx, Value::Timestamp),
        Type::TIMESTAMPTZ_ARRAY => get_array(row, idx, Value::TimestampTz),
        Type::DATE_ARRAY => get_array(row, idx, Value::Date),
        Type::TIME_ARRAY => get_array(row, idx, Value::Time),
        Type::JSON_ARRAY | Type::JSONB_ARRAY => get_array(row, idx, Value::Json),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC_ARRAY => get_array(row, idx, Value::Numeric),

        Type::INET => get(row, idx, |v: IpAddr| Value::Text(v.to_string())),
        Type::VOID => Ok(Value::Null),

        _ if is_enum(ty) => get(row, idx, |v: EnumLabel| Value::Text(v.0)),
        _ if matches!(ty.kind(), Kind::Array(member) if is_enum(member)) => {
            get_array(row, idx, |v: EnumLabel| Value::Text(v.0))
        }
        // citext, ltree and other text-like extension types
        _ if <String as FromSql<'_>>::accepts(ty) => get(row, idx, Value::Text),
        _ if <Vec<String> as FromSql<'_>>::accepts(ty) => get_array(row, idx, Value::Text),
        _ => match row.try_get::<_, Option<Opaque>>(idx)? {
            None => Ok(Value::Null),
            Some(Opaque) => Err(format!("unsupported column type '{}'", ty.name()).into()),
        },
    }
}

fn is_enum(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_))
}

/// Label of a user-defined enum value; sent as text in the binary protocol.
struct EnumLabel(String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        is_enum(ty)
    }
}

/// A non-NULL cell of a type with no [`Value`] mapping.
struct Opaque;

impl<'a> FromSql<'a> for Opaque {
    fn from_sql(_: &Type, _: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self)
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}
