//! Statement construction from column lists.
//!
//! Every operation here is pure: it turns a table name, a list of
//! [`ColumnRef`]s and an optional condition fragment into SQL text. All
//! placeholder numbering goes through one [`Placeholders`] counter, so for
//! `n` columns the indices used are exactly `1..=n`, in column order.
//!
//! # Example
//!
//! ```ignore
//! use pgcrud::{ColumnRef, StatementBuilder};
//!
//! let columns = ColumnRef::parse_all(&["user_id", "tenant_id"])?;
//! let sql = StatementBuilder::postgres().build_delete(&columns, "users")?;
//! assert_eq!(sql, "DELETE FROM users WHERE user_id = $1 AND tenant_id = $2");
//! # Ok::<(), pgcrud::DbError>(())
//! ```

use crate::error::{DbError, DbResult};
use regex::Regex;
use std::fmt;
use std::fmt::Write as _;
use std::sync::OnceLock;
use tokio_postgres::types::ToSql;

/// Suffix marking a column for `array_append` in UPDATE statements.
pub const APPEND_SUFFIX: &str = ".append";

/// How an UPDATE assigns to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modifier {
    /// `col = $i`
    #[default]
    Plain,
    /// `col = array_append(col, $i)`
    ArrayAppend,
}

/// A column identifier plus its update modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    name: String,
    modifier: Modifier,
}

impl ColumnRef {
    /// Parse a column, recognizing the `name.append` suffix.
    ///
    /// The suffix must match exactly; `appended_at` is a plain column.
    pub fn parse(raw: &str) -> DbResult<Self> {
        let raw = raw.trim();
        let (name, modifier) = match raw.strip_suffix(APPEND_SUFFIX) {
            Some(base) => (base.trim_end(), Modifier::ArrayAppend),
            None => (raw, Modifier::Plain),
        };
        if name.is_empty() {
            return Err(DbError::config(format!("empty column name in {raw:?}")));
        }
        Ok(Self {
            name: name.to_string(),
            modifier,
        })
    }

    /// Parse a whole column list, preserving order.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> DbResult<Vec<Self>> {
        raw.iter().map(|c| Self::parse(c.as_ref())).collect()
    }

    /// A plain column.
    pub fn plain(name: impl Into<String>) -> DbResult<Self> {
        Self::with_modifier(name.into(), Modifier::Plain)
    }

    /// A column updated with `array_append`.
    pub fn append(name: impl Into<String>) -> DbResult<Self> {
        Self::with_modifier(name.into(), Modifier::ArrayAppend)
    }

    fn with_modifier(name: String, modifier: Modifier) -> DbResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::config("empty column name"));
        }
        Ok(Self {
            name: name.to_string(),
            modifier,
        })
    }

    /// Column text without the modifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    /// Record key for this column in a select list.
    ///
    /// The key is the identifier after the last standalone `AS` (any case),
    /// with surrounding double quotes removed. Without an alias it is the
    /// column text itself.
    pub fn record_key(&self) -> String {
        static ALIAS: OnceLock<Regex> = OnceLock::new();
        let re = ALIAS.get_or_init(|| {
            Regex::new(r#"(?is)^.*\s+as\s+((?:"(?:[^"]|"")+")|(?:[A-Za-z_][A-Za-z0-9_$]*))\s*$"#)
                .expect("alias pattern is valid")
        });

        match re.captures(&self.name).and_then(|c| c.get(1)) {
            Some(alias) => {
                let alias = alias.as_str();
                match alias.strip_prefix('"').and_then(|a| a.strip_suffix('"')) {
                    Some(quoted) => quoted.replace("\"\"", "\""),
                    None => alias.to_string(),
                }
            }
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Modifier::Plain => f.write_str(&self.name),
            Modifier::ArrayAppend => write!(f, "{}{APPEND_SUFFIX}", self.name),
        }
    }
}

/// Placeholder style of the target driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Numbered `$1, $2, ...` (PostgreSQL).
    #[default]
    Postgres,
    /// Anonymous `?` markers, bound strictly by position.
    QuestionMark,
}

/// Issues placeholders in order.
///
/// This is the only place placeholder indices are computed.
#[derive(Debug, Clone)]
pub struct Placeholders {
    dialect: Dialect,
    issued: usize,
}

impl Placeholders {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect, issued: 0 }
    }

    /// Append the next placeholder to `out` and return its 1-based index.
    pub fn push_next(&mut self, out: &mut String) -> usize {
        self.issued += 1;
        match self.dialect {
            Dialect::Postgres => {
                let _ = write!(out, "${}", self.issued);
            }
            Dialect::QuestionMark => out.push('?'),
        }
        self.issued
    }

    /// Number of placeholders issued so far.
    pub fn issued(&self) -> usize {
        self.issued
    }
}

/// Statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Select,
    Update,
    Insert,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::Update => "UPDATE",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
        })
    }
}

/// Builds SELECT/UPDATE/INSERT/DELETE text from column lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementBuilder {
    dialect: Dialect,
}

impl StatementBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Builder emitting `$n` placeholders.
    pub fn postgres() -> Self {
        Self::new(Dialect::Postgres)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `SELECT c1, c2, ... FROM table condition`
    ///
    /// Returns the SQL and the record key of each column, in order.
    pub fn build_select(
        &self,
        columns: &[ColumnRef],
        table: &str,
        condition: &str,
    ) -> DbResult<(String, Vec<String>)> {
        require_columns(columns, "select")?;
        require_table(table)?;

        let mut sql = String::from("SELECT ");
        push_names(&mut sql, columns);
        sql.push_str(" FROM ");
        sql.push_str(table);
        push_condition(&mut sql, condition);

        let keys = columns.iter().map(ColumnRef::record_key).collect();
        Ok((sql, keys))
    }

    /// `UPDATE table SET c1 = $1, c2 = array_append(c2, $2) ... condition`
    ///
    /// `param_count` is the total number of parameters the caller will bind.
    /// The condition's own placeholders must start at `columns.len() + 1`;
    /// that is not checked here.
    pub fn build_update(
        &self,
        columns: &[ColumnRef],
        table: &str,
        condition: &str,
        param_count: usize,
    ) -> DbResult<String> {
        require_columns(columns, "update")?;
        require_table(table)?;
        if param_count < columns.len() {
            return Err(DbError::config(format!(
                "update of {} columns needs at least {} parameters, got {param_count}",
                columns.len(),
                columns.len()
            )));
        }

        let mut placeholders = Placeholders::new(self.dialect);
        let mut sql = format!("UPDATE {table} SET ");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(column.name());
            sql.push_str(" = ");
            match column.modifier() {
                Modifier::Plain => {
                    placeholders.push_next(&mut sql);
                }
                Modifier::ArrayAppend => {
                    sql.push_str("array_append(");
                    sql.push_str(column.name());
                    sql.push_str(", ");
                    placeholders.push_next(&mut sql);
                    sql.push(')');
                }
            }
        }
        push_condition(&mut sql, condition);
        Ok(sql)
    }

    /// `INSERT INTO table (c1, ...) VALUES ($1, ...) RETURNING pk`
    pub fn build_insert(
        &self,
        columns: &[ColumnRef],
        table: &str,
        primary_key: &str,
    ) -> DbResult<String> {
        require_columns(columns, "insert")?;
        require_table(table)?;
        if primary_key.trim().is_empty() {
            return Err(DbError::config("insert needs a primary key column to return"));
        }

        let mut placeholders = Placeholders::new(self.dialect);
        let mut sql = format!("INSERT INTO {table} (");
        push_names(&mut sql, columns);
        sql.push_str(") VALUES (");
        for i in 0..columns.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            placeholders.push_next(&mut sql);
        }
        sql.push_str(") RETURNING ");
        sql.push_str(primary_key.trim());
        Ok(sql)
    }

    /// `DELETE FROM table WHERE c1 = $1 AND c2 = $2 ...`
    pub fn build_delete(&self, columns: &[ColumnRef], table: &str) -> DbResult<String> {
        require_columns(columns, "delete")?;
        require_table(table)?;

        let mut placeholders = Placeholders::new(self.dialect);
        let mut sql = format!("DELETE FROM {table} WHERE ");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            sql.push_str(column.name());
            sql.push_str(" = ");
            placeholders.push_next(&mut sql);
        }
        Ok(sql)
    }
}

fn require_columns(columns: &[ColumnRef], verb: &str) -> DbResult<()> {
    if columns.is_empty() {
        return Err(DbError::config(format!("no columns given for {verb}")));
    }
    Ok(())
}

fn require_table(table: &str) -> DbResult<()> {
    if table.trim().is_empty() {
        return Err(DbError::config("empty table name"));
    }
    Ok(())
}

fn push_names(sql: &mut String, columns: &[ColumnRef]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(column.name());
    }
}

fn push_condition(sql: &mut String, condition: &str) {
    let condition = condition.trim();
    if !condition.is_empty() {
        sql.push(' ');
        sql.push_str(condition);
    }
}

/// A built statement together with its parameters.
///
/// Immutable once constructed.
pub struct Statement<'p> {
    verb: Verb,
    sql: String,
    params: Vec<&'p (dyn ToSql + Sync)>,
}

impl<'p> Statement<'p> {
    pub fn new(verb: Verb, sql: impl Into<String>, params: &[&'p (dyn ToSql + Sync)]) -> Self {
        Self {
            verb,
            sql: sql.into(),
            params: params.to_vec(),
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[&'p (dyn ToSql + Sync)] {
        &self.params
    }

    /// `Debug` rendering of each parameter, for diagnostics.
    pub fn rendered_params(&self) -> Vec<String> {
        self.params.iter().map(|p| format!("{p:?}")).collect()
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("verb", &self.verb)
            .field("sql", &self.sql)
            .field("params", &self.rendered_params())
            .finish()
    }
}

#[cfg(test)]
mod tests;
