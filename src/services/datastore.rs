//! Embedded analytical datastore (SQLite)
//!
//! Runs model-generated SQL with a read-only guard and a row cap, and exposes
//! catalogue introspection used to build schema context for prompts.

use futures::TryStreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Row, SqlitePool, TypeInfo, ValueRef};
use std::fmt::Write;
use std::time::Instant;

use crate::config::DatastoreConfig;
use crate::utils::{ApiError, ApiResult};

static STRING_LITERAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*""#).unwrap());

static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*|/\*[\s\S]*?\*/").unwrap());

static MUTATING_KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|CREATE|TRUNCATE|ATTACH|DETACH|VACUUM|REINDEX|PRAGMA|GRANT|REVOKE|COMMIT|ROLLBACK|BEGIN)\b|\bREPLACE\s+INTO\b|\bOR\s+REPLACE\b",
    )
    .unwrap()
});

const READ_PREFIXES: [&str; 4] = ["SELECT", "WITH", "EXPLAIN", "VALUES"];

/// A single result cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Real(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(i) => json!(i),
            Self::Real(f) => json!(f),
            Self::Text(s) => json!(s),
            Self::Blob(b) => json!(format!("<{} bytes>", b.len())),
        }
    }

    /// Table cell text; reals use two decimals
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(i) => i.to_string(),
            Self::Real(f) => format!("{:.2}", f),
            Self::Text(s) => s.replace('|', "\\|").replace('\n', " "),
            Self::Blob(b) => format!("<{} bytes>", b.len()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Rows beyond the configured cap were dropped
    pub truncated: bool,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pipe-style markdown table. Numeric columns are right aligned; a
    /// result without columns renders as an empty string.
    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let rendered: Vec<Vec<String>> =
            self.rows.iter().map(|row| row.iter().map(CellValue::render).collect()).collect();

        let ncols = self.columns.len();
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate().take(ncols) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let numeric: Vec<bool> = (0..ncols)
            .map(|i| {
                let mut non_null = self.rows.iter().filter_map(|r| r.get(i)).filter(|c| **c != CellValue::Null).peekable();
                non_null.peek().is_some() && non_null.all(CellValue::is_numeric)
            })
            .collect();

        let pad = |text: &str, width: usize, right: bool| {
            let fill = width.saturating_sub(text.chars().count());
            if right {
                format!("{}{}", " ".repeat(fill), text)
            } else {
                format!("{}{}", text, " ".repeat(fill))
            }
        };

        let mut out = String::new();
        out.push('|');
        for (i, col) in self.columns.iter().enumerate() {
            let _ = write!(out, " {} |", pad(col, widths[i], numeric[i]));
        }
        out.push('\n');

        out.push('|');
        for i in 0..ncols {
            let dashes = "-".repeat(widths[i] + 1);
            if numeric[i] {
                let _ = write!(out, "{}:|", dashes);
            } else {
                let _ = write!(out, ":{}|", dashes);
            }
        }

        for row in &rendered {
            out.push_str("\n|");
            for i in 0..ncols {
                let cell = row.get(i).map(String::as_str).unwrap_or_default();
                let _ = write!(out, " {} |", pad(cell, widths[i], numeric[i]));
            }
        }
        out
    }

    /// One `{"col": value, ...}` line per row, columns in result order
    pub fn row_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                let fields: Vec<String> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, cell)| format!("{}: {}", json!(col), cell.to_json()))
                    .collect();
                format!("{{{}}}", fields.join(", "))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<String>,
}

impl TableSchema {
    /// One-line description embedded for schema retrieval
    pub fn description(&self) -> String {
        format!("Table {}: Columns are {}.", self.table, self.columns.join(", "))
    }
}

#[derive(Clone)]
pub struct SqlDatastore {
    pool: SqlitePool,
    read_only: bool,
    max_rows: usize,
}

impl SqlDatastore {
    pub fn new(pool: SqlitePool, config: &DatastoreConfig) -> Self {
        Self { pool, read_only: config.read_only, max_rows: config.max_rows.max(1) }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Execute a query and return its rows
    pub async fn execute(&self, sql: &str) -> ApiResult<QueryResult> {
        let sql = sql.trim().trim_end_matches(';').trim();
        if sql.is_empty() {
            return Err(ApiError::invalid_sql("SQL query is empty"));
        }
        if self.read_only {
            validate_read_only(sql)?;
        }

        let start = Instant::now();
        let mut rows = Vec::new();
        let mut truncated = false;
        {
            let mut stream = sqlx::query(sql).fetch(&self.pool);
            while let Some(row) = stream.try_next().await.map_err(|e| {
                tracing::error!("SQL execution failed: {}", e);
                ApiError::invalid_sql(e.to_string())
            })? {
                if rows.len() == self.max_rows {
                    truncated = true;
                    break;
                }
                rows.push(row);
            }
        }
        if truncated {
            tracing::warn!("Query returned more than {} rows, keeping the first ones", self.max_rows);
        }

        let columns: Vec<String> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self
                .pool
                .describe(sql)
                .await
                .map(|d| d.columns().iter().map(|c| c.name().to_string()).collect())
                .unwrap_or_default(),
        };

        let mut result_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            result_rows.push(decode_row(row)?);
        }

        tracing::debug!(
            "SQL: '{}' -> {} rows in {}ms",
            sql,
            result_rows.len(),
            start.elapsed().as_millis()
        );

        Ok(QueryResult { columns, rows: result_rows, truncated })
    }

    pub async fn list_tables(&self) -> ApiResult<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    pub async fn get_columns(&self, table: &str) -> ApiResult<Vec<ColumnInfo>> {
        self.ensure_table(table).await?;

        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    data_type: row.try_get("type")?,
                    nullable: row.try_get::<i64, _>("notnull")? == 0,
                    primary_key: row.try_get::<i64, _>("pk")? > 0,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(ApiError::from)
    }

    /// Random sample of rows from a table
    pub async fn get_sample_data(&self, table: &str, limit: usize) -> ApiResult<QueryResult> {
        self.ensure_table(table).await?;

        let sql = format!("SELECT * FROM {} ORDER BY RANDOM() LIMIT {}", quote_ident(table), limit);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self.get_columns(table).await?.into_iter().map(|c| c.name).collect(),
        };
        let rows = rows.iter().map(decode_row).collect::<ApiResult<Vec<_>>>()?;

        Ok(QueryResult { columns, rows, truncated: false })
    }

    pub async fn table_schemas(&self) -> ApiResult<Vec<TableSchema>> {
        let mut schemas = Vec::new();
        for table in self.list_tables().await? {
            let columns = self.get_columns(&table).await?.into_iter().map(|c| c.name).collect();
            schemas.push(TableSchema { table, columns });
        }
        Ok(schemas)
    }

    async fn ensure_table(&self, table: &str) -> ApiResult<()> {
        if self.list_tables().await?.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(ApiError::not_found(format!("Table not found: {}", table)))
        }
    }
}

/// Reject anything that is not a single read statement
pub fn validate_read_only(sql: &str) -> ApiResult<()> {
    let without_literals = STRING_LITERAL_REGEX.replace_all(sql, "''");
    let stripped = COMMENT_REGEX.replace_all(&without_literals, " ");
    let upper = stripped.trim().to_uppercase();

    if !READ_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return Err(ApiError::sql_safety_violation(
            "Only SELECT, WITH, EXPLAIN and VALUES queries are allowed",
        ));
    }

    if let Some((_, rest)) = upper.split_once(';')
        && !rest.trim().is_empty()
    {
        return Err(ApiError::sql_safety_violation("Multiple statements are not allowed"));
    }

    if let Some(found) = MUTATING_KEYWORD_REGEX.find(&upper) {
        return Err(ApiError::sql_safety_violation(format!(
            "SQL contains a disallowed keyword: {}",
            found.as_str()
        )));
    }

    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn decode_row(row: &SqliteRow) -> ApiResult<Vec<CellValue>> {
    let mut cells = Vec::with_capacity(row.len());
    for i in 0..row.len() {
        let raw = row.try_get_raw(i)?;
        if raw.is_null() {
            cells.push(CellValue::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();
        let cell = match type_name.as_str() {
            "INTEGER" | "BOOLEAN" | "INT8" => CellValue::Integer(row.try_get_unchecked(i)?),
            "REAL" | "NUMERIC" => CellValue::Real(row.try_get_unchecked(i)?),
            "BLOB" => CellValue::Blob(row.try_get_unchecked(i)?),
            _ => CellValue::Text(row.try_get_unchecked(i)?),
        };
        cells.push(cell);
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded(read_only: bool) -> SqlDatastore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE product (Key INTEGER PRIMARY KEY, Name TEXT NOT NULL, \"Product Line\" TEXT, Price REAL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO product VALUES (1, 'Widget', 'Tools', 9.5), (2, 'Gadget', 'Tools', 12.25), (3, 'Gizmo', NULL, NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE customer (Key INTEGER, Name TEXT)").execute(&pool).await.unwrap();

        let config = DatastoreConfig { read_only, max_rows: 2, ..Default::default() };
        SqlDatastore::new(pool, &config)
    }

    #[tokio::test]
    async fn execute_types_cells_and_caps_rows() {
        let store = seeded(true).await;
        let result = store.execute("SELECT Key, Name, Price FROM product ORDER BY Key;").await.unwrap();

        assert_eq!(result.columns, vec!["Key", "Name", "Price"]);
        assert_eq!(result.rows.len(), 2);
        assert!(result.truncated);
        assert_eq!(result.rows[0][0], CellValue::Integer(1));
        assert_eq!(result.rows[0][1], CellValue::Text("Widget".into()));
        assert_eq!(result.rows[1][2], CellValue::Real(12.25));
    }

    #[tokio::test]
    async fn empty_result_keeps_column_names() {
        let store = seeded(true).await;
        let result = store.execute("SELECT Key, Name FROM customer").await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["Key", "Name"]);
        assert_eq!(result.to_markdown(), "| Key | Name |\n|:----|:-----|");
    }

    #[tokio::test]
    async fn read_only_guard_blocks_writes() {
        let store = seeded(true).await;
        let err = store.execute("DELETE FROM product").await.unwrap_err();
        assert_eq!(err.code, "sql_safety_violation");

        let err = store.execute("SELECT 1; DROP TABLE product").await.unwrap_err();
        assert_eq!(err.code, "sql_safety_violation");

        let writable = seeded(false).await;
        writable.execute("DELETE FROM customer").await.unwrap();
    }

    #[tokio::test]
    async fn invalid_sql_is_reported() {
        let store = seeded(true).await;
        let err = store.execute("SELECT nope FROM missing_table").await.unwrap_err();
        assert_eq!(err.code, "invalid_sql");
        assert!(err.message().contains("missing_table"));
    }

    #[tokio::test]
    async fn introspection() {
        let store = seeded(true).await;
        assert_eq!(store.list_tables().await.unwrap(), vec!["customer", "product"]);

        let columns = store.get_columns("product").await.unwrap();
        assert_eq!(columns[0].name, "Key");
        assert!(columns[0].primary_key);
        assert!(!columns[1].nullable);
        assert_eq!(columns[2].name, "Product Line");

        let schemas = store.table_schemas().await.unwrap();
        assert_eq!(
            schemas[1].description(),
            "Table product: Columns are Key, Name, Product Line, Price."
        );

        let sample = store.get_sample_data("product", 2).await.unwrap();
        assert_eq!(sample.rows.len(), 2);
        assert_eq!(sample.columns.len(), 4);

        let err = store.get_columns("nope\"; DROP TABLE product; --").await.unwrap_err();
        assert_eq!(err.code, "not_found");
    }

    #[test]
    fn guard_ignores_keywords_inside_literals() {
        assert!(validate_read_only("SELECT * FROM t WHERE note = 'please delete me'").is_ok());
        assert!(validate_read_only("with x as (select 1) select * from x").is_ok());
        assert!(validate_read_only("UPDATE t SET a = 1").is_err());
        assert!(validate_read_only("SELECT * FROM t; ").is_ok());
        assert!(validate_read_only("PRAGMA writable_schema = 1").is_err());
    }

    #[test]
    fn guard_allows_replace_function_but_not_replace_writes() {
        assert!(validate_read_only("SELECT REPLACE(Name, 'W', 'V') AS n FROM product").is_ok());
        assert!(validate_read_only("REPLACE INTO product VALUES (9, 'x', NULL, NULL)").is_err());
        assert!(
            validate_read_only("WITH x AS (SELECT 1) REPLACE INTO product SELECT * FROM x").is_err()
        );
        assert!(validate_read_only("WITH x AS (SELECT 1) INSERT OR REPLACE INTO t SELECT * FROM x").is_err());
    }

    #[test]
    fn guard_skips_comments() {
        assert!(validate_read_only("-- products\nSELECT Name FROM product").is_ok());
        assert!(validate_read_only("/* top seller */ SELECT Name FROM product").is_ok());
        assert!(validate_read_only("SELECT 1 -- DROP TABLE product").is_ok());
        assert!(validate_read_only("-- SELECT\nDELETE FROM product").is_err());
    }

    #[tokio::test]
    async fn replace_and_comments_run_against_the_store() {
        let store = seeded(true).await;
        let result = store
            .execute("-- rename\nSELECT REPLACE(Name, 'W', 'V') AS n FROM product WHERE Key = 1")
            .await
            .unwrap();
        assert_eq!(result.rows, vec![vec![CellValue::Text("Vidget".into())]]);
    }

    #[test]
    fn markdown_alignment_and_floats() {
        let result = QueryResult {
            columns: vec!["Name".into(), "Total".into()],
            rows: vec![
                vec![CellValue::Text("Tools".into()), CellValue::Real(21.75)],
                vec![CellValue::Text("Other".into()), CellValue::Null],
            ],
            truncated: false,
        };
        assert_eq!(
            result.to_markdown(),
            "| Name  | Total |\n|:------|------:|\n| Tools | 21.75 |\n| Other |       |"
        );
        assert_eq!(QueryResult::default().to_markdown(), "");
    }

    #[test]
    fn row_lines_keep_column_order() {
        let result = QueryResult {
            columns: vec!["b".into(), "a".into()],
            rows: vec![vec![CellValue::Integer(1), CellValue::Text("x".into())]],
            truncated: false,
        };
        assert_eq!(result.row_lines(), vec![r#"{"b": 1, "a": "x"}"#.to_string()]);
    }
}
