//! SQLite operations.
//!
//! - A10 totals Gold ticket sales in `ticket-sales.db`.
//! - B5 runs a read-only query named in the task and writes the rows.

use crate::core::classifier::{contains_all, contains_any};
use crate::core::context::ExecutionContext;
use crate::core::db::{db_connect_read_only, render_value};
use crate::core::error::TaskError;
use crate::core::params::{self, ExtractionError, ParameterSet, ResolvedParams};
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};
use rusqlite::Connection;
use rusqlite::types::Value;

const TICKETS_DB: &str = "ticket-sales.db";
const GOLD_OUTPUT: &str = "ticket-sales-gold.txt";
const GOLD_QUERY: &str = "SELECT SUM(units * price) FROM tickets WHERE lower(type) = 'gold'";
const DEFAULT_QUERY_OUTPUT: &str = "query-result.txt";
const DB_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

pub const GOLD_SALES_DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A10",
    summary: "Total sales of Gold tickets in ticket-sales.db",
    matches: matches_gold,
    extract: no_params,
    handler: gold_handler,
    capabilities: &[Capability::Read, Capability::Write],
};

pub const QUERY_DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "B5",
    summary: "Run a read-only SQL query against a database file",
    matches: matches_query,
    extract: extract_query,
    handler: query_handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches_gold(text: &str) -> bool {
    contains_all(text, &["gold", "ticket"])
}

/// Sum of `units * price` for Gold rows; an empty match renders as `0`.
pub fn gold_sales_total(conn: &Connection) -> Result<String, TaskError> {
    let total: Value = conn.query_row(GOLD_QUERY, [], |row| row.get(0))?;
    Ok(match total {
        Value::Null => "0".to_string(),
        other => render_value(&other),
    })
}

fn gold_handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let db = ctx.path(TICKETS_DB)?;
    let output = ctx.path(GOLD_OUTPUT)?;
    ctx.require_file(&db)?;
    let conn = db_connect_read_only(&db)?;
    let total = gold_sales_total(&conn)?;
    let published = ctx.write_output(&output, total.as_bytes())?;
    Ok(Outcome::new(format!("Total Gold ticket sales: {}", total)).with_output(published))
}

fn matches_query(text: &str) -> bool {
    contains_any(text, &["sql", "query"])
        && params::first_file_token(text, DB_EXTENSIONS).is_some()
}

fn is_read_only(query: &str) -> bool {
    let head = query
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    head == "SELECT" || head == "WITH"
}

fn extract_query(text: &str) -> Result<ParameterSet, ExtractionError> {
    let database = params::first_file_token(text, DB_EXTENSIONS)
        .ok_or_else(|| ExtractionError::new("no database file named in task"))?;
    let quoted = params::quoted_strings(text);
    let query = quoted
        .iter()
        .copied()
        .find(|q| is_read_only(q))
        .ok_or_else(|| {
            if quoted.is_empty() {
                ExtractionError::new("no quoted SQL query in task")
            } else {
                ExtractionError::new("only SELECT queries are allowed")
            }
        })?;
    let output = params::target_file(text)
        .filter(|t| {
            !DB_EXTENSIONS
                .iter()
                .any(|e| t.to_ascii_lowercase().ends_with(&format!(".{}", e)))
        })
        .unwrap_or(DEFAULT_QUERY_OUTPUT);
    Ok(ParameterSet::new()
        .with_path("database", database)
        .with_text("query", query)
        .with_path("output", output))
}

/// Each row as one comma-separated line.
pub fn query_rows(conn: &Connection, query: &str) -> Result<Vec<String>, TaskError> {
    let mut stmt = conn.prepare(query)?;
    if !stmt.readonly() {
        return Err(TaskError::ValidationError("query would modify the database".to_string()));
    }
    let columns = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut lines = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(columns);
        for i in 0..columns {
            let value: Value = row.get(i)?;
            cells.push(render_value(&value));
        }
        lines.push(cells.join(","));
    }
    Ok(lines)
}

fn query_handler(ctx: &ExecutionContext<'_>, params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let db = params.path("database")?;
    let query = params.text("query")?;
    let output = params.path("output")?;
    ctx.require_file(db)?;
    let conn = db_connect_read_only(db)?;
    let lines = query_rows(&conn, query)?;
    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    let published = ctx.write_output(output, body.as_bytes())?;
    Ok(Outcome::new(format!("Wrote {} rows to {}", lines.len(), output)).with_output(published))
}
