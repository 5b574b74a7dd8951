use crate::core::error::TaskError;
use crate::core::sandbox::SandboxPath;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};

/// Open a sandboxed SQLite file read-only. Missing files are `NotFound`, never created.
pub fn db_connect_read_only(db_path: &SandboxPath) -> Result<Connection, TaskError> {
    if !db_path.as_path().is_file() {
        return Err(TaskError::NotFound(format!("database {}", db_path)));
    }
    let conn = Connection::open_with_flags(
        db_path.as_path(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// Text form of a single SQLite value. Reals keep a decimal point (`1234.0`).
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{:.1}", f)
            } else {
                f.to_string()
            }
        }
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
