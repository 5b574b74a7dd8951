//! A5: first line of the ten most recently modified `.log` files, newest first.

use crate::core::classifier::contains_all;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::ResolvedParams;
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const LOGS_DIR: &str = "logs";
const OUTPUT: &str = "logs/logs-recent.txt";
pub const MAX_FILES: usize = 10;

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A5",
    summary: "First lines of the 10 most recent .log files",
    matches,
    extract: no_params,
    handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches(text: &str) -> bool {
    contains_all(text, &["most recent", ".log"])
}

fn first_line(path: &Path) -> Result<String, TaskError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches('\n').to_string())
}

fn handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let dir = ctx.path(LOGS_DIR)?;
    let output = ctx.path(OUTPUT)?;
    ctx.require_dir(&dir)?;

    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir.as_path())? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path.extension().map(|e| e == "log").unwrap_or(false);
        if !is_log || !entry.file_type()?.is_file() {
            continue;
        }
        logs.push((entry.metadata()?.modified()?, path));
    }
    // Newest first; equal mtimes fall back to name so reruns stay byte-identical.
    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    logs.truncate(MAX_FILES);

    let mut body = String::new();
    for (_, path) in &logs {
        let confined = ctx.adopt(path)?;
        body.push_str(&first_line(confined.as_path())?);
        body.push('\n');
    }
    let published = ctx.write_output(&output, body.as_bytes())?;
    Ok(Outcome::new(format!(
        "Extracted first lines from {} most recent .log files to {}",
        logs.len(),
        OUTPUT
    ))
    .with_output(published))
}
