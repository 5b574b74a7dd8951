//! A6: index every markdown file under `docs/` by its first level-1 heading.

use crate::core::classifier::contains_all;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::ResolvedParams;
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use walkdir::WalkDir;

const DOCS_DIR: &str = "docs";
const OUTPUT: &str = "docs/index.json";

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A6",
    summary: "Build docs/index.json mapping markdown files to their H1 titles",
    matches,
    extract: no_params,
    handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches(text: &str) -> bool {
    contains_all(text, &["docs", "index.json"])
}

/// Text of the first line starting with `# `, trimmed.
pub fn first_heading(path: &Path) -> Result<Option<String>, TaskError> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if let Some(title) = line.strip_prefix("# ") {
            return Ok(Some(title.trim().to_string()));
        }
    }
    Ok(None)
}

fn handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let docs = ctx.path(DOCS_DIR)?;
    let output = ctx.path(OUTPUT)?;
    ctx.require_dir(&docs)?;

    let mut index = BTreeMap::new();
    for entry in WalkDir::new(docs.as_path()).sort_by_file_name() {
        let entry = entry.map_err(|e| TaskError::IoError(e.into()))?;
        let is_markdown = entry.path().extension().map(|e| e == "md").unwrap_or(false);
        if !entry.file_type().is_file() || !is_markdown {
            continue;
        }
        let confined = ctx.adopt(entry.path())?;
        if let Some(title) = first_heading(confined.as_path())? {
            let key = confined
                .relative()
                .strip_prefix(&format!("{}/", DOCS_DIR))
                .map(str::to_string)
                .unwrap_or_else(|| confined.relative());
            index.insert(key, title);
        }
    }

    let body = serde_json::to_string_pretty(&index)?;
    let published = ctx.write_output(&output, body.as_bytes())?;
    Ok(Outcome::new(format!("Indexed {} documents into {}", index.len(), OUTPUT)).with_output(published))
}
