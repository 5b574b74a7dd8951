//! Output helpers: atomic publication of operation results and compact previews.
//!
//! Published files are written to a temp file beside the destination and renamed
//! into place, so a failed handler never leaves a partial output behind. The rename
//! does not serialize concurrent writers of the same file: the last one wins.

use crate::core::error::TaskError;
use crate::core::sandbox::SandboxPath;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;

/// Record of one file an operation published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedOutput {
    pub path: String,
    pub bytes: usize,
    pub sha256: String,
}

/// Atomically replace `target` with `data`.
pub fn publish(target: &SandboxPath, data: &[u8]) -> Result<PublishedOutput, TaskError> {
    let path = target.as_path();
    let parent = path
        .parent()
        .ok_or_else(|| TaskError::ValidationError(format!("{} has no parent directory", target)))?;
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tidepool-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TaskError::IoError(e.error))?;

    let mut hasher = Sha256::new();
    hasher.update(data);
    let sha256 = format!("{:x}", hasher.finalize());

    tracing::debug!(path = %target, bytes = data.len(), sha256 = %&sha256[..12], "published output");

    Ok(PublishedOutput {
        path: target.to_string(),
        bytes: data.len(),
        sha256,
    })
}

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}
