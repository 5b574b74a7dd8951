//! B4: clone a repository into `repo_temp`, add a file and commit locally.
//!
//! `repo_temp` is the one directory this crate deletes; it is wiped before every clone.
//! The clone reaches a remote, so every git call runs under `tools.timeout_secs`.

use crate::core::classifier::{contains_all, contains_any};
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::external_action::ExternalCapability;
use crate::core::params::{self, ExtractionError, ParameterSet, ResolvedParams};
use crate::core::registry::{Capability, OperationDescriptor, Outcome};

const WORK_DIR: &str = "repo_temp";
const NEW_FILE: &str = "new_file.txt";
const NEW_FILE_BODY: &str = "This is a new file.\n";
const DEFAULT_MESSAGE: &str = "Add new_file.txt";
const COMMITTER_NAME: &str = "tidepool";
const COMMITTER_EMAIL: &str = "tidepool@localhost";

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "B4",
    summary: "Clone a git repository and make a commit",
    matches,
    extract,
    handler,
    capabilities: &[Capability::Write, Capability::Subprocess, Capability::Network],
};

fn matches(text: &str) -> bool {
    contains_all(text, &["clone"]) && contains_any(text, &["git", "repo"])
}

fn extract(text: &str) -> Result<ParameterSet, ExtractionError> {
    let repo_url =
        params::first_url(text).ok_or_else(|| ExtractionError::new("no repository URL in task"))?;
    let message = params::quoted_strings(text)
        .into_iter()
        .find(|q| !q.contains("://"))
        .unwrap_or(DEFAULT_MESSAGE);
    Ok(ParameterSet::new()
        .with_text("repo_url", repo_url)
        .with_text("message", message))
}

fn handler(ctx: &ExecutionContext<'_>, params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let repo_url = params.text("repo_url")?;
    let message = params.text("message")?;
    let git = ctx.config().tools.git.as_str();
    let work = ctx.path(WORK_DIR)?;
    let work_str = work.as_path().to_string_lossy().to_string();

    ctx.remove_dir_all(&work)?;
    ctx.run_external(
        ExternalCapability::VcsWrite,
        git,
        &["clone", "--", repo_url, work_str.as_str()],
        ctx.sandbox().root(),
    )?;

    let new_file = ctx.sandbox().join(&work, NEW_FILE)?;
    ctx.write_output(&new_file, NEW_FILE_BODY.as_bytes())?;

    let name = format!("user.name={}", COMMITTER_NAME);
    let email = format!("user.email={}", COMMITTER_EMAIL);
    ctx.run_external(ExternalCapability::VcsWrite, git, &["add", NEW_FILE], work.as_path())?;
    ctx.run_external(
        ExternalCapability::VcsWrite,
        git,
        &["-c", name.as_str(), "-c", email.as_str(), "commit", "-m", message],
        work.as_path(),
    )?;
    Ok(Outcome::new(format!(
        "Cloned {} into {} and committed {}",
        repo_url, work, NEW_FILE
    )))
}
