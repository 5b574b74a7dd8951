//! Capability-scoped broker for external commands with default-deny allowlists.
//!
//! Operations that declare the SUBPROCESS capability launch binaries only through
//! `execute`, which checks the binary against the allowlist of the external
//! capability it claims and logs the run as a structured event. Every run has a
//! wall-clock deadline; a child still running at the deadline is killed.

use crate::core::error::TaskError;
use crate::core::output::compact_line;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalCapability {
    ScriptExec,
    Formatter,
    VcsWrite,
}

impl ExternalCapability {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalCapability::ScriptExec => "script_exec",
            ExternalCapability::Formatter => "formatter",
            ExternalCapability::VcsWrite => "vcs_write",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExternalActionRule {
    pub capability: String,
    pub allowed_bins: Vec<String>,
}

pub fn default_rules() -> Vec<ExternalActionRule> {
    vec![
        ExternalActionRule {
            capability: "script_exec".to_string(),
            allowed_bins: vec![
                "python".to_string(),
                "python3".to_string(),
                "uv".to_string(),
            ],
        },
        ExternalActionRule {
            capability: "formatter".to_string(),
            allowed_bins: vec!["npx".to_string()],
        },
        ExternalActionRule {
            capability: "vcs_write".to_string(),
            allowed_bins: vec!["git".to_string()],
        },
    ]
}

fn allowed_for_capability(rules: &[ExternalActionRule], capability: ExternalCapability) -> Vec<String> {
    rules
        .iter()
        .find(|r| r.capability == capability.as_str())
        .map(|r| r.allowed_bins.clone())
        .unwrap_or_default()
}

fn command_bin(command: &str) -> String {
    Path::new(command)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| command.to_string())
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drain a child pipe on its own thread so a chatty child never blocks on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_with_deadline(
    command: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<Output, TaskError> {
    let bin = command_bin(command);
    let started = Instant::now();
    let mut child = Command::new(command)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TaskError::CommandFailed(format!("could not start '{}': {}", bin, e)))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Output {
                status,
                stdout: stdout.join().unwrap_or_default(),
                stderr: stderr.join().unwrap_or_default(),
            });
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TaskError::CommandFailed(format!(
                "{} timed out after {}s",
                bin,
                timeout.as_secs()
            )));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run `command` after checking it against the allowlist for `capability`.
///
/// A non-zero exit status is returned as `Ok`; callers decide what it means.
/// Exceeding `timeout` is `CommandFailed`.
pub fn execute(
    rules: &[ExternalActionRule],
    capability: ExternalCapability,
    scope: &str,
    command: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<Output, TaskError> {
    let allowed_bins = allowed_for_capability(rules, capability);
    let bin = command_bin(command);
    if !allowed_bins.iter().any(|b| b == &bin) {
        return Err(TaskError::CapabilityDenied(format!(
            "capability '{}' does not allow binary '{}'",
            capability.as_str(),
            bin
        )));
    }

    let event_id = Ulid::new().to_string();
    let started = Instant::now();
    let output = match wait_with_deadline(command, args, cwd, timeout) {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!(
                event_id = %event_id,
                capability = capability.as_str(),
                scope,
                command = %bin,
                duration_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "external action failed"
            );
            return Err(err);
        }
    };

    tracing::info!(
        event_id = %event_id,
        capability = capability.as_str(),
        scope,
        command = %bin,
        args = ?args,
        cwd = %cwd.display(),
        exit_code = ?output.status.code(),
        duration_ms = started.elapsed().as_millis() as u64,
        "external action"
    );

    Ok(output)
}

/// Like `execute`, but a non-zero exit becomes `CommandFailed` carrying stderr.
pub fn execute_checked(
    rules: &[ExternalActionRule],
    capability: ExternalCapability,
    scope: &str,
    command: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<Output, TaskError> {
    let output = execute(rules, capability, scope, command, args, cwd, timeout)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TaskError::CommandFailed(format!(
            "{} exited with {}: {}",
            command_bin(command),
            output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            compact_line(&stderr, 400)
        )));
    }
    Ok(output)
}
