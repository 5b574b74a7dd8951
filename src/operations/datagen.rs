//! A1: run the project's `datagen.py` with the requester's email as its only argument.

use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::external_action::ExternalCapability;
use crate::core::params::{self, ExtractionError, ParameterSet, ResolvedParams};
use crate::core::registry::{Capability, OperationDescriptor, Outcome};

pub const SCRIPT: &str = "datagen.py";

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A1",
    summary: "Run datagen.py with the given email",
    matches,
    extract,
    handler,
    capabilities: &[Capability::Subprocess],
};

fn matches(text: &str) -> bool {
    text.contains(SCRIPT)
}

fn extract(text: &str) -> Result<ParameterSet, ExtractionError> {
    let email = params::backticked_email(text)
        .ok_or_else(|| ExtractionError::new("no backticked email address in task"))?;
    Ok(ParameterSet::new().with_text("email", email))
}

fn handler(ctx: &ExecutionContext<'_>, params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let email = params.text("email")?;
    let project = ctx
        .config()
        .project_root()
        .map_err(|e| TaskError::ValidationError(e.to_string()))?;
    if !project.join(SCRIPT).is_file() {
        return Err(TaskError::NotFound(format!(
            "{} in {}",
            SCRIPT,
            project.display()
        )));
    }
    let python = ctx.config().tools.python.clone();
    ctx.run_external(
        ExternalCapability::ScriptExec,
        &python,
        &[SCRIPT, email],
        &project,
    )?;
    Ok(Outcome::new(format!("{} ran with email {}", SCRIPT, email)))
}
