//! B3: fetch a URL and save the body under the sandbox.

use crate::core::classifier::contains_any;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::{self, ExtractionError, ParameterSet, ResolvedParams};
use crate::core::registry::{Capability, OperationDescriptor, Outcome};

const DEFAULT_OUTPUT: &str = "fetched.txt";

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "B3",
    summary: "Fetch data from a URL and save it",
    matches,
    extract,
    handler,
    capabilities: &[Capability::Write, Capability::Network],
};

fn matches(text: &str) -> bool {
    contains_any(text, &["fetch", "download"]) && params::first_url(text).is_some()
}

fn extract(text: &str) -> Result<ParameterSet, ExtractionError> {
    let url = params::first_url(text).ok_or_else(|| ExtractionError::new("no URL in task"))?;
    let output = params::target_file(text).unwrap_or(DEFAULT_OUTPUT);
    Ok(ParameterSet::new().with_text("url", url).with_path("output", output))
}

fn handler(ctx: &ExecutionContext<'_>, params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let url = params.text("url")?;
    let output = params.path("output")?;
    let body = ctx.remote()?.get_text(url)?;
    let published = ctx.write_output(output, body.as_bytes())?;
    Ok(Outcome::new(format!("Fetched {} into {}", url, output)).with_output(published))
}
