//! A7: extract the sender address from the `From:` header of `email.txt`.

use crate::core::classifier::contains_all;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::ResolvedParams;
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};
use regex::Regex;
use std::sync::LazyLock;

const INPUT: &str = "email.txt";
const OUTPUT: &str = "email-sender.txt";

static FROM_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"From:\s*(?:[^<\n]*<)?([\w.+-]+@[\w.-]+)").expect("static regex"));

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A7",
    summary: "Extract the sender address from email.txt",
    matches,
    extract: no_params,
    handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches(text: &str) -> bool {
    contains_all(text, &[INPUT, "sender"])
}

pub fn sender_address(message: &str) -> Option<&str> {
    FROM_HEADER
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let input = ctx.path(INPUT)?;
    let output = ctx.path(OUTPUT)?;
    let message = ctx.read_to_string(&input)?;
    let sender = sender_address(&message).ok_or_else(|| {
        TaskError::ValidationError(format!("no sender address in {}", INPUT))
    })?;
    let published = ctx.write_output(&output, sender.as_bytes())?;
    Ok(Outcome::new(format!("Extracted sender email: {}", sender)).with_output(published))
}
