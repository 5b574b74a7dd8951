//! A4: sort `contacts.json` by last name, then first name.

use crate::core::classifier::contains_all;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::ResolvedParams;
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};
use serde_json::Value;

const INPUT: &str = "contacts.json";
const OUTPUT: &str = "contacts-sorted.json";

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A4",
    summary: "Sort contacts.json by last_name, first_name",
    matches,
    extract: no_params,
    handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches(text: &str) -> bool {
    contains_all(text, &["sort", INPUT])
}

fn field<'v>(contact: &'v Value, name: &str) -> &'v str {
    contact.get(name).and_then(Value::as_str).unwrap_or("")
}

/// Stable sort; missing or non-string fields compare as the empty string.
pub fn sort_contacts(contacts: &mut [Value]) {
    contacts.sort_by(|a, b| {
        field(a, "last_name")
            .cmp(field(b, "last_name"))
            .then_with(|| field(a, "first_name").cmp(field(b, "first_name")))
    });
}

fn handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let input = ctx.path(INPUT)?;
    let output = ctx.path(OUTPUT)?;
    let raw = ctx.read_to_string(&input)?;
    let parsed: Value = serde_json::from_str(&raw)?;
    let Value::Array(mut contacts) = parsed else {
        return Err(TaskError::ValidationError(format!(
            "{} must contain a JSON array",
            INPUT
        )));
    };
    sort_contacts(&mut contacts);
    let body = serde_json::to_string_pretty(&contacts)?;
    let published = ctx.write_output(&output, body.as_bytes())?;
    Ok(Outcome::new(format!("Sorted {} contacts into {}", contacts.len(), OUTPUT)).with_output(published))
}
