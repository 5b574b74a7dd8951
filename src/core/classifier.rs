//! Task classifier: first-match-wins over the registry's precedence order.

use crate::core::error::AgentError;
use crate::core::registry::{OperationDescriptor, Registry};

/// Select the earliest-registered descriptor whose matcher accepts `text`.
/// Later descriptors are never evaluated.
pub fn classify<'r>(registry: &'r Registry, text: &str) -> Result<&'r OperationDescriptor, AgentError> {
    let lowered = text.to_lowercase();
    registry
        .all()
        .iter()
        .find(|d| (d.matches)(&lowered))
        .ok_or(AgentError::UnrecognizedTask)
}

/// Every descriptor that would accept `text`, in precedence order. Diagnostic only.
pub fn candidates<'r>(registry: &'r Registry, text: &str) -> Vec<&'r OperationDescriptor> {
    let lowered = text.to_lowercase();
    registry
        .all()
        .iter()
        .filter(|d| (d.matches)(&lowered))
        .collect()
}

pub fn contains_all(text: &str, needles: &[&str]) -> bool {
    needles.iter().all(|n| text.contains(n))
}

pub fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}
