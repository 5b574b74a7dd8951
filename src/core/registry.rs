//! Operation registry: the ordered catalog of descriptors.
//!
//! Registration order is classifier precedence. Adding or removing an operation is
//! a one-line change to `crate::catalog::CATALOG`.

use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::output::PublishedOutput;
use crate::core::params::{ExtractionError, ParameterSet, ResolvedParams};
use serde::Serialize;
use thiserror::Error;

/// Permission class an operation needs at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Network,
    Subprocess,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Network => "network",
            Capability::Subprocess => "subprocess",
        }
    }
}

pub type Matcher = fn(&str) -> bool;
pub type Extractor = fn(&str) -> Result<ParameterSet, ExtractionError>;
pub type Handler = fn(&ExecutionContext<'_>, &ResolvedParams) -> Result<Outcome, TaskError>;

/// Immutable (matcher, extractor, handler, capabilities) tuple.
#[derive(Clone, Copy)]
pub struct OperationDescriptor {
    pub id: &'static str,
    pub summary: &'static str,
    /// Pure, total predicate over the lowercased task text.
    pub matches: Matcher,
    /// Runs on the original-case task text.
    pub extract: Extractor,
    pub handler: Handler,
    pub capabilities: &'static [Capability],
}

impl OperationDescriptor {
    pub fn requires(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

impl std::fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("id", &self.id)
            .field("summary", &self.summary)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Successful handler payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub message: String,
    pub outputs: Vec<PublishedOutput>,
}

impl Outcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            outputs: Vec::new(),
        }
    }

    pub fn with_output(mut self, output: PublishedOutput) -> Self {
        self.outputs.push(output);
        self
    }
}

/// Empty parameter set for operations driven purely by file conventions.
pub fn no_params(_text: &str) -> Result<ParameterSet, ExtractionError> {
    Ok(ParameterSet::new())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Operation not found: {0}")]
    NotFound(String),
    #[error("Operation id registered twice: {0}")]
    Duplicate(String),
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    operations: Vec<OperationDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog in its fixed precedence order.
    pub fn builtin() -> Self {
        Self {
            operations: crate::catalog::CATALOG.to_vec(),
        }
    }

    /// Append a descriptor; it ranks below everything registered before it.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<(), RegistryError> {
        if self.operations.iter().any(|d| d.id == descriptor.id) {
            return Err(RegistryError::Duplicate(descriptor.id.to_string()));
        }
        self.operations.push(descriptor);
        Ok(())
    }

    pub fn all(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn lookup(&self, id: &str) -> Result<&OperationDescriptor, RegistryError> {
        self.operations
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
