//! Dispatcher: the single entry point that turns task text into one executed operation.
//!
//! classify -> extract -> resolve paths -> invoke handler -> normalize the result.
//! Nothing unclassified escapes: handler failures are folded into `AgentError`, and a
//! panicking handler becomes `InternalError`.

use crate::core::classifier;
use crate::core::config::AgentConfig;
use crate::core::context::ExecutionContext;
use crate::core::error::{AgentError, TaskError};
use crate::core::params::{ParameterSet, ResolvedParams};
use crate::core::registry::{OperationDescriptor, Outcome, Registry};
use crate::core::sandbox::Sandbox;
use crate::core::time;
use serde::Serialize;
use std::fs;
use std::panic::{self, AssertUnwindSafe};

/// What `run` would do, without doing it.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub operation_id: &'static str,
    pub summary: &'static str,
    pub capabilities: Vec<&'static str>,
    pub params: ParameterSet,
    /// Other operations whose matchers also accept the text, in precedence order.
    pub shadowed: Vec<&'static str>,
}

#[derive(Debug)]
pub struct Dispatcher {
    registry: Registry,
    sandbox: Sandbox,
    config: AgentConfig,
}

impl Dispatcher {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        Self::with_registry(config, Registry::builtin())
    }

    pub fn with_registry(config: AgentConfig, registry: Registry) -> Result<Self, AgentError> {
        let root = config.data_root().map_err(|e| AgentError::InternalError {
            cause: e.to_string(),
        })?;
        let sandbox = Sandbox::new(root, &config.mount)?;
        Ok(Self {
            registry,
            sandbox,
            config,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn classify(&self, text: &str) -> Result<&OperationDescriptor, AgentError> {
        classifier::classify(&self.registry, text)
    }

    fn prepare(&self, text: &str) -> Result<(&OperationDescriptor, ParameterSet, ResolvedParams), AgentError> {
        let descriptor = self.classify(text)?;
        let params = (descriptor.extract)(text).map_err(|e| AgentError::ExtractionError {
            operation_id: descriptor.id.to_string(),
            reason: e.reason,
        })?;
        let resolved = params.resolve(&self.sandbox)?;
        Ok((descriptor, params, resolved))
    }

    /// Classify, extract and validate paths without executing anything.
    pub fn plan(&self, text: &str) -> Result<Plan, AgentError> {
        let (descriptor, params, _) = self.prepare(text)?;
        let shadowed = classifier::candidates(&self.registry, text)
            .into_iter()
            .map(|d| d.id)
            .filter(|id| *id != descriptor.id)
            .collect();
        Ok(Plan {
            operation_id: descriptor.id,
            summary: descriptor.summary,
            capabilities: descriptor.capabilities.iter().map(|c| c.as_str()).collect(),
            params,
            shadowed,
        })
    }

    pub fn run(&self, text: &str) -> Result<Outcome, AgentError> {
        let invocation = time::new_invocation_id();
        let span = tracing::info_span!("dispatch", invocation = %invocation);
        let _guard = span.enter();

        let (descriptor, params, resolved) = self.prepare(text).inspect_err(|e| {
            tracing::info!(kind = e.kind(), "task rejected before execution: {}", e);
        })?;
        tracing::info!(
            operation = descriptor.id,
            params = params.len(),
            "dispatching operation"
        );

        let ctx = ExecutionContext::new(descriptor, &self.sandbox, &self.config, &invocation);
        let result = panic::catch_unwind(AssertUnwindSafe(|| (descriptor.handler)(&ctx, &resolved)));

        match result {
            Ok(Ok(outcome)) => {
                tracing::info!(
                    operation = descriptor.id,
                    outputs = outcome.outputs.len(),
                    "operation completed"
                );
                Ok(outcome)
            }
            Ok(Err(err)) => {
                tracing::warn!(operation = descriptor.id, error = %err, "operation failed");
                Err(AgentError::from_task(descriptor.id, err))
            }
            Err(payload) => {
                let cause = panic_message(payload.as_ref());
                tracing::error!(operation = descriptor.id, cause = %cause, "operation panicked");
                Err(AgentError::InternalError {
                    cause: format!("{} panicked: {}", descriptor.id, cause),
                })
            }
        }
    }

    /// Read-only accessor for sandboxed file contents.
    ///
    /// Out-of-sandbox paths report `PathViolation`, distinct from `MissingResource`.
    pub fn read(&self, raw: &str) -> Result<String, AgentError> {
        let path = self.sandbox.resolve(raw)?;
        if !path.as_path().is_file() {
            return Err(AgentError::MissingResource(format!("file {}", path)));
        }
        let bytes = fs::read(path.as_path())
            .map_err(|e| AgentError::from_task("read", TaskError::IoError(e)))?;
        String::from_utf8(bytes).map_err(|_| AgentError::OperationFailed {
            operation_id: "read".to_string(),
            cause: format!("{} is not valid UTF-8", path),
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
