//! Execution context handed to a handler for a single invocation.
//!
//! All filesystem, network and subprocess access goes through here and is checked
//! against the capabilities the operation declared.

use crate::core::config::AgentConfig;
use crate::core::error::TaskError;
use crate::core::external_action::{self, ExternalCapability};
use crate::core::output::{self, PublishedOutput};
use crate::core::registry::{Capability, OperationDescriptor};
use crate::core::remote::RemoteClient;
use crate::core::sandbox::{Sandbox, SandboxPath};
use std::fs;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

pub struct ExecutionContext<'a> {
    operation_id: &'static str,
    capabilities: &'static [Capability],
    sandbox: &'a Sandbox,
    config: &'a AgentConfig,
    invocation: &'a str,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        descriptor: &OperationDescriptor,
        sandbox: &'a Sandbox,
        config: &'a AgentConfig,
        invocation: &'a str,
    ) -> Self {
        Self {
            operation_id: descriptor.id,
            capabilities: descriptor.capabilities,
            sandbox,
            config,
            invocation,
        }
    }

    pub fn operation_id(&self) -> &'static str {
        self.operation_id
    }

    pub fn invocation(&self) -> &str {
        self.invocation
    }

    pub fn sandbox(&self) -> &Sandbox {
        self.sandbox
    }

    pub fn config(&self) -> &AgentConfig {
        self.config
    }

    fn require(&self, capability: Capability) -> Result<(), TaskError> {
        if self.capabilities.contains(&capability) {
            Ok(())
        } else {
            Err(TaskError::CapabilityDenied(format!(
                "operation {} did not declare the {} capability",
                self.operation_id,
                capability.as_str()
            )))
        }
    }

    /// Resolve one of the operation's fixed root-relative conventions.
    pub fn path(&self, relative: &str) -> Result<SandboxPath, TaskError> {
        Ok(self.sandbox.resolve(relative)?)
    }

    pub fn adopt(&self, physical: &Path) -> Result<SandboxPath, TaskError> {
        Ok(self.sandbox.adopt(physical)?)
    }

    pub fn require_file(&self, path: &SandboxPath) -> Result<(), TaskError> {
        self.require(Capability::Read)?;
        if path.as_path().is_file() {
            Ok(())
        } else {
            Err(TaskError::NotFound(format!("file {}", path)))
        }
    }

    pub fn require_dir(&self, path: &SandboxPath) -> Result<(), TaskError> {
        self.require(Capability::Read)?;
        if path.as_path().is_dir() {
            Ok(())
        } else {
            Err(TaskError::NotFound(format!("directory {}", path)))
        }
    }

    pub fn read_to_string(&self, path: &SandboxPath) -> Result<String, TaskError> {
        self.require_file(path)?;
        let bytes = fs::read(path.as_path())?;
        String::from_utf8(bytes)
            .map_err(|_| TaskError::ValidationError(format!("{} is not valid UTF-8", path)))
    }

    pub fn read_bytes(&self, path: &SandboxPath) -> Result<Vec<u8>, TaskError> {
        self.require_file(path)?;
        Ok(fs::read(path.as_path())?)
    }

    pub fn write_output(&self, path: &SandboxPath, data: &[u8]) -> Result<PublishedOutput, TaskError> {
        self.require(Capability::Write)?;
        output::publish(path, data)
    }

    /// Remove a directory tree under the root. The root itself is never removable.
    pub fn remove_dir_all(&self, path: &SandboxPath) -> Result<(), TaskError> {
        self.require(Capability::Write)?;
        if path.relative().is_empty() {
            return Err(TaskError::ValidationError(
                "refusing to remove the sandbox root".to_string(),
            ));
        }
        if path.as_path().exists() {
            tracing::info!(operation = self.operation_id, path = %path, "removing directory");
            fs::remove_dir_all(path.as_path())?;
        }
        Ok(())
    }

    pub fn remote(&self) -> Result<RemoteClient, TaskError> {
        self.require(Capability::Network)?;
        RemoteClient::new(&self.config.remote)
    }

    /// Launch an allowlisted binary under `tools.timeout_secs`; non-zero exit is an error.
    pub fn run_external(
        &self,
        capability: ExternalCapability,
        command: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<Output, TaskError> {
        self.require(Capability::Subprocess)?;
        external_action::execute_checked(
            &self.config.tools.rules,
            capability,
            self.operation_id,
            command,
            args,
            cwd,
            Duration::from_secs(self.config.tools.timeout_secs),
        )
    }
}
