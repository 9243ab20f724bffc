//! kubectl wrapper: apply, delete and get

use std::sync::Arc;
use std::time::Duration;

use capstan_common::{DriverConfig, ExecError};
use kube::core::DynamicObject;
use tracing::{debug, info};

use crate::exec::{CommandOutput, CommandRunner, CommandSpec};

/// stderr marker kubectl prints for a missing object
pub const NOT_FOUND_MARKER: &str = "Error from server (NotFound)";

/// kubectl against the management cluster
#[derive(Clone)]
pub struct Kubectl {
    runner: Arc<dyn CommandRunner>,
    program: String,
    connection: Vec<String>,
    timeout: Duration,
}

impl Kubectl {
    /// Program, connection flags and budget come from the config
    pub fn new(runner: Arc<dyn CommandRunner>, config: &DriverConfig) -> Self {
        Self {
            runner,
            program: config.kubectl.clone(),
            connection: config.connection_args(),
            timeout: config.apply_timeout(),
        }
    }

    fn command<I>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        CommandSpec::new(&self.program, self.timeout)
            .args(args)
            .args(self.connection.iter().cloned())
    }

    /// `kubectl apply -f -` with the manifests on stdin
    pub async fn apply(&self, manifests: &str) -> Result<CommandOutput, ExecError> {
        debug!(
            kinds = ?document_kinds(manifests),
            bytes = manifests.len(),
            "applying manifests"
        );
        let output = self
            .runner
            .run(self.command(["apply", "-f", "-"]).stdin(manifests))
            .await?;
        info!(result = %output.stdout.trim_end(), "kubectl apply finished");
        Ok(output)
    }

    /// `kubectl delete --ignore-not-found=true -f -` with the manifests on stdin
    ///
    /// Objects that are already gone are not an error.
    pub async fn delete(&self, manifests: &str) -> Result<CommandOutput, ExecError> {
        debug!(
            kinds = ?document_kinds(manifests),
            bytes = manifests.len(),
            "deleting manifests"
        );
        let output = self
            .runner
            .run(
                self.command(["delete", "--ignore-not-found=true", "-f", "-"])
                    .stdin(manifests),
            )
            .await?;
        info!(result = %output.stdout.trim_end(), "kubectl delete finished");
        Ok(output)
    }

    /// `kubectl delete <kind> <name> --ignore-not-found=true`
    pub async fn delete_named(&self, kind: &str, name: &str) -> Result<CommandOutput, ExecError> {
        let output = self
            .runner
            .run(self.command(["delete", kind, name, "--ignore-not-found=true"]))
            .await?;
        info!(kind, name, result = %output.stdout.trim_end(), "kubectl delete finished");
        Ok(output)
    }

    /// `kubectl get <kind> <name> -o json`
    ///
    /// Returns `None` when kubectl reports the object as not found.
    pub async fn get(&self, kind: &str, name: &str) -> Result<Option<DynamicObject>, ExecError> {
        let spec = self.command(["get", kind, name, "-o", "json"]);
        let output = match self.runner.run(spec).await {
            Ok(output) => output,
            Err(e) if e.is_not_found(NOT_FOUND_MARKER) => {
                debug!(kind, name, "resource not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        serde_json::from_str(&output.stdout)
            .map(Some)
            .map_err(|e| ExecError::InvalidOutput {
                program: self.program.clone(),
                message: format!("failed to parse {} {}: {}", kind, name, e),
            })
    }
}

/// Top-level kinds of a bundle, in order; document bodies are never logged
fn document_kinds(manifests: &str) -> Vec<&str> {
    manifests
        .lines()
        .filter_map(|line| line.strip_prefix("kind:"))
        .map(str::trim)
        .collect()
}
