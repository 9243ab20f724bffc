//! helm wrapper: install, uninstall and status of a cluster release

use std::sync::Arc;
use std::time::Duration;

use capstan_common::{DriverConfig, ExecError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::exec::{CommandRunner, CommandSpec};

/// stderr marker helm prints for a missing release
pub const RELEASE_NOT_FOUND_MARKER: &str = "release: not found";

/// Subset of `helm status --output json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Release name
    pub name: String,
    /// Deployment info
    pub info: ReleaseInfo,
    /// Values the release was deployed with
    #[serde(default)]
    pub config: Value,
    /// Revision number
    #[serde(default)]
    pub version: u32,
}

/// Deployment info of a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// `deployed`, `failed`, `pending-install`, ...
    pub status: String,
    /// Free-form description from helm
    #[serde(default)]
    pub description: Option<String>,
}

/// helm against the management cluster
#[derive(Clone)]
pub struct Helm {
    runner: Arc<dyn CommandRunner>,
    program: String,
    connection: Vec<String>,
    chart_ref: String,
    wait: String,
    release_timeout: Duration,
    status_timeout: Duration,
}

impl Helm {
    /// Program, chart, waits and budgets come from the config
    pub fn new(runner: Arc<dyn CommandRunner>, config: &DriverConfig) -> Self {
        Self {
            runner,
            program: config.helm.clone(),
            connection: config.connection_args(),
            chart_ref: config.chart_ref.clone(),
            wait: config.release_wait.clone(),
            release_timeout: config.release_timeout(),
            status_timeout: config.apply_timeout(),
        }
    }

    fn command<I>(&self, args: I, timeout: Duration) -> CommandSpec
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        CommandSpec::new(&self.program, timeout)
            .args(args)
            .args(self.connection.iter().cloned())
    }

    fn parse_json(&self, verb: &str, stdout: &str) -> Result<Value, ExecError> {
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(stdout).map_err(|e| ExecError::InvalidOutput {
            program: self.program.clone(),
            message: format!("helm {} output is not JSON: {}", verb, e),
        })
    }

    /// `helm install <release> <chart> --output json --timeout <wait> --values -`
    pub async fn install(&self, release: &str, values: &str) -> Result<Value, ExecError> {
        debug!(release, bytes = values.len(), "installing release");
        let spec = self
            .command(
                [
                    "install",
                    release,
                    self.chart_ref.as_str(),
                    "--output",
                    "json",
                    "--timeout",
                    self.wait.as_str(),
                    "--values",
                    "-",
                ],
                self.release_timeout,
            )
            .stdin(values);
        let output = self.runner.run(spec).await?;
        info!(release, chart = %self.chart_ref, "helm install finished");
        self.parse_json("install", &output.stdout)
    }

    /// `helm uninstall <release> --output json --timeout <wait>`
    ///
    /// Returns `None` when the release is already gone.
    pub async fn uninstall(&self, release: &str) -> Result<Option<Value>, ExecError> {
        let spec = self.command(
            [
                "uninstall",
                release,
                "--output",
                "json",
                "--timeout",
                self.wait.as_str(),
            ],
            self.release_timeout,
        );
        match self.runner.run(spec).await {
            Ok(output) => {
                info!(release, "helm uninstall finished");
                self.parse_json("uninstall", &output.stdout).map(Some)
            }
            Err(e) if e.is_not_found(RELEASE_NOT_FOUND_MARKER) => {
                info!(release, "release already absent");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// `helm status <release> --output json`
    ///
    /// Returns `None` when the release does not exist.
    pub async fn status(&self, release: &str) -> Result<Option<Release>, ExecError> {
        let spec = self.command(
            ["status", release, "--output", "json"],
            self.status_timeout,
        );
        let output = match self.runner.run(spec).await {
            Ok(output) => output,
            Err(e) if e.is_not_found(RELEASE_NOT_FOUND_MARKER) => {
                debug!(release, "release not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        serde_json::from_str(&output.stdout)
            .map(Some)
            .map_err(|e| ExecError::InvalidOutput {
                program: self.program.clone(),
                message: format!("failed to parse status of release {}: {}", release, e),
            })
    }
}
