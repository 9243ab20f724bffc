//! Driver configuration
//!
//! Resolution order (highest priority last wins):
//! 1. Built-in defaults
//! 2. YAML file (`--config`)
//! 3. `CAPSTAN_*` environment variables
//! 4. Explicit CLI flags, applied by the binary on top of the result

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result, DEFAULT_CHART_REF, DEFAULT_CLUSTER_RESOURCE_KIND,
    DEFAULT_LAST_HANDLED_ANNOTATION,
};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "CAPSTAN_";

/// How the desired state of a cluster reaches the management cluster
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Rendered manifests applied and deleted with kubectl
    Manifests,
    /// A helm release installed and uninstalled with helm
    #[default]
    Release,
}

impl Backend {
    /// Config/CLI name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifests => "manifests",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "manifests" => Ok(Self::Manifests),
            "release" => Ok(Self::Release),
            other => Err(Error::config(format!(
                "unknown backend '{}', expected 'manifests' or 'release'",
                other
            ))),
        }
    }
}

/// Everything the driver needs to talk to the management cluster
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Manifests or release
    pub backend: Backend,
    /// kubectl program
    pub kubectl: String,
    /// helm program
    pub helm: String,
    /// Passed to both tools as `--kubeconfig`
    pub kubeconfig: Option<PathBuf>,
    /// Passed to both tools as `--namespace`
    pub namespace: Option<String>,
    /// Time budget for kubectl invocations and helm status
    pub apply_timeout_secs: u64,
    /// Time budget for helm install/uninstall
    pub release_timeout_secs: u64,
    /// Wait passed to helm's own `--timeout`
    pub release_wait: String,
    /// Chart installed by the release backend
    pub chart_ref: String,
    /// Kind queried by the kubectl inspector
    pub cluster_resource_kind: String,
    /// Annotation recording the last configuration the operator handled
    pub last_handled_annotation: String,
    /// Identity endpoint written into the credentials secret
    pub auth_url: Option<String>,
    /// Directory replacing the built-in templates
    pub templates_dir: Option<PathBuf>,
    /// Directory of the file-backed cluster store
    pub state_dir: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            kubectl: "kubectl".to_string(),
            helm: "helm".to_string(),
            kubeconfig: None,
            namespace: None,
            apply_timeout_secs: 120,
            release_timeout_secs: 310,
            release_wait: "5m".to_string(),
            chart_ref: DEFAULT_CHART_REF.to_string(),
            cluster_resource_kind: DEFAULT_CLUSTER_RESOURCE_KIND.to_string(),
            last_handled_annotation: DEFAULT_LAST_HANDLED_ANNOTATION.to_string(),
            auth_url: None,
            templates_dir: None,
            state_dir: PathBuf::from(".capstan"),
        }
    }
}

impl DriverConfig {
    /// Parse a YAML document; absent fields keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))
    }

    /// Load from an optional file, then apply process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let data = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("failed to read {}: {}", path.display(), e))
                })?;
                debug!(path = %path.display(), "loaded configuration file");
                Self::from_yaml(&data)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CAPSTAN_*` overrides read through `lookup`
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.is_empty())
        };

        if let Some(v) = var("BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = var("KUBECTL") {
            self.kubectl = v;
        }
        if let Some(v) = var("HELM") {
            self.helm = v;
        }
        if let Some(v) = var("KUBECONFIG") {
            self.kubeconfig = Some(PathBuf::from(v));
        }
        if let Some(v) = var("NAMESPACE") {
            self.namespace = Some(v);
        }
        if let Some(v) = var("APPLY_TIMEOUT_SECS") {
            self.apply_timeout_secs = parse_secs("APPLY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("RELEASE_TIMEOUT_SECS") {
            self.release_timeout_secs = parse_secs("RELEASE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("RELEASE_WAIT") {
            self.release_wait = v;
        }
        if let Some(v) = var("CHART_REF") {
            self.chart_ref = v;
        }
        if let Some(v) = var("CLUSTER_RESOURCE_KIND") {
            self.cluster_resource_kind = v;
        }
        if let Some(v) = var("LAST_HANDLED_ANNOTATION") {
            self.last_handled_annotation = v;
        }
        if let Some(v) = var("AUTH_URL") {
            self.auth_url = Some(v);
        }
        if let Some(v) = var("TEMPLATES_DIR") {
            self.templates_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("STATE_DIR") {
            self.state_dir = PathBuf::from(v);
        }
        Ok(())
    }

    /// Budget for kubectl calls and helm status
    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_secs)
    }

    /// Budget for helm install/uninstall
    pub fn release_timeout(&self) -> Duration {
        Duration::from_secs(self.release_timeout_secs)
    }

    /// Arguments both tools take for cluster access
    pub fn connection_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        if let Some(namespace) = &self.namespace {
            args.push("--namespace".to_string());
            args.push(namespace.clone());
        }
        args
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        Error::config(format!(
            "{}{} must be a whole number of seconds, got '{}'",
            ENV_PREFIX, name, value
        ))
    })
}
