//! capstan CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use capstan_common::telemetry::LogFormat;
use capstan_common::{Backend, DriverConfig};
use clap::{Parser, Subcommand, ValueEnum};

/// capstan - Cluster API lifecycle driver
#[derive(Parser, Debug)]
#[command(name = "capstan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Driver configuration file (YAML)
    #[arg(long, global = true, env = "CAPSTAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured backend
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Override the directory of the cluster store
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Override the kubeconfig passed to kubectl and helm
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Override the namespace passed to kubectl and helm
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Log line format
    #[arg(long, global = true, default_value = "compact", value_parser = parse_log_format)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Backend names accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// kubectl apply/delete of rendered manifests
    Manifests,
    /// helm install/uninstall of a release
    Release,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Manifests => Backend::Manifests,
            BackendArg::Release => Backend::Release,
        }
    }
}

fn parse_log_format(s: &str) -> std::result::Result<LogFormat, String> {
    s.parse().map_err(|e: capstan_common::telemetry::TelemetryError| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print what create would hand to the backend
    Render(commands::render::RenderArgs),
    /// Create the external resources of a stored cluster
    Create(commands::lifecycle::LifecycleArgs),
    /// Re-apply the desired state of a stored cluster
    Update(commands::lifecycle::LifecycleArgs),
    /// Remove the external resources of a stored cluster
    Delete(commands::lifecycle::LifecycleArgs),
    /// Run one status reconciliation pass for a stored cluster
    Reconcile(commands::reconcile::ReconcileArgs),
    /// Write a cluster record into the store
    Import(commands::import::ImportArgs),
}

impl Cli {
    /// Configuration file, then environment, then flags
    pub fn driver_config(&self) -> Result<DriverConfig> {
        let mut config = DriverConfig::load(self.config.as_deref())?;
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            config.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = Some(namespace.clone());
        }
        Ok(config)
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let config = self.driver_config()?;
        match self.command {
            Commands::Render(args) => commands::render::run(args, &config),
            Commands::Create(args) => {
                commands::lifecycle::run(commands::lifecycle::Operation::Create, args, &config)
                    .await
            }
            Commands::Update(args) => {
                commands::lifecycle::run(commands::lifecycle::Operation::Update, args, &config)
                    .await
            }
            Commands::Delete(args) => {
                commands::lifecycle::run(commands::lifecycle::Operation::Delete, args, &config)
                    .await
            }
            Commands::Reconcile(args) => commands::reconcile::run(args, &config).await,
            Commands::Import(args) => commands::import::run(args, &config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::parse_from([
            "capstan",
            "--backend",
            "manifests",
            "--namespace",
            "clusters",
            "--state-dir",
            "/var/lib/capstan",
            "reconcile",
            "--cluster",
            "5d12f6fd-a196-4bf0-ae4c-1f639a523a52",
        ]);
        let config = cli.driver_config().unwrap();
        assert_eq!(config.backend, Backend::Manifests);
        assert_eq!(config.namespace.as_deref(), Some("clusters"));
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/capstan"));
    }

    #[test]
    fn log_format_defaults_to_compact() {
        let cli = Cli::parse_from(["capstan", "import", "--file", "c.yaml"]);
        assert_eq!(cli.log_format, LogFormat::Compact);

        let cli = Cli::parse_from(["capstan", "--log-format", "json", "import", "--file", "c.yaml"]);
        assert_eq!(cli.log_format, LogFormat::Json);

        assert!(Cli::try_parse_from(["capstan", "--log-format", "xml", "import", "--file", "c"]).is_err());
    }

    #[test]
    fn cluster_argument_must_be_a_uuid() {
        assert!(Cli::try_parse_from(["capstan", "create", "--cluster", "demo"]).is_err());
    }
}
