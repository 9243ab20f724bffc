//! capstan
//!
//! Drives one lifecycle operation or reconciliation pass per invocation;
//! an external scheduler decides when and for which cluster.

use clap::Parser;

use capstan_cli::{Cli, Result};
use capstan_common::telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        format: cli.log_format,
        default_filter: None,
    })?;

    cli.run().await
}
