//! Reconcile command

use capstan_common::DriverConfig;
use capstan_driver::ClusterStore;
use clap::Args;
use uuid::Uuid;

use super::{build_driver, open_store};
use crate::Result;

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// UUID of a cluster in the store
    #[arg(long)]
    pub cluster: Uuid,
}

pub async fn run(args: ReconcileArgs, config: &DriverConfig) -> Result<()> {
    let driver = build_driver(config)?;
    let mut cluster = open_store(config).load(args.cluster).await?;

    let outcome = driver.update_cluster_status(&mut cluster).await?;

    match &cluster.status_reason {
        Some(reason) if outcome.saved => {
            println!("{} {} ({})", cluster.uuid, outcome.status, reason)
        }
        _ => println!("{} {}", cluster.uuid, outcome.status),
    }
    Ok(())
}
