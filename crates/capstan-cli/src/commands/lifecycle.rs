//! create, update and delete commands

use capstan_common::DriverConfig;
use capstan_driver::ClusterStore;
use clap::Args;
use tracing::info;
use uuid::Uuid;

use super::{build_driver, open_store};
use crate::Result;

#[derive(Args, Debug)]
pub struct LifecycleArgs {
    /// UUID of a cluster in the store
    #[arg(long)]
    pub cluster: Uuid,
}

/// Which lifecycle operation to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

pub async fn run(operation: Operation, args: LifecycleArgs, config: &DriverConfig) -> Result<()> {
    let driver = build_driver(config)?;
    let mut cluster = open_store(config).load(args.cluster).await?;

    match operation {
        Operation::Create => driver.create_cluster(&mut cluster).await?,
        Operation::Update => driver.update_cluster(&mut cluster).await?,
        Operation::Delete => driver.delete_cluster(&mut cluster).await?,
    }

    info!(cluster = %cluster.uuid, status = %cluster.status, "done");
    println!("{} {}", cluster.uuid, cluster.status);
    Ok(())
}
