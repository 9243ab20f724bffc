//! Import command

use std::path::PathBuf;

use capstan_common::DriverConfig;
use capstan_driver::ClusterStore;
use clap::Args;
use tracing::info;

use super::{open_store, read_cluster};
use crate::Result;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Cluster record file (YAML or JSON)
    #[arg(long)]
    pub file: PathBuf,
}

pub async fn run(args: ImportArgs, config: &DriverConfig) -> Result<()> {
    let cluster = read_cluster(&args.file)?;
    cluster.validate()?;

    let store = open_store(config);
    store.save(&cluster).await?;

    info!(cluster = %cluster.uuid, dir = %store.dir().display(), "imported cluster");
    println!("{}", cluster.uuid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::CLUSTER_YAML;
    use capstan_common::ClusterStatus;

    #[tokio::test]
    async fn imported_cluster_lands_in_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cluster.yaml");
        std::fs::write(&file, CLUSTER_YAML).unwrap();
        let config = DriverConfig {
            state_dir: dir.path().join("state"),
            ..Default::default()
        };

        run(ImportArgs { file }, &config).await.unwrap();

        let uuid = "5d12f6fd-a196-4bf0-ae4c-1f639a523a52".parse().unwrap();
        let stored = open_store(&config).load(uuid).await.unwrap();
        assert_eq!(stored.status, ClusterStatus::CreateInProgress);
    }

    #[tokio::test]
    async fn invalid_shape_is_not_imported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cluster.yaml");
        let without_control_plane = CLUSTER_YAML.replace("role: control_plane", "role: worker");
        std::fs::write(&file, without_control_plane).unwrap();
        let config = DriverConfig {
            state_dir: dir.path().join("state"),
            ..Default::default()
        };

        assert!(run(ImportArgs { file }, &config).await.is_err());
        assert!(!dir.path().join("state").exists());
    }
}
