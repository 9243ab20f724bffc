//! CLI commands

use std::path::Path;
use std::sync::Arc;

use capstan_capi::ProcessRunner;
use capstan_common::{Cluster, DriverConfig};
use capstan_driver::{Driver, FileClusterStore};

use crate::{Error, Result};

pub mod import;
pub mod lifecycle;
pub mod reconcile;
pub mod render;

/// Read a cluster record from a YAML or JSON file
pub fn read_cluster(path: &Path) -> Result<Cluster> {
    let data = std::fs::read_to_string(path).map_err(|e| Error::read_file(path, e))?;
    let cluster: Cluster = serde_yaml::from_str(&data)?;
    Ok(cluster)
}

/// File store under the configured state directory
pub fn open_store(config: &DriverConfig) -> Arc<FileClusterStore> {
    Arc::new(FileClusterStore::new(config.state_dir.clone()))
}

/// Driver running real processes against the file store
pub fn build_driver(config: &DriverConfig) -> Result<Driver> {
    let driver = Driver::new(config, Arc::new(ProcessRunner), open_store(config))?;
    Ok(driver)
}
