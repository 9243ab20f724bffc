//! Persistence seam for cluster records

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use capstan_common::{Cluster, Error};
use tracing::debug;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Saves and loads cluster records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Persist the record as given
    async fn save(&self, cluster: &Cluster) -> Result<(), Error>;

    /// Load a record by UUID
    async fn load(&self, uuid: Uuid) -> Result<Cluster, Error>;
}

/// One JSON file per cluster: `<dir>/<uuid>.json`
#[derive(Debug, Clone)]
pub struct FileClusterStore {
    dir: PathBuf,
}

impl FileClusterStore {
    /// Store rooted at `dir`, created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, uuid: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", uuid))
    }
}

#[async_trait]
impl ClusterStore for FileClusterStore {
    async fn save(&self, cluster: &Cluster) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(cluster)
            .map_err(|e| Error::persistence(cluster.uuid, format!("failed to serialize: {}", e)))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::persistence(
                cluster.uuid,
                format!("failed to create {}: {}", self.dir.display(), e),
            )
        })?;

        // temp file renamed into place; readers never see a partial record
        let path = self.path(cluster.uuid);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await.map_err(|e| {
            Error::persistence(cluster.uuid, format!("failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            Error::persistence(cluster.uuid, format!("failed to write {}: {}", path.display(), e))
        })?;

        debug!(cluster = %cluster.uuid, status = %cluster.status, "saved cluster");
        Ok(())
    }

    async fn load(&self, uuid: Uuid) -> Result<Cluster, Error> {
        let path = self.path(uuid);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::persistence(uuid, format!("failed to read {}: {}", path.display(), e))
        })?;
        let cluster: Cluster = serde_json::from_str(&data).map_err(|e| {
            Error::persistence(uuid, format!("failed to parse {}: {}", path.display(), e))
        })?;
        if cluster.uuid != uuid {
            return Err(Error::persistence(
                uuid,
                format!("{} holds cluster {}", path.display(), cluster.uuid),
            ));
        }
        Ok(cluster)
    }
}
