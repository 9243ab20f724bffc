//! Cluster, template and node group records consumed by the driver

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{ClusterStatus, StatusReason};
use crate::Error;

/// Template label holding the Kubernetes version
pub const KUBE_TAG_LABEL: &str = "kube_tag";

/// Role of the machines in a node group
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeGroupRole {
    /// Control plane machines
    ControlPlane,
    /// Worker machines
    #[default]
    Worker,
}

/// A named, independently sized pool of machines within a cluster
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    /// Identity of the group
    pub uuid: Uuid,
    /// Display name
    pub name: String,
    /// Control plane or worker
    #[serde(default)]
    pub role: NodeGroupRole,
    /// Machine size
    pub flavor_id: String,
    /// Desired machine count
    pub node_count: u32,
    /// Lower bound when autoscaling
    #[serde(default)]
    pub min_node_count: Option<u32>,
    /// Upper bound when autoscaling
    #[serde(default)]
    pub max_node_count: Option<u32>,
    /// The default group of its role
    #[serde(default)]
    pub is_default: bool,
    /// Whether the cluster autoscaler manages this group
    #[serde(default)]
    pub autoscale: bool,
}

/// Versioned configuration shared by clusters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTemplate {
    /// Identity of the template
    pub uuid: Uuid,
    /// Display name
    pub name: String,
    /// Machine image reference
    pub image_id: String,
    /// Kubernetes version used when the `kube_tag` label is absent
    #[serde(default)]
    pub kube_version: Option<String>,
    /// Free-form labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Deprecated templates stay usable for existing clusters
    #[serde(default)]
    pub deprecated: bool,
}

impl ClusterTemplate {
    /// Kubernetes version from the `kube_tag` label, else `kube_version`
    pub fn kubernetes_version(&self) -> Option<&str> {
        self.labels
            .get(KUBE_TAG_LABEL)
            .map(String::as_str)
            .or(self.kube_version.as_deref())
    }
}

/// Credential material used to populate the cloud credentials secret
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Trust delegating the project to the trustee
    #[serde(default)]
    pub trust_id: Option<String>,
    /// User the cluster acts as
    #[serde(default)]
    pub trustee_user_id: Option<String>,
    /// Password of the trustee user
    #[serde(default)]
    pub trustee_password: Option<String>,
}

/// A cluster record as owned by the persistence layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Identity, also used as the external resource and release name
    pub uuid: Uuid,
    /// Display name
    pub name: String,
    /// Owning project/tenant
    pub project_id: String,
    /// Lifecycle state
    #[serde(default)]
    pub status: ClusterStatus,
    /// Why the cluster is in its state
    #[serde(default)]
    pub status_reason: Option<String>,
    /// Reference into another orchestrator, cleared on create
    #[serde(default)]
    pub stack_id: Option<String>,
    /// Template the cluster was created from
    pub cluster_template_id: Uuid,
    /// The template itself, absent once it has been removed
    #[serde(default)]
    pub cluster_template: Option<ClusterTemplate>,
    /// Machine pools, control plane included
    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
    /// Credential material for the infrastructure
    #[serde(default)]
    pub credentials: Credentials,
}

impl Cluster {
    /// Set status and reason from a reconciliation transition
    pub fn apply_transition(&mut self, status: ClusterStatus, reason: &StatusReason) {
        self.status = status;
        self.status_reason = Some(reason.message.clone());
    }

    /// Arm a lifecycle state, clearing any stale reason
    pub fn arm(&mut self, status: ClusterStatus) {
        self.status = status;
        self.status_reason = None;
    }

    /// The single control plane group
    pub fn control_plane(&self) -> Result<&NodeGroup, Error> {
        self.exactly_one(NodeGroupRole::ControlPlane, "control plane node group")
    }

    /// The single default worker group
    pub fn default_worker_group(&self) -> Result<&NodeGroup, Error> {
        let mut defaults = self
            .node_groups
            .iter()
            .filter(|g| g.role == NodeGroupRole::Worker && g.is_default);
        match (defaults.next(), defaults.next()) {
            (Some(group), None) => Ok(group),
            (None, _) => Err(Error::validation_for(
                self.uuid,
                "cluster has no default worker node group",
            )),
            (Some(_), Some(_)) => Err(Error::validation_for(
                self.uuid,
                "cluster has more than one default worker node group",
            )),
        }
    }

    /// Worker groups, default group first, others in record order
    pub fn worker_groups(&self) -> Vec<&NodeGroup> {
        let mut workers: Vec<&NodeGroup> = self
            .node_groups
            .iter()
            .filter(|g| g.role == NodeGroupRole::Worker)
            .collect();
        // stable: non-default groups keep their order
        workers.sort_by_key(|g| !g.is_default);
        workers
    }

    /// Check the node group shape rendering depends on
    pub fn validate(&self) -> Result<(), Error> {
        self.control_plane()?;
        self.default_worker_group()?;
        for group in &self.node_groups {
            // Unset bounds render as the desired count
            let min = group.min_node_count.unwrap_or(group.node_count);
            let max = group.max_node_count.unwrap_or(group.node_count);
            if !(min..=max).contains(&group.node_count) {
                return Err(Error::validation_for(
                    self.uuid,
                    format!(
                        "node group {} has node_count {} outside its bounds {}..={}",
                        group.name, group.node_count, min, max
                    ),
                ));
            }
        }
        Ok(())
    }

    fn exactly_one(&self, role: NodeGroupRole, what: &str) -> Result<&NodeGroup, Error> {
        let mut matching = self.node_groups.iter().filter(|g| g.role == role);
        match (matching.next(), matching.next()) {
            (Some(group), None) => Ok(group),
            (None, _) => Err(Error::validation_for(
                self.uuid,
                format!("cluster has no {}", what),
            )),
            (Some(_), Some(_)) => Err(Error::validation_for(
                self.uuid,
                format!("cluster has more than one {}", what),
            )),
        }
    }
}
