//! Records the driver reads and mutates
//!
//! The persistence layer owns these; the driver only changes `status`,
//! `status_reason` and `stack_id` and hands the record back to be saved.

mod cluster;
mod status;

pub use cluster::{
    Cluster, ClusterTemplate, Credentials, NodeGroup, NodeGroupRole, KUBE_TAG_LABEL,
};
pub use status::{ClusterStatus, ReasonKind, StatusReason};
