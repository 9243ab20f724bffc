//! Common types for capstan: cluster model, errors, configuration and templating
//!
//! Everything the reconciliation driver shares between its crates lives here:
//! - [`model`] - Cluster, ClusterTemplate, NodeGroup and the lifecycle status enum
//! - [`error`] - Error types, including the structured external command failure
//! - [`config`] - Driver configuration (file, environment, defaults)
//! - [`template`] - Manifest and helm values rendering
//! - [`telemetry`] - tracing subscriber setup

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod model;
pub mod telemetry;
pub mod template;

pub use config::{Backend, DriverConfig};
pub use error::{Error, ExecError, UnsupportedReason};
pub use model::{
    Cluster, ClusterStatus, ClusterTemplate, Credentials, NodeGroup, NodeGroupRole, ReasonKind,
    StatusReason,
};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default chart installed by the release backend
pub const DEFAULT_CHART_REF: &str =
    "https://stackhpc.github.io/capi-helm-charts/openstack-cluster-0.1.0.tgz";

/// Kind queried when inspecting clusters through kubectl
pub const DEFAULT_CLUSTER_RESOURCE_KIND: &str = "clusters.azimuth.stackhpc.com";

/// Annotation the cluster operator writes once it has handled a spec
pub const DEFAULT_LAST_HANDLED_ANNOTATION: &str = "kopf.zalando.org/last-handled-configuration";

/// Separator placed between documents of a manifest bundle
pub const DOCUMENT_SEPARATOR: &str = "---\n";
