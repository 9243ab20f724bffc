//! Resource inspection and observed-state classification
//!
//! A cluster's external resource is fetched through a [`ResourceInspector`]
//! and classified into an [`ObservedState`]:
//!
//! | Resource                                   | Observed   |
//! |--------------------------------------------|------------|
//! | absent                                     | NOT_FOUND  |
//! | no `status.phase`                          | PENDING    |
//! | handled configuration differs from `spec`  | PENDING    |
//! | phase `Ready`                              | READY      |
//! | phase `Failed` or `Unhealthy`              | ERROR      |
//! | any other phase                            | PENDING    |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use capstan_common::{Cluster, DriverConfig, ExecError};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::DynamicObject;
use serde_json::{json, Value};
use tracing::debug;

use crate::helm::{Helm, Release};
use crate::kubectl::Kubectl;

#[cfg(test)]
use mockall::automock;

/// An external resource as fetched; only lives for one reconciliation pass
pub type ExternalResource = DynamicObject;

/// Classification of a live external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    /// The operator reports the cluster ready for the latest configuration
    Ready,
    /// Created, converging, or not yet caught up with the latest apply
    Pending,
    /// The operator reports a failure
    Error,
    /// No such resource
    NotFound,
}

impl ObservedState {
    /// Log name, e.g. `NOT_FOUND`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Pending => "PENDING",
            Self::Error => "ERROR",
            Self::NotFound => "NOT_FOUND",
        }
    }

    /// Classify a `status.phase` value
    pub fn from_phase(phase: &str) -> Self {
        match phase {
            "Ready" => Self::Ready,
            "Failed" | "Unhealthy" => Self::Error,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for ObservedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a fetched resource
///
/// `annotation` names the annotation in which the operator records the last
/// configuration it handled, as a JSON document with a `spec` field. A
/// missing or unparsable annotation counts as not handled.
pub fn classify(resource: Option<&ExternalResource>, annotation: &str) -> ObservedState {
    let Some(resource) = resource else {
        return ObservedState::NotFound;
    };
    let Some(phase) = phase(resource) else {
        return ObservedState::Pending;
    };
    if !is_handled(resource, annotation) {
        debug!(phase, "operator has not handled the latest configuration");
        return ObservedState::Pending;
    }
    ObservedState::from_phase(phase)
}

fn phase(resource: &ExternalResource) -> Option<&str> {
    resource
        .data
        .get("status")
        .and_then(|status| status.get("phase"))
        .and_then(Value::as_str)
}

fn is_handled(resource: &ExternalResource, annotation: &str) -> bool {
    let handled = resource
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(annotation))
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
    let Some(handled) = handled else {
        return false;
    };
    let desired = resource.data.get("spec").unwrap_or(&Value::Null);
    handled.get("spec").unwrap_or(&Value::Null) == desired
}

/// Fetches a named external resource
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceInspector: Send + Sync {
    /// `Ok(None)` when the resource does not exist
    async fn fetch(&self, kind: &str, name: &str) -> Result<Option<ExternalResource>, ExecError>;
}

/// Reads resources with `kubectl get`
#[derive(Clone)]
pub struct KubectlInspector {
    kubectl: Kubectl,
}

impl KubectlInspector {
    /// Wrap a kubectl
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }
}

#[async_trait]
impl ResourceInspector for KubectlInspector {
    async fn fetch(&self, kind: &str, name: &str) -> Result<Option<ExternalResource>, ExecError> {
        self.kubectl.get(kind, name).await
    }
}

/// Reads releases with `helm status`
///
/// Releases are addressed by name only; `kind` is ignored. A release is
/// presented as a resource whose spec is the deployed configuration and whose
/// handled-configuration annotation carries the same document, since helm
/// only records what it has deployed.
#[derive(Clone)]
pub struct HelmInspector {
    helm: Helm,
    annotation: String,
}

impl HelmInspector {
    /// Wrap a helm, writing the handled configuration under `annotation`
    pub fn new(helm: Helm, annotation: impl Into<String>) -> Self {
        Self {
            helm,
            annotation: annotation.into(),
        }
    }

    fn to_resource(&self, release: Release) -> ExternalResource {
        let phase = match release.info.status.as_str() {
            "deployed" => "Ready".to_string(),
            "failed" => "Failed".to_string(),
            other => other.to_string(),
        };
        let handled = json!({ "spec": release.config }).to_string();

        DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some(release.name),
                annotations: Some(BTreeMap::from([(self.annotation.clone(), handled)])),
                ..Default::default()
            },
            data: json!({
                "spec": release.config,
                "status": { "phase": phase },
            }),
        }
    }
}

#[async_trait]
impl ResourceInspector for HelmInspector {
    async fn fetch(&self, _kind: &str, name: &str) -> Result<Option<ExternalResource>, ExecError> {
        Ok(self
            .helm
            .status(name)
            .await?
            .map(|release| self.to_resource(release)))
    }
}

/// Observes the external resource backing a cluster
///
/// The resource is named after the cluster UUID.
#[derive(Clone)]
pub struct ClusterObserver {
    inspector: Arc<dyn ResourceInspector>,
    kind: String,
    annotation: String,
}

impl ClusterObserver {
    /// Observe resources of `kind` with an explicit annotation name
    pub fn new(
        inspector: Arc<dyn ResourceInspector>,
        kind: impl Into<String>,
        annotation: impl Into<String>,
    ) -> Self {
        Self {
            inspector,
            kind: kind.into(),
            annotation: annotation.into(),
        }
    }

    /// Observer over `inspector` with kind and annotation from the config
    pub fn from_config(inspector: Arc<dyn ResourceInspector>, config: &DriverConfig) -> Self {
        Self::new(
            inspector,
            config.cluster_resource_kind.clone(),
            config.last_handled_annotation.clone(),
        )
    }

    /// Fetch and classify
    pub async fn observe(&self, cluster: &Cluster) -> Result<ObservedState, ExecError> {
        let name = cluster.uuid.to_string();
        let resource = self.inspector.fetch(&self.kind, &name).await?;
        let observed = classify(resource.as_ref(), &self.annotation);
        debug!(cluster = %cluster.uuid, kind = %self.kind, %observed, "observed external resource");
        Ok(observed)
    }
}
