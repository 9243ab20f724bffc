//! Lifecycle operations
//!
//! create, update and delete render the cluster's desired state and hand it
//! to the configured backend; none of them wait for the external resource to
//! converge, which is observed later by [`Driver::update_cluster_status`].
//! Each operation arms the matching `*_IN_PROGRESS` state and saves the
//! record once after its external action succeeds. On failure the record is
//! neither changed nor saved and the error is returned as is. For create this
//! means the prior stack reference is cleared after the apply rather than
//! before it; the saved record is the same either way.
//!
//! The manifests backend writes one credentials secret per cluster. It is
//! left in place while the cluster tears down and removed by the status pass
//! that moves the record to `DELETE_COMPLETE`.
//!
//! | Operation | manifests backend                   | release backend         |
//! |-----------|-------------------------------------|-------------------------|
//! | create    | `kubectl apply` secret, template, cluster | `helm install` values |
//! | update    | `kubectl apply` secret, template, cluster | not yet implemented   |
//! | delete    | `kubectl delete` cluster document   | `helm uninstall`        |
//! | status    | `kubectl get`, then `kubectl delete secret` once deleted | `helm status` |

use std::sync::Arc;

use capstan_capi::{
    ClusterObserver, CommandRunner, Helm, HelmInspector, Kubectl, KubectlInspector,
    ResourceInspector,
};
use capstan_common::template::{cluster_credentials_secret_name, ManifestRenderer};
use capstan_common::{
    Backend, Cluster, ClusterStatus, ClusterTemplate, DriverConfig, Error, NodeGroup,
    UnsupportedReason,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::reconciler::{ReconcileOutcome, StatusReconciler};
use crate::store::ClusterStore;

/// A server type / OS / COE combination the driver handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provision {
    /// Kind of machines clusters run on
    pub server_type: &'static str,
    /// Operating system of the machine image
    pub os: &'static str,
    /// Container orchestration engine
    pub coe: &'static str,
}

/// Cluster lifecycle driver over one backend
pub struct Driver {
    backend: Backend,
    renderer: ManifestRenderer,
    kubectl: Kubectl,
    helm: Helm,
    store: Arc<dyn ClusterStore>,
    reconciler: StatusReconciler,
}

impl Driver {
    /// Build a driver from configuration
    ///
    /// The backend decides both how desired state is applied and how the
    /// external resource is inspected.
    pub fn new(
        config: &DriverConfig,
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn ClusterStore>,
    ) -> Result<Self, Error> {
        let renderer = ManifestRenderer::from_config(config)?;
        let kubectl = Kubectl::new(runner.clone(), config);
        let helm = Helm::new(runner, config);

        let inspector: Arc<dyn ResourceInspector> = match config.backend {
            Backend::Manifests => Arc::new(KubectlInspector::new(kubectl.clone())),
            Backend::Release => Arc::new(HelmInspector::new(
                helm.clone(),
                config.last_handled_annotation.clone(),
            )),
        };
        let observer = ClusterObserver::from_config(inspector, config);
        let reconciler = StatusReconciler::new(observer, store.clone());

        Ok(Self {
            backend: config.backend,
            renderer,
            kubectl,
            helm,
            store,
            reconciler,
        })
    }

    /// Combinations this driver handles
    pub fn provides() -> Vec<Provision> {
        vec![Provision {
            server_type: "vm",
            os: "ubuntu",
            coe: "kubernetes",
        }]
    }

    /// Render what create/update would hand to the backend
    ///
    /// Manifests backend: the manifest bundle, cluster-only when `template`
    /// is `None`. Release backend: the helm values, which need a template.
    pub fn render(
        &self,
        cluster: &Cluster,
        template: Option<&ClusterTemplate>,
    ) -> Result<String, Error> {
        match self.backend {
            Backend::Manifests => self.renderer.render_manifests(cluster, template),
            Backend::Release => {
                let template = template.ok_or_else(|| {
                    Error::validation_for(cluster.uuid, "helm values need a cluster template")
                })?;
                self.renderer.render_values(cluster, template)
            }
        }
    }

    /// Create the external resources of a new cluster
    pub async fn create_cluster(&self, cluster: &mut Cluster) -> Result<(), Error> {
        info!(cluster = %cluster.uuid, backend = %self.backend, "creating cluster");
        let template = required_template(cluster)?;

        match self.backend {
            Backend::Manifests => {
                let manifests = self.renderer.render_manifests(cluster, Some(template))?;
                self.kubectl.apply(&manifests).await?;
            }
            Backend::Release => {
                let values = self.renderer.render_values(cluster, template)?;
                self.helm.install(&cluster.uuid.to_string(), &values).await?;
            }
        }

        // no other orchestrator owns this cluster
        cluster.stack_id = None;
        self.arm_and_save(cluster, ClusterStatus::CreateInProgress)
            .await
    }

    /// Re-apply the desired state of an existing cluster
    pub async fn update_cluster(&self, cluster: &mut Cluster) -> Result<(), Error> {
        info!(cluster = %cluster.uuid, backend = %self.backend, "updating cluster");

        match self.backend {
            Backend::Manifests => {
                let template = required_template(cluster)?;
                let manifests = self.renderer.render_manifests(cluster, Some(template))?;
                self.kubectl.apply(&manifests).await?;
            }
            Backend::Release => {
                return Err(Error::unsupported(
                    "update_cluster",
                    UnsupportedReason::NotYetImplemented,
                ));
            }
        }

        self.arm_and_save(cluster, ClusterStatus::UpdateInProgress)
            .await
    }

    /// Remove the external resources of a cluster
    ///
    /// Removing resources that are already gone succeeds. The template is
    /// shared and left in place; the credentials secret goes once the
    /// deletion completes.
    pub async fn delete_cluster(&self, cluster: &mut Cluster) -> Result<(), Error> {
        info!(cluster = %cluster.uuid, backend = %self.backend, "deleting cluster");

        match self.backend {
            Backend::Manifests => {
                let manifests = self.renderer.render_manifests(cluster, None)?;
                self.kubectl.delete(&manifests).await?;
            }
            Backend::Release => {
                self.helm.uninstall(&cluster.uuid.to_string()).await?;
            }
        }

        self.arm_and_save(cluster, ClusterStatus::DeleteInProgress)
            .await
    }

    /// One status reconciliation pass
    ///
    /// With the manifests backend the pass that completes a deletion also
    /// removes the cluster's credentials secret. The record is saved before
    /// the removal, so a failed removal is returned but not retried.
    pub async fn update_cluster_status(
        &self,
        cluster: &mut Cluster,
    ) -> Result<ReconcileOutcome, Error> {
        let outcome = self.reconciler.reconcile(cluster).await?;

        if self.backend == Backend::Manifests
            && outcome.saved
            && outcome.status == ClusterStatus::DeleteComplete
        {
            let secret = cluster_credentials_secret_name(&cluster.uuid);
            self.kubectl.delete_named("secret", &secret).await?;
            debug!(cluster = %cluster.uuid, secret = %secret, "removed credentials secret");
        }

        Ok(outcome)
    }

    /// Not yet implemented
    pub fn resize_cluster(
        &self,
        _cluster: &Cluster,
        _node_count: u32,
        _nodes_to_remove: &[String],
        _nodegroup: &NodeGroup,
    ) -> Result<(), Error> {
        Err(Error::unsupported(
            "resize_cluster",
            UnsupportedReason::NotYetImplemented,
        ))
    }

    /// Not yet implemented
    pub fn upgrade_cluster(
        &self,
        _cluster: &Cluster,
        _template: &ClusterTemplate,
        _max_batch_size: u32,
        _nodegroup: &NodeGroup,
    ) -> Result<(), Error> {
        Err(Error::unsupported(
            "upgrade_cluster",
            UnsupportedReason::NotYetImplemented,
        ))
    }

    /// Not yet implemented
    pub fn create_nodegroup(&self, _cluster: &Cluster, _nodegroup: &NodeGroup) -> Result<(), Error> {
        Err(Error::unsupported(
            "create_nodegroup",
            UnsupportedReason::NotYetImplemented,
        ))
    }

    /// Not yet implemented
    pub fn update_nodegroup(&self, _cluster: &Cluster, _nodegroup: &NodeGroup) -> Result<(), Error> {
        Err(Error::unsupported(
            "update_nodegroup",
            UnsupportedReason::NotYetImplemented,
        ))
    }

    /// Not yet implemented
    pub fn delete_nodegroup(&self, _cluster: &Cluster, _nodegroup: &NodeGroup) -> Result<(), Error> {
        Err(Error::unsupported(
            "delete_nodegroup",
            UnsupportedReason::NotYetImplemented,
        ))
    }

    /// Federations are out of scope for this driver
    pub fn create_federation(&self, _federation: &str) -> Result<(), Error> {
        Err(Error::unsupported(
            "create_federation",
            UnsupportedReason::WillNotImplement,
        ))
    }

    /// Federations are out of scope for this driver
    pub fn update_federation(&self, _federation: &str) -> Result<(), Error> {
        Err(Error::unsupported(
            "update_federation",
            UnsupportedReason::WillNotImplement,
        ))
    }

    /// Federations are out of scope for this driver
    pub fn delete_federation(&self, _federation: &str) -> Result<(), Error> {
        Err(Error::unsupported(
            "delete_federation",
            UnsupportedReason::WillNotImplement,
        ))
    }

    async fn arm_and_save(&self, cluster: &mut Cluster, status: ClusterStatus) -> Result<(), Error> {
        cluster.arm(status);
        self.store.save(cluster).await?;
        info!(cluster = %cluster.uuid, status = %status, "lifecycle operation submitted");
        Ok(())
    }
}

fn required_template(cluster: &Cluster) -> Result<&ClusterTemplate, Error> {
    cluster
        .cluster_template
        .as_ref()
        .ok_or_else(|| Error::validation_for(cluster.uuid, "cluster has no cluster template"))
}
