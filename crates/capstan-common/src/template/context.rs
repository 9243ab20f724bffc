//! Render context for manifest templates
//!
//! Templates see flattened views rather than the raw records:
//! - `cluster.*` - identity, credentials secret name, control plane and
//!   worker groups (default group first, named `default`)
//! - `template.*` - image and Kubernetes version, only when a template is bound
//! - `auth_url` - identity endpoint, only when configured

use std::collections::BTreeMap;

use minijinja::Value;
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Cluster, ClusterTemplate, Credentials, NodeGroup};
use crate::Error;

/// Name used for the default worker group in rendered output
pub const DEFAULT_GROUP_NAME: &str = "default";

/// Node group as seen by templates
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeGroupView {
    /// `default` for the default group, the group UUID otherwise
    pub name: String,
    /// Machine size
    pub flavor: String,
    /// Desired count
    pub count: u32,
    /// Autoscaling flag
    pub autoscale: bool,
    /// Autoscaling lower bound
    pub min_count: Option<u32>,
    /// Autoscaling upper bound
    pub max_count: Option<u32>,
}

impl NodeGroupView {
    fn from_group(group: &NodeGroup, name: String) -> Self {
        Self {
            name,
            flavor: group.flavor_id.clone(),
            count: group.node_count,
            autoscale: group.autoscale,
            min_count: group.min_node_count,
            max_count: group.max_node_count,
        }
    }
}

/// Cluster as seen by templates
#[derive(Debug, Clone, Serialize)]
pub struct ClusterView {
    /// Cluster UUID
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Owning project
    pub project_id: String,
    /// Name of the ClusterTemplate resource the cluster refers to
    pub template_name: String,
    /// Pre-existing project credentials secret, referenced by helm values
    pub credentials_secret: String,
    /// Per-cluster credentials secret written with the manifest bundle
    pub cloud_credentials_secret: String,
    /// Control plane group
    pub control_plane: NodeGroupView,
    /// Worker groups
    pub node_groups: Vec<NodeGroupView>,
    /// Credential material
    pub credentials: Credentials,
}

impl ClusterView {
    /// Build the view, validating the node group shape first
    pub fn from_cluster(cluster: &Cluster) -> Result<Self, Error> {
        cluster.validate()?;
        let control_plane = cluster.control_plane()?;
        let node_groups = cluster
            .worker_groups()
            .into_iter()
            .map(|g| {
                let name = if g.is_default {
                    DEFAULT_GROUP_NAME.to_string()
                } else {
                    g.uuid.to_string()
                };
                NodeGroupView::from_group(g, name)
            })
            .collect();

        Ok(Self {
            uuid: cluster.uuid.to_string(),
            name: cluster.name.clone(),
            project_id: cluster.project_id.clone(),
            template_name: cluster.cluster_template_id.to_string(),
            credentials_secret: credentials_secret_name(&cluster.project_id),
            cloud_credentials_secret: cluster_credentials_secret_name(&cluster.uuid),
            control_plane: NodeGroupView::from_group(control_plane, control_plane.uuid.to_string()),
            node_groups,
            credentials: cluster.credentials.clone(),
        })
    }
}

/// Template as seen by templates
#[derive(Debug, Clone, Serialize)]
pub struct TemplateView {
    /// Template UUID
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Machine image
    pub image: String,
    /// Kubernetes version
    pub kubernetes_version: String,
    /// Deprecated flag
    pub deprecated: bool,
    /// Template labels
    pub labels: BTreeMap<String, String>,
}

impl TemplateView {
    /// Build the view; a template without a Kubernetes version cannot be rendered
    pub fn from_template(template: &ClusterTemplate) -> Result<Self, Error> {
        let kubernetes_version = template.kubernetes_version().ok_or_else(|| {
            Error::validation_for(
                template.uuid,
                "cluster template has neither a kube_tag label nor a kube_version",
            )
        })?;
        Ok(Self {
            uuid: template.uuid.to_string(),
            name: template.name.clone(),
            image: template.image_id.clone(),
            kubernetes_version: kubernetes_version.to_string(),
            deprecated: template.deprecated,
            labels: template.labels.clone(),
        })
    }
}

/// Name of the cloud credentials secret for a project
pub fn credentials_secret_name(project_id: &str) -> String {
    format!("project-{}", project_id)
}

/// Name of the credentials secret owned by a single cluster
///
/// Trust credentials are per cluster, so clusters sharing a project must not
/// share a secret.
pub fn cluster_credentials_secret_name(uuid: &Uuid) -> String {
    format!("{}-cloud-credentials", uuid)
}

/// Everything a template can reference
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Cluster view
    pub cluster: ClusterView,
    /// Template view, when a template is bound
    pub template: Option<TemplateView>,
    /// Identity endpoint, when configured
    pub auth_url: Option<String>,
}

impl RenderContext {
    /// Create a new builder for a cluster
    pub fn builder(cluster: &Cluster) -> RenderContextBuilder<'_> {
        RenderContextBuilder {
            cluster,
            template: None,
            auth_url: None,
        }
    }

    /// Convert to a minijinja Value for rendering
    ///
    /// Absent optional parts are left undefined so that a template that
    /// needs them fails instead of rendering `none`.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("cluster", Value::from_serialize(&self.cluster));
        if let Some(template) = &self.template {
            map.insert("template", Value::from_serialize(template));
        }
        if let Some(auth_url) = &self.auth_url {
            map.insert("auth_url", Value::from(auth_url.clone()));
        }
        Value::from_iter(map)
    }
}

/// Builder for RenderContext
#[derive(Debug)]
pub struct RenderContextBuilder<'a> {
    cluster: &'a Cluster,
    template: Option<&'a ClusterTemplate>,
    auth_url: Option<String>,
}

impl<'a> RenderContextBuilder<'a> {
    /// Bind a cluster template
    pub fn template(mut self, template: Option<&'a ClusterTemplate>) -> Self {
        self.template = template;
        self
    }

    /// Set the identity endpoint
    pub fn auth_url(mut self, auth_url: Option<impl Into<String>>) -> Self {
        self.auth_url = auth_url.map(Into::into);
        self
    }

    /// Build the context
    pub fn build(self) -> Result<RenderContext, Error> {
        Ok(RenderContext {
            cluster: ClusterView::from_cluster(self.cluster)?,
            template: self.template.map(TemplateView::from_template).transpose()?,
            auth_url: self.auth_url,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ClusterStatus, NodeGroupRole};

    pub(crate) fn node_group(
        role: NodeGroupRole,
        uuid: &str,
        flavor: &str,
        count: u32,
        is_default: bool,
    ) -> NodeGroup {
        NodeGroup {
            uuid: Uuid::parse_str(uuid).unwrap(),
            name: format!("ng-{}", &uuid[..4]),
            role,
            flavor_id: flavor.to_string(),
            node_count: count,
            min_node_count: None,
            max_node_count: None,
            is_default,
            autoscale: false,
        }
    }

    pub(crate) fn sample_template() -> ClusterTemplate {
        ClusterTemplate {
            uuid: Uuid::parse_str("e0e1b2a4-7b3c-4bde-9e1a-3f2b5b8c2d11").unwrap(),
            name: "k8s-1.24".to_string(),
            image_id: "ubuntu".to_string(),
            kube_version: None,
            labels: BTreeMap::from([("kube_tag".to_string(), "v1.24.3".to_string())]),
            deprecated: false,
        }
    }

    pub(crate) fn sample_cluster() -> Cluster {
        Cluster {
            uuid: Uuid::parse_str("5d12f6fd-a196-4bf0-ae4c-1f639a523a52").unwrap(),
            name: "demo".to_string(),
            project_id: "fake_project".to_string(),
            status: ClusterStatus::CreateInProgress,
            status_reason: None,
            stack_id: None,
            cluster_template_id: sample_template().uuid,
            cluster_template: Some(sample_template()),
            node_groups: vec![
                node_group(
                    NodeGroupRole::ControlPlane,
                    "0a9d5f1e-6a56-4d0c-9c41-5a0d7a1b2c3d",
                    "flavor_small",
                    3,
                    true,
                ),
                node_group(
                    NodeGroupRole::Worker,
                    "1b8e4c2d-3f4a-4b5c-8d6e-7f8091a2b3c4",
                    "flavor_medium",
                    2,
                    true,
                ),
            ],
            credentials: Credentials {
                trust_id: Some("trust-1".to_string()),
                trustee_user_id: Some("trustee-1".to_string()),
                trustee_password: Some("s3cret".to_string()),
            },
        }
    }

    pub(crate) fn sample_context() -> RenderContext {
        let cluster = sample_cluster();
        RenderContext::builder(&cluster)
            .template(cluster.cluster_template.as_ref())
            .auth_url(Some("https://keystone.example.com/v3"))
            .build()
            .unwrap()
    }

    #[test]
    fn default_group_is_named_default_and_others_by_uuid() {
        let mut cluster = sample_cluster();
        cluster.node_groups.push(node_group(
            NodeGroupRole::Worker,
            "27e3153e-d5bf-4b7e-b517-fb518e17f34c",
            "flavor_large",
            3,
            false,
        ));
        let view = ClusterView::from_cluster(&cluster).unwrap();
        let names: Vec<_> = view.node_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["default", "27e3153e-d5bf-4b7e-b517-fb518e17f34c"]);
        assert_eq!(view.control_plane.flavor, "flavor_small");
        assert_eq!(view.control_plane.count, 3);
        assert_eq!(view.credentials_secret, "project-fake_project");
        assert_eq!(
            view.cloud_credentials_secret,
            "5d12f6fd-a196-4bf0-ae4c-1f639a523a52-cloud-credentials"
        );
    }

    #[test]
    fn template_without_version_is_rejected() {
        let mut template = sample_template();
        template.labels.clear();
        assert!(TemplateView::from_template(&template).is_err());
    }

    #[test]
    fn absent_parts_are_undefined_in_value() {
        let cluster = sample_cluster();
        let ctx = RenderContext::builder(&cluster).build().unwrap();
        let value = ctx.to_value();
        assert!(value.get_attr("cluster").is_ok_and(|v| !v.is_undefined()));
        assert!(value.get_attr("template").is_ok_and(|v| v.is_undefined()));
        assert!(value.get_attr("auth_url").is_ok_and(|v| v.is_undefined()));
    }

    #[test]
    fn invalid_cluster_shape_fails_build() {
        let mut cluster = sample_cluster();
        cluster.node_groups.retain(|g| g.role == NodeGroupRole::Worker);
        assert!(RenderContext::builder(&cluster).build().is_err());
    }
}
