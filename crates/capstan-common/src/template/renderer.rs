//! Manifest bundles and helm values for a cluster

use tracing::debug;

use super::context::RenderContext;
use super::engine::{
    TemplateEngine, CLUSTER_TEMPLATE, CLUSTER_TEMPLATE_TEMPLATE, SECRET_TEMPLATE, VALUES_TEMPLATE,
};
use crate::model::{Cluster, ClusterTemplate};
use crate::{DriverConfig, Error, DOCUMENT_SEPARATOR};

/// Renders the documents the lifecycle operations apply
pub struct ManifestRenderer {
    engine: TemplateEngine,
    auth_url: Option<String>,
}

impl ManifestRenderer {
    /// Create a renderer over an engine
    pub fn new(engine: TemplateEngine, auth_url: Option<String>) -> Self {
        Self { engine, auth_url }
    }

    /// Built-in templates, or the configured template directory
    pub fn from_config(config: &DriverConfig) -> Result<Self, Error> {
        let engine = match &config.templates_dir {
            Some(dir) => TemplateEngine::from_dir(dir)?,
            None => TemplateEngine::builtin()?,
        };
        Ok(Self::new(engine, config.auth_url.clone()))
    }

    /// Helm values for the release backend; a template is required
    pub fn render_values(
        &self,
        cluster: &Cluster,
        template: &ClusterTemplate,
    ) -> Result<String, Error> {
        let ctx = RenderContext::builder(cluster)
            .template(Some(template))
            .build()?;
        let values = self.engine.render(VALUES_TEMPLATE, &ctx)?;
        debug!(cluster = %cluster.uuid, "rendered helm values");
        Ok(values)
    }

    /// Manifest bundle for the kubectl backend
    ///
    /// With a template the bundle holds the credentials secret, the
    /// ClusterTemplate document and the Cluster document. Without one only
    /// the Cluster document is emitted.
    pub fn render_manifests(
        &self,
        cluster: &Cluster,
        template: Option<&ClusterTemplate>,
    ) -> Result<String, Error> {
        let ctx = RenderContext::builder(cluster)
            .template(template)
            .auth_url(self.auth_url.clone())
            .build()?;

        let names: &[&str] = if template.is_some() {
            &[SECRET_TEMPLATE, CLUSTER_TEMPLATE_TEMPLATE, CLUSTER_TEMPLATE]
        } else {
            &[CLUSTER_TEMPLATE]
        };

        let documents = names
            .iter()
            .map(|name| self.engine.render(name, &ctx))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            cluster = %cluster.uuid,
            documents = documents.len(),
            "rendered manifest bundle"
        );
        Ok(join_documents(&documents))
    }
}

/// Join documents, each preceded by the separator and ending in a newline
pub fn join_documents(documents: &[String]) -> String {
    documents
        .iter()
        .map(|doc| format!("{}{}\n", DOCUMENT_SEPARATOR, doc.trim_end()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeGroupRole;
    use crate::template::context::tests::{node_group, sample_cluster, sample_template};
    use crate::template::TemplateError;

    fn renderer() -> ManifestRenderer {
        ManifestRenderer::new(
            TemplateEngine::builtin().unwrap(),
            Some("https://keystone.example.com/v3".to_string()),
        )
    }

    fn documents(bundle: &str) -> Vec<serde_yaml::Value> {
        bundle
            .split(DOCUMENT_SEPARATOR)
            .filter(|d| !d.trim().is_empty())
            .map(|d| serde_yaml::from_str(d).expect("rendered document should be YAML"))
            .collect()
    }

    /// Story: a cluster with two worker groups and a template renders a
    /// control plane block plus one block per group, with sizes and counts
    /// taken verbatim and image/version substituted from the template.
    #[test]
    fn story_values_carry_groups_and_template_fields() {
        let mut cluster = sample_cluster();
        cluster.node_groups.push(node_group(
            NodeGroupRole::Worker,
            "17e3153e-d5bf-4b7e-b517-fb518e17f34d",
            "flavor_xlarge",
            4,
            false,
        ));
        let template = sample_template();

        let values = renderer().render_values(&cluster, &template).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&values).unwrap();

        assert_eq!(doc["kubernetesVersion"], "v1.24.3");
        assert_eq!(doc["machineImage"], "ubuntu");
        assert_eq!(doc["cloudCredentialsSecretName"], "project-fake_project");
        assert_eq!(doc["controlPlane"]["machineFlavor"], "flavor_small");
        assert_eq!(doc["controlPlane"]["machineCount"], 3);

        let groups = doc["nodeGroups"].as_sequence().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["name"], "default");
        assert_eq!(groups[0]["machineFlavor"], "flavor_medium");
        assert_eq!(groups[0]["machineCount"], 2);
        assert_eq!(groups[0]["autoscale"], false);
        assert_eq!(groups[1]["name"], "17e3153e-d5bf-4b7e-b517-fb518e17f34d");
        assert_eq!(groups[1]["machineFlavor"], "flavor_xlarge");
        assert_eq!(groups[1]["machineCount"], 4);
    }

    #[test]
    fn values_include_bounds_for_autoscaled_groups() {
        let mut cluster = sample_cluster();
        for group in cluster.node_groups.iter_mut() {
            if group.role == NodeGroupRole::Worker {
                group.autoscale = true;
                group.min_node_count = Some(1);
            }
        }
        let values = renderer()
            .render_values(&cluster, &sample_template())
            .unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&values).unwrap();
        let group = &doc["nodeGroups"][0];
        assert_eq!(group["autoscale"], true);
        assert_eq!(group["machineCountMin"], 1);
        // No max configured: falls back to the desired count
        assert_eq!(group["machineCountMax"], 2);
    }

    #[test]
    fn values_refuse_a_minimum_above_the_implied_maximum() {
        let mut cluster = sample_cluster();
        for group in cluster.node_groups.iter_mut() {
            if group.role == NodeGroupRole::Worker {
                group.autoscale = true;
                group.min_node_count = Some(5);
            }
        }
        let err = renderer()
            .render_values(&cluster, &sample_template())
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn values_escape_awkward_names() {
        let mut cluster = sample_cluster();
        cluster.project_id = "pro\"ject: x".to_string();
        let values = renderer()
            .render_values(&cluster, &sample_template())
            .unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&values).unwrap();
        assert_eq!(doc["cloudCredentialsSecretName"], "project-pro\"ject: x");
    }

    #[test]
    fn manifests_with_template_hold_three_documents() {
        let cluster = sample_cluster();
        let bundle = renderer()
            .render_manifests(&cluster, Some(&sample_template()))
            .unwrap();
        let docs = documents(&bundle);

        let kinds: Vec<_> = docs.iter().map(|d| d["kind"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["Secret", "ClusterTemplate", "Cluster"]);

        let cluster_doc = &docs[2];
        assert_eq!(
            cluster_doc["metadata"]["name"],
            "5d12f6fd-a196-4bf0-ae4c-1f639a523a52"
        );
        assert_eq!(
            cluster_doc["spec"]["templateName"],
            "e0e1b2a4-7b3c-4bde-9e1a-3f2b5b8c2d11"
        );
        assert_eq!(cluster_doc["spec"]["nodeGroups"][0]["count"], 2);
        assert_eq!(
            cluster_doc["spec"]["cloudCredentialsSecretName"],
            docs[0]["metadata"]["name"]
        );
        assert_eq!(docs[1]["spec"]["values"]["kubernetesVersion"], "v1.24.3");
    }

    #[test]
    fn secret_carries_encoded_clouds_yaml() {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let bundle = renderer()
            .render_manifests(&sample_cluster(), Some(&sample_template()))
            .unwrap();
        let secret = &documents(&bundle)[0];
        let encoded = secret["data"]["clouds.yaml"].as_str().unwrap();
        let clouds = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        let clouds: serde_yaml::Value = serde_yaml::from_str(&clouds).unwrap();

        let auth = &clouds["clouds"]["openstack"]["auth"];
        assert_eq!(auth["auth_url"], "https://keystone.example.com/v3");
        assert_eq!(auth["trust_id"], "trust-1");
        assert_eq!(auth["user_id"], "trustee-1");
    }

    /// Story: two clusters in one project each get their own credentials
    /// secret, so applying the second cannot overwrite the first's trust.
    #[test]
    fn story_clusters_sharing_a_project_get_separate_secrets() {
        let first = sample_cluster();
        let mut second = sample_cluster();
        second.uuid = uuid::Uuid::parse_str("9f1c2b3a-4d5e-4f60-8a7b-0c1d2e3f4a5b").unwrap();
        second.credentials.trust_id = Some("trust-2".to_string());

        let render = |cluster: &Cluster| {
            let bundle = renderer()
                .render_manifests(cluster, Some(&sample_template()))
                .unwrap();
            documents(&bundle)
        };
        let first_docs = render(&first);
        let second_docs = render(&second);

        let first_secret = first_docs[0]["metadata"]["name"].as_str().unwrap();
        let second_secret = second_docs[0]["metadata"]["name"].as_str().unwrap();
        assert_eq!(
            first_secret,
            "5d12f6fd-a196-4bf0-ae4c-1f639a523a52-cloud-credentials"
        );
        assert_ne!(first_secret, second_secret);
        assert_eq!(
            second_docs[2]["spec"]["cloudCredentialsSecretName"],
            second_secret
        );

        // Helm values still point at the shared project secret
        let values = renderer()
            .render_values(&second, &sample_template())
            .unwrap();
        assert!(values.contains("cloudCredentialsSecretName: \"project-fake_project\""));
    }

    #[test]
    fn manifests_without_template_hold_only_the_cluster() {
        let bundle = renderer()
            .render_manifests(&sample_cluster(), None)
            .unwrap();
        let docs = documents(&bundle);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["kind"], "Cluster");
        assert!(bundle.starts_with(DOCUMENT_SEPARATOR));
    }

    #[test]
    fn missing_auth_url_fails_the_secret() {
        let renderer = ManifestRenderer::new(TemplateEngine::builtin().unwrap(), None);
        let err = renderer
            .render_manifests(&sample_cluster(), Some(&sample_template()))
            .unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::Render(_))));
        assert!(err.to_string().contains("required value is missing"));

        // Cluster-only bundles do not need it
        assert!(renderer.render_manifests(&sample_cluster(), None).is_ok());
    }

    #[test]
    fn join_documents_separates_and_terminates() {
        let joined = join_documents(&["a: 1\n\n".to_string(), "b: 2".to_string()]);
        assert_eq!(joined, "---\na: 1\n---\nb: 2\n");
    }
}
