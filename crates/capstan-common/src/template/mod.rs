//! Manifest templating
//!
//! Templates are minijinja (jinja syntax) with strict undefined handling.
//! The built-in set covers helm values, the credentials secret, the shared
//! ClusterTemplate document and the cluster-specific Cluster document; a
//! directory of same-named files can replace them.

mod context;
mod engine;
mod error;
mod filters;
mod renderer;

pub use context::{
    cluster_credentials_secret_name, credentials_secret_name, ClusterView, NodeGroupView,
    RenderContext, RenderContextBuilder, TemplateView, DEFAULT_GROUP_NAME,
};
pub use engine::{
    TemplateEngine, CLUSTER_TEMPLATE, CLUSTER_TEMPLATE_TEMPLATE, SECRET_TEMPLATE, VALUES_TEMPLATE,
};
pub use error::TemplateError;
pub use renderer::{join_documents, ManifestRenderer};
