//! Template engine for manifest rendering
//!
//! Uses minijinja with jinja-compatible delimiters, strict undefined
//! handling and block trimming so that templates can be written as plain
//! YAML with control lines on their own.

use std::path::Path;

use minijinja::{path_loader, AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use tracing::debug;

use super::context::RenderContext;
use super::error::TemplateError;
use super::filters;

/// Helm values for the release backend
pub const VALUES_TEMPLATE: &str = "values.yaml.j2";
/// Cloud credentials secret
pub const SECRET_TEMPLATE: &str = "secret.yaml.j2";
/// Shared cluster template document
pub const CLUSTER_TEMPLATE_TEMPLATE: &str = "template.yaml.j2";
/// Cluster-specific document
pub const CLUSTER_TEMPLATE: &str = "cluster.yaml.j2";

const BUILTIN_TEMPLATES: [(&str, &str); 4] = [
    (
        VALUES_TEMPLATE,
        include_str!("../../templates/values.yaml.j2"),
    ),
    (
        SECRET_TEMPLATE,
        include_str!("../../templates/secret.yaml.j2"),
    ),
    (
        CLUSTER_TEMPLATE_TEMPLATE,
        include_str!("../../templates/template.yaml.j2"),
    ),
    (
        CLUSTER_TEMPLATE,
        include_str!("../../templates/cluster.yaml.j2"),
    ),
];

/// Named-template renderer
///
/// Templates come either from the set compiled into the crate or from a
/// directory on disk. A missing template, a syntax error or a reference to
/// an undefined variable fails the render; there is no partial output.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Engine over the built-in templates
    pub fn builtin() -> Result<Self, TemplateError> {
        let mut env = base_environment();
        for (name, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Engine loading templates by file name from `dir`
    pub fn from_dir(dir: &Path) -> Result<Self, TemplateError> {
        if !dir.is_dir() {
            return Err(TemplateError::Directory(dir.display().to_string()));
        }
        let mut env = base_environment();
        env.set_loader(path_loader(dir));
        Ok(Self { env })
    }

    /// Render the named template with the given context
    pub fn render(&self, name: &str, ctx: &RenderContext) -> Result<String, TemplateError> {
        let template = self.env.get_template(name).map_err(|e| {
            if e.kind() == ErrorKind::TemplateNotFound {
                TemplateError::NotFound(name.to_string())
            } else {
                TemplateError::from(e)
            }
        })?;
        debug!(template = name, "rendering template");
        Ok(template.render(ctx.to_value())?)
    }
}

fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    // Output is YAML; values are quoted explicitly with `tojson`
    env.set_auto_escape_callback(|_| AutoEscape::None);

    env.add_filter("default", filters::default_filter);
    env.add_filter("base64_encode", filters::base64_encode);
    env.add_filter("required", filters::required);
    env
}
