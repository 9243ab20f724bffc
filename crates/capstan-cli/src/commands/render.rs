//! Render command

use std::path::PathBuf;

use capstan_common::template::ManifestRenderer;
use capstan_common::{Backend, DriverConfig, Error};
use clap::Args;

use super::read_cluster;
use crate::Result;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Cluster record file (YAML or JSON)
    #[arg(long)]
    pub cluster: PathBuf,

    /// Render as if the cluster template were gone (manifests backend)
    #[arg(long)]
    pub without_template: bool,
}

pub fn run(args: RenderArgs, config: &DriverConfig) -> Result<()> {
    let output = render(&args, config)?;
    print!("{}", output);
    Ok(())
}

fn render(args: &RenderArgs, config: &DriverConfig) -> Result<String> {
    let cluster = read_cluster(&args.cluster)?;
    let renderer = ManifestRenderer::from_config(config)?;
    let template = if args.without_template {
        None
    } else {
        cluster.cluster_template.as_ref()
    };

    let output = match config.backend {
        Backend::Manifests => renderer.render_manifests(&cluster, template)?,
        Backend::Release => {
            let template = template.ok_or_else(|| {
                Error::validation_for(cluster.uuid, "helm values need a cluster template")
            })?;
            renderer.render_values(&cluster, template)?
        }
    };
    Ok(output)
}
