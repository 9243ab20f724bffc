//! External tool execution and resource inspection for capstan
//!
//! Everything that leaves the process goes through a [`CommandRunner`]:
//! - [`exec`] - bounded-time process invocation with stdin piping
//! - [`kubectl`] - apply, delete and get
//! - [`helm`] - install, uninstall and status of a release
//! - [`inspector`] - fetch the external resource of a cluster and classify it

#![deny(missing_docs)]

pub mod exec;
pub mod helm;
pub mod inspector;
pub mod kubectl;

pub use exec::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use helm::{Helm, Release, ReleaseInfo, RELEASE_NOT_FOUND_MARKER};
pub use inspector::{
    classify, ClusterObserver, ExternalResource, HelmInspector, KubectlInspector, ObservedState,
    ResourceInspector,
};
pub use kubectl::{Kubectl, NOT_FOUND_MARKER};
