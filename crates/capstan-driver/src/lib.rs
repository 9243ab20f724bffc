//! Cluster lifecycle driver for capstan
//!
//! - [`driver`] - create, update and delete a cluster's external resources;
//!   refuses the operations it does not support
//! - [`reconciler`] - advance a cluster's stored lifecycle state from the
//!   observed state of its external resource
//! - [`store`] - where cluster records are saved

#![deny(missing_docs)]

pub mod driver;
pub mod reconciler;
pub mod store;

pub use driver::{Driver, Provision};
pub use reconciler::{transition, ReconcileOutcome, StatusReconciler};
pub use store::{ClusterStore, FileClusterStore};
