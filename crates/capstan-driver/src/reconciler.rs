//! Status reconciliation
//!
//! One pass observes the external resource of a cluster and maps the stored
//! lifecycle state plus the observed state to a new stored state:
//!
//! | Stored               | READY           | ERROR         | PENDING | NOT_FOUND       |
//! |----------------------|-----------------|---------------|---------|-----------------|
//! | `CREATE_IN_PROGRESS` | CREATE_COMPLETE | CREATE_FAILED | -       | -               |
//! | `UPDATE_IN_PROGRESS` | UPDATE_COMPLETE | UPDATE_FAILED | -       | -               |
//! | `DELETE_IN_PROGRESS` | -               | DELETE_FAILED | -       | DELETE_COMPLETE |
//! | anything else        | UPDATE_FAILED   | UPDATE_FAILED | UPDATE_FAILED | UPDATE_FAILED |
//!
//! `-` leaves the record alone and does not save it. Every other cell saves
//! exactly once.
//!
//! The last row also fires when a sweep reaches a cluster that is simply at
//! rest in a terminal state, so an idle `CREATE_COMPLETE` cluster is marked
//! `UPDATE_FAILED` with reason "unexpected state!". Callers that sweep every
//! cluster should only reconcile the ones in progress.

use std::sync::Arc;

use capstan_capi::{ClusterObserver, ObservedState};
use capstan_common::{Cluster, ClusterStatus, Error, StatusReason};
use tracing::{info, warn};

use crate::store::ClusterStore;

/// New stored state and reason for a stored state and an observation
///
/// `None` means no change.
pub fn transition(
    current: ClusterStatus,
    observed: ObservedState,
) -> Option<(ClusterStatus, StatusReason)> {
    use ClusterStatus as S;
    use ObservedState as O;

    match (current, observed) {
        (S::CreateInProgress, O::Ready) => Some((S::CreateComplete, StatusReason::ready())),
        (S::CreateInProgress, O::Error) => {
            Some((S::CreateFailed, StatusReason::external_error()))
        }
        (S::CreateInProgress, O::Pending | O::NotFound) => None,

        (S::UpdateInProgress, O::Ready) => Some((S::UpdateComplete, StatusReason::ready())),
        (S::UpdateInProgress, O::Error) => {
            Some((S::UpdateFailed, StatusReason::external_error()))
        }
        (S::UpdateInProgress, O::Pending | O::NotFound) => None,

        (S::DeleteInProgress, O::NotFound) => Some((S::DeleteComplete, StatusReason::deleted())),
        (S::DeleteInProgress, O::Error) => {
            Some((S::DeleteFailed, StatusReason::external_error()))
        }
        (S::DeleteInProgress, O::Pending | O::Ready) => None,

        (_, _) => Some((S::UpdateFailed, StatusReason::unexpected_state())),
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Stored state before the pass
    pub previous: ClusterStatus,
    /// Stored state after the pass
    pub status: ClusterStatus,
    /// What was observed; `None` when the stored state was not in progress
    pub observed: Option<ObservedState>,
    /// Whether the record was saved
    pub saved: bool,
}

/// Advances stored lifecycle state from observed external state
pub struct StatusReconciler {
    observer: ClusterObserver,
    store: Arc<dyn ClusterStore>,
}

impl StatusReconciler {
    /// Reconciler observing through `observer` and saving to `store`
    pub fn new(observer: ClusterObserver, store: Arc<dyn ClusterStore>) -> Self {
        Self { observer, store }
    }

    /// Run one pass over `cluster`
    ///
    /// Inspection failures are not returned: they are logged and treated as
    /// an observed `ERROR`, so the failure shows up as a `*_FAILED` status.
    /// Only a failed save is an error.
    pub async fn reconcile(&self, cluster: &mut Cluster) -> Result<ReconcileOutcome, Error> {
        let previous = cluster.status;

        let observed = if previous.is_in_progress() {
            Some(self.observe(cluster).await)
        } else {
            None
        };

        // Stored states outside the three in-progress ones fail regardless of observation
        let change = match observed {
            Some(observed) => transition(previous, observed),
            None => transition(previous, ObservedState::Error),
        };

        let Some((status, reason)) = change else {
            info!(
                cluster = %cluster.uuid,
                status = %previous,
                observed = ?observed.map(|o| o.as_str()),
                "cluster still converging"
            );
            return Ok(ReconcileOutcome {
                previous,
                status: previous,
                observed,
                saved: false,
            });
        };

        if previous.is_in_progress() {
            info!(
                cluster = %cluster.uuid,
                from = %previous,
                to = %status,
                reason = %reason,
                "cluster status changed"
            );
        } else {
            warn!(
                cluster = %cluster.uuid,
                from = %previous,
                to = %status,
                "reconciled a cluster that was not in progress"
            );
        }

        cluster.apply_transition(status, &reason);
        self.store.save(cluster).await?;

        Ok(ReconcileOutcome {
            previous,
            status,
            observed,
            saved: true,
        })
    }

    async fn observe(&self, cluster: &Cluster) -> ObservedState {
        match self.observer.observe(cluster).await {
            Ok(observed) => observed,
            Err(e) => {
                warn!(cluster = %cluster.uuid, error = %e, "failed to inspect cluster, treating as error");
                ObservedState::Error
            }
        }
    }
}
