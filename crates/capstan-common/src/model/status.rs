//! Lifecycle status stored on a cluster record

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state persisted on a cluster
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    /// Create was requested and the external resource is converging
    #[default]
    CreateInProgress,
    /// The external resource reported ready after a create
    CreateComplete,
    /// The external resource reported an error during a create
    CreateFailed,
    /// Update was requested and the external resource is converging
    UpdateInProgress,
    /// The external resource reported ready after an update
    UpdateComplete,
    /// The update failed, or reconciliation met an unexpected state
    UpdateFailed,
    /// Removal was requested and the external resource is going away
    DeleteInProgress,
    /// The external resource is gone
    DeleteComplete,
    /// The external resource reported an error during removal
    DeleteFailed,
}

impl ClusterStatus {
    /// All states, in declaration order
    pub const ALL: [ClusterStatus; 9] = [
        Self::CreateInProgress,
        Self::CreateComplete,
        Self::CreateFailed,
        Self::UpdateInProgress,
        Self::UpdateComplete,
        Self::UpdateFailed,
        Self::DeleteInProgress,
        Self::DeleteComplete,
        Self::DeleteFailed,
    ];

    /// Wire name, e.g. `CREATE_IN_PROGRESS`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::CreateFailed => "CREATE_FAILED",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::DeleteFailed => "DELETE_FAILED",
        }
    }

    /// True for the three states a reconciliation pass can advance
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::CreateInProgress | Self::UpdateInProgress | Self::DeleteInProgress
        )
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a status reason
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    /// The external resource reported ready
    Ready,
    /// The external resource is gone
    Deleted,
    /// The external resource reported an error
    ExternalError,
    /// Reconciliation ran on a cluster that was not mid-transition
    UnexpectedState,
}

/// Why a cluster is in its current state
///
/// The persisted record only keeps the message; the kind lets the
/// reconciler and its tests reason about transitions without matching text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReason {
    /// Category of the reason
    pub kind: ReasonKind,
    /// Human readable text stored as the cluster's status reason
    pub message: String,
}

impl StatusReason {
    fn new(kind: ReasonKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    /// "cluster is ready"
    pub fn ready() -> Self {
        Self::new(ReasonKind::Ready, "cluster is ready")
    }

    /// "cluster deleted"
    pub fn deleted() -> Self {
        Self::new(ReasonKind::Deleted, "cluster deleted")
    }

    /// "cluster is in error state"
    pub fn external_error() -> Self {
        Self::new(ReasonKind::ExternalError, "cluster is in error state")
    }

    /// "unexpected state!"
    pub fn unexpected_state() -> Self {
        Self::new(ReasonKind::UnexpectedState, "unexpected state!")
    }
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_screaming_snake_case() {
        let json = serde_json::to_string(&ClusterStatus::DeleteInProgress).unwrap();
        assert_eq!(json, "\"DELETE_IN_PROGRESS\"");

        let parsed: ClusterStatus = serde_json::from_str("\"UPDATE_FAILED\"").unwrap();
        assert_eq!(parsed, ClusterStatus::UpdateFailed);
    }

    #[test]
    fn display_matches_the_wire_name_for_every_state() {
        for status in ClusterStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn only_three_states_are_in_progress() {
        let in_progress: Vec<_> = ClusterStatus::ALL
            .into_iter()
            .filter(ClusterStatus::is_in_progress)
            .collect();
        assert_eq!(
            in_progress,
            vec![
                ClusterStatus::CreateInProgress,
                ClusterStatus::UpdateInProgress,
                ClusterStatus::DeleteInProgress
            ]
        );
        assert!(!ClusterStatus::DeleteComplete.is_in_progress());
    }

    #[test]
    fn reasons_render_their_message() {
        assert_eq!(StatusReason::ready().to_string(), "cluster is ready");
        assert_eq!(StatusReason::deleted().to_string(), "cluster deleted");
        assert_eq!(
            StatusReason::external_error().to_string(),
            "cluster is in error state"
        );
        assert_eq!(
            StatusReason::unexpected_state().kind,
            ReasonKind::UnexpectedState
        );
    }
}
