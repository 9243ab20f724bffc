//! Error types for capstan
//!
//! Errors are structured with fields so that a failed lifecycle operation
//! tells the caller which cluster, which program and which exit code were
//! involved without having to parse a message.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::template::TemplateError;

/// Why a lifecycle operation is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// The driver may support this later
    NotYetImplemented,
    /// The driver will never support this
    WillNotImplement,
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetImplemented => write!(f, "not implemented yet"),
            Self::WillNotImplement => write!(f, "will not be implemented"),
        }
    }
}

/// Failure of an external program invocation
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started or its pipes failed
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// The underlying io error
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish within its time budget and was killed
    #[error("{program} timed out after {timeout:?}")]
    Timeout {
        /// Program that was invoked
        program: String,
        /// The budget that was exceeded
        timeout: Duration,
    },

    /// The program exited with a non-zero status
    #[error("{program} exited with code {}: {stderr}", display_code(.exit_code))]
    Failed {
        /// Program that was invoked
        program: String,
        /// Exit code, None when killed by a signal
        exit_code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// The program succeeded but its output could not be used
    #[error("{program} produced unusable output: {message}")]
    InvalidOutput {
        /// Program that was invoked
        program: String,
        /// What was wrong with the output
        message: String,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl ExecError {
    /// Exit code of a failed invocation
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Captured stderr of a failed invocation
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// True when the program exited with code 1 and reported `marker` on stderr.
    ///
    /// Both kubectl and helm signal a missing object this way.
    pub fn is_not_found(&self, marker: &str) -> bool {
        self.exit_code() == Some(1) && self.stderr().is_some_and(|s| s.contains(marker))
    }
}

/// Main error type for capstan operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Manifest rendering failed
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// An external tool failed
    #[error("execution error: {0}")]
    Execution(#[from] ExecError),

    /// The lifecycle operation is not supported by this driver
    #[error("{operation} is not supported: {reason}")]
    Unsupported {
        /// Name of the refused operation
        operation: String,
        /// Whether support may arrive later
        reason: UnsupportedReason,
    },

    /// The cluster record cannot be processed as given
    #[error("validation error for {cluster}: {message}")]
    Validation {
        /// Cluster the error relates to
        cluster: String,
        /// Description of what's invalid
        message: String,
    },

    /// The persistence collaborator failed
    #[error("persistence error for {cluster}: {message}")]
    Persistence {
        /// Cluster being saved or loaded
        cluster: String,
        /// Description of what failed
        message: String,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create an unsupported-operation error
    pub fn unsupported(operation: impl Into<String>, reason: UnsupportedReason) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            reason,
        }
    }

    /// Create a validation error with cluster context
    pub fn validation_for(cluster: impl fmt::Display, msg: impl Into<String>) -> Self {
        Self::Validation {
            cluster: cluster.to_string(),
            message: msg.into(),
        }
    }

    /// Create a persistence error with cluster context
    pub fn persistence(cluster: impl fmt::Display, msg: impl Into<String>) -> Self {
        Self::Persistence {
            cluster: cluster.to_string(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
