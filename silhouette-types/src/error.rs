//! The error-kind taxonomy shared across the coordinator, client, and
//! algorithm driver. Every RPC response that fails carries one of these
//! kinds plus a human-readable message; callers branch on the kind, not on
//! the message text.

use serde::{Deserialize, Serialize};

/// Coarse-grained classification of a failed operation, stable across the
/// wire so clients can retry or fail fast without parsing message text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// This node is not the current leader; the caller should retry against
    /// the leader (or after a short backoff, once the leader is known).
    NotLeader,
    /// The referenced round, key, or worker does not exist.
    NotFound,
    /// The operation conflicts with something that already exists (e.g. a
    /// worker re-publishing a key under a different owner).
    AlreadyExists,
    /// The request is structurally invalid or violates a documented
    /// precondition the caller controls (e.g. empty worker id).
    InvalidArgument,
    /// The request is well-formed but the round is not in the state the
    /// operation requires (e.g. publishing to a sealed round).
    FailedPrecondition,
    /// The request timed out waiting for a replicated commit or a round
    /// seal.
    Timeout,
    /// A query referenced a key absent from the queried round's key
    /// mapping.
    UnknownKey,
    /// An unexpected internal failure (codec, replication, or storage
    /// fault) that the caller cannot resolve by changing its request.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotLeader => "not leader",
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::InvalidArgument => "invalid argument",
            Self::FailedPrecondition => "failed precondition",
            Self::Timeout => "timeout",
            Self::UnknownKey => "unknown key",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl std::error::Error for ErrorKind {}

/// A wire-level error: the [`ErrorKind`] plus a free-form message for logs
/// and diagnostics. Carried as the body of non-2xx coordinator responses.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct SilhouetteError {
    /// The coarse classification of the failure.
    pub kind: ErrorKind,
    /// A human-readable description, not intended to be parsed.
    pub message: String,
}

impl SilhouetteError {
    /// Constructs a new error from a kind and a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
