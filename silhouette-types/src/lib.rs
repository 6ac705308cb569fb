#![deny(missing_docs)]
//! Core type definitions shared across the silhouette-db workspace.
//!
//! This crate groups together the strongly-typed values and message
//! structures used across the coordination service, the PIR layer, and the
//! driver client. It provides:
//!
//! * Thin wrappers around round and worker identifiers, with consistent
//!   serialization and display implementations.
//! * The round lifecycle ([`RoundState`]) and storage-backend ([`Backend`])
//!   enums shared by the coordinator and the codecs.
//! * The error-kind taxonomy ([`error`]) every RPC maps into.
//! * API versioned request/response types for client/server communication
//!   (see [`api`] module).

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod api;
pub mod error;

pub use error::{ErrorKind, SilhouetteError};

/// Identifies a round. Strictly monotonically advanced by producers, but the
/// coordinator does not enforce monotonicity across rounds.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RoundId(u64);

impl RoundId {
    /// Wraps a raw round number.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw round number.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    /// The replicated-log key under which this round's sealed encoding is
    /// persisted (`round_<id>_results`).
    pub fn storage_key(self) -> String {
        format!("round_{}_results", self.0)
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RoundId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Identifies a worker participant within a round. Never empty once
/// validated at the RPC boundary.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    /// Wraps a raw worker identifier.
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidArgument`] if `value` is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, ErrorKind> {
        let value = value.into();
        if value.is_empty() {
            Err(ErrorKind::InvalidArgument)
        } else {
            Ok(Self(value))
        }
    }

    /// Returns the worker id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a round.
///
/// Transitions: `Open -> Sealed` when the aggregated pair count is
/// non-empty, `Open -> EmptySealed` when it is empty. Both are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// Accepting `PublishValues` calls from workers.
    Open,
    /// Aggregation produced at least one key; the PIR shard exists.
    Sealed,
    /// All expected workers published, but aggregation produced no keys.
    /// No PIR shard was built.
    EmptySealed,
}

/// The storage backend used to encode a sealed round's key/value pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Random-Band OKVS; rejects rounds with fewer than 100 pairs.
    Okvs,
    /// Self-describing keyed blob; accepts any size or value length.
    Kvs,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Okvs => f.write_str("okvs"),
            Self::Kvs => f.write_str("kvs"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "okvs" => Ok(Self::Okvs),
            "kvs" => Ok(Self::Kvs),
            _ => Err(ErrorKind::InvalidArgument),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_id_storage_key_is_stable() {
        let round = RoundId::new(7);
        assert_eq!(round.storage_key(), "round_7_results");
        assert_eq!(round.into_inner(), 7);
    }

    #[test]
    fn worker_id_rejects_empty() {
        assert!(WorkerId::new("").is_err());
        assert_eq!(WorkerId::new("w1").unwrap().as_str(), "w1");
    }

    #[test]
    fn backend_round_trips_through_str() {
        for backend in [Backend::Okvs, Backend::Kvs] {
            let parsed: Backend = backend.to_string().parse().unwrap();
            assert_eq!(parsed, backend);
        }
        assert!("bogus".parse::<Backend>().is_err());
    }
}
