//! The replicated log interface the round coordinator commits sealed round
//! encodings through.
//!
//! This crate specifies only the interface the coordinator needs from a
//! replicated log: a flat key/value `Set`/`Get`, leadership queries, and
//! voter membership changes. [`LocalLog`] is a single-node, always-leader
//! reference implementation sufficient to run the coordinator standalone
//! and in tests; a real deployment would plug in a Raft (or similar
//! consensus) library behind the same trait.

use async_trait::async_trait;

pub mod local;

pub use local::LocalLog;

/// Dynamic trait object handle for a replicated log, shared across the
/// coordinator's async tasks.
pub type ReplicatedLogHandle = std::sync::Arc<dyn ReplicatedLog + Send + Sync>;

/// Errors a [`ReplicatedLog`] implementation may return.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LogError {
    /// This node is not the leader and cannot service the request.
    #[error("not leader")]
    NotLeader,
    /// The underlying consensus round timed out before committing.
    #[error("commit timed out")]
    Timeout,
    /// An implementation-specific failure (storage I/O, transport, etc).
    #[error("replicated log error: {0}")]
    Internal(String),
}

/// A replicated, linearizable key/value log.
///
/// Implementations must guarantee that once `Set` returns successfully, the
/// written value is visible to `Get` calls on every node that has applied
/// up to that commit index, and that `Get` never observes a value the
/// cluster has not actually committed.
#[async_trait]
pub trait ReplicatedLog {
    /// Writes `value` under `key`, returning once the write has committed
    /// to a quorum. Must only be called on the leader.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), LogError>;

    /// Reads the value committed under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LogError>;

    /// Returns whether this node currently believes itself to be the
    /// leader.
    async fn is_leader(&self) -> bool;

    /// Returns the id of the node this implementation believes is the
    /// current leader, if known.
    async fn leader(&self) -> Option<String>;

    /// Adds `node_id` as a voting member of the cluster.
    async fn add_voter(&self, node_id: &str) -> Result<(), LogError>;

    /// Removes `node_id` from the set of voting members.
    async fn remove_voter(&self, node_id: &str) -> Result<(), LogError>;

    /// Returns a full snapshot of all committed key/value pairs, used to
    /// seed a fresh node or to rebuild leader-local state after failover.
    async fn snapshot(&self) -> Vec<(String, Vec<u8>)>;
}
