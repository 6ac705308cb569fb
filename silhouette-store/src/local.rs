//! Single-node, always-leader [`ReplicatedLog`] implementation.
//!
//! `LocalLog` never replicates anywhere; it exists so the coordinator (and
//! its tests) can run without a real consensus deployment. It never returns
//! [`LogError::NotLeader`] or [`LogError::Timeout`] — those are reachable
//! only through a real multi-node implementation of this trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{LogError, ReplicatedLog};

/// A single-node reference [`ReplicatedLog`] backed by an in-memory map.
#[derive(Clone, Default)]
pub struct LocalLog {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    node_id: Arc<str>,
}

impl LocalLog {
    /// Creates a new, empty log identifying itself as `node_id`.
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            entries: Arc::default(),
            node_id: Arc::from(node_id.into()),
        }
    }

    /// Restores a log from a prior [`ReplicatedLog::snapshot`].
    pub fn from_snapshot(node_id: impl Into<String>, snapshot: Vec<(String, Vec<u8>)>) -> Self {
        let log = Self::new(node_id);
        log.entries.write().extend(snapshot);
        log
    }
}

#[async_trait]
impl ReplicatedLog for LocalLog {
    #[tracing::instrument(level = "debug", skip(self, value))]
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), LogError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LogError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn is_leader(&self) -> bool {
        true
    }

    async fn leader(&self) -> Option<String> {
        Some(self.node_id.to_string())
    }

    async fn add_voter(&self, _node_id: &str) -> Result<(), LogError> {
        Ok(())
    }

    async fn remove_voter(&self, _node_id: &str) -> Result<(), LogError> {
        Ok(())
    }

    async fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
