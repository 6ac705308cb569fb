//! Per-round PIR session material cache (C8, Design Note 9.4).
//!
//! [`RoundSessions`] holds, per round id, the [`BaseParams`] and
//! key→index mapping a client needs to build PIR sessions against that
//! round. Installing a round's materials is double-checked: a concurrent
//! fetch that loses the race discards its own result and reuses whatever
//! the winner installed, so two racing reads of a brand-new round never
//! diverge on which materials they query through.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use silhouette_pir::params::BaseParams;
use silhouette_types::RoundId;
use tokio::sync::RwLock;

/// The material needed to build [`silhouette_pir::PirSession`]s against one
/// sealed round.
pub struct RoundMaterials {
    pub(crate) base_params: BaseParams,
    pub(crate) key_to_index: HashMap<String, i32>,
}

impl RoundMaterials {
    /// Pairs a round's public PIR parameters with its key→index mapping.
    pub fn new(base_params: BaseParams, key_to_index: HashMap<String, i32>) -> Self {
        Self {
            base_params,
            key_to_index,
        }
    }

    /// The row index a key maps to, if it was published into this round.
    pub fn index_of(&self, key: &str) -> Option<i32> {
        self.key_to_index.get(key).copied()
    }
}

/// A read-mostly, double-checked cache of [`RoundMaterials`] keyed by round.
#[derive(Default)]
pub struct RoundSessions {
    installed: RwLock<HashMap<RoundId, Arc<RoundMaterials>>>,
}

impl RoundSessions {
    /// Builds an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached materials for `round_id`, fetching and installing
    /// them via `fetch` if absent.
    ///
    /// If a concurrent caller wins the race to install first, this call
    /// discards its own fetch and returns the winner's materials instead —
    /// matching spec §4.8's "atomically install it into the map; if a
    /// concurrent installer wins the race, discard ours and use the
    /// installed one".
    pub async fn get_or_install<F, Fut, E>(
        &self,
        round_id: RoundId,
        fetch: F,
    ) -> Result<Arc<RoundMaterials>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RoundMaterials, E>>,
    {
        if let Some(existing) = self.installed.read().await.get(&round_id) {
            return Ok(existing.clone());
        }

        let fetched = Arc::new(fetch().await?);
        let mut installed = self.installed.write().await;
        Ok(installed.entry(round_id).or_insert(fetched).clone())
    }

    /// Drops any cached materials for `round_id`, forcing the next read of
    /// that round to re-fetch. Rounds are never resealed in place, so this
    /// is only useful for reclaiming memory, not for observing a new seal.
    pub async fn invalidate(&self, round_id: RoundId) {
        self.installed.write().await.remove(&round_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn installs_once_and_reuses_cached_materials() {
        let sessions = RoundSessions::new();
        let round_id = RoundId::new(1);
        let fetches = AtomicUsize::new(0);

        let materials = |index: i32| async {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(RoundMaterials::new(
                BaseParams::from_bytes(&dummy_base_params_bytes()).unwrap(),
                HashMap::from([("k".to_string(), index)]),
            ))
        };

        let first = sessions.get_or_install(round_id, || materials(1)).await.unwrap();
        let second = sessions.get_or_install(round_id, || materials(2)).await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(first.index_of("k"), Some(1));
        assert_eq!(second.index_of("k"), Some(1));
    }

    #[tokio::test]
    async fn invalidate_forces_a_re_fetch() {
        let sessions = RoundSessions::new();
        let round_id = RoundId::new(2);

        sessions
            .get_or_install(round_id, || async {
                Ok::<_, std::convert::Infallible>(RoundMaterials::new(
                    BaseParams::from_bytes(&dummy_base_params_bytes()).unwrap(),
                    HashMap::new(),
                ))
            })
            .await
            .unwrap();

        sessions.invalidate(round_id).await;

        let fetched_again = AtomicUsize::new(0);
        sessions
            .get_or_install(round_id, || async {
                fetched_again.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>(RoundMaterials::new(
                    BaseParams::from_bytes(&dummy_base_params_bytes()).unwrap(),
                    HashMap::new(),
                ))
            })
            .await
            .unwrap();

        assert_eq!(fetched_again.load(Ordering::SeqCst), 1);
    }

    fn dummy_base_params_bytes() -> Vec<u8> {
        let params = silhouette_pir::params::PirParams::select(1, 8, [0u8; 32]);
        let shard = silhouette_pir::server::PirShard::build(params, vec![vec![0u8; 64]]).unwrap();
        shard.base_params().to_bytes()
    }
}
