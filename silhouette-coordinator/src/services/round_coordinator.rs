//! Round lifecycle, aggregation, and sealing pipeline (C6).
//!
//! A single exclusive lock (`rounds`) protects the round registry; each
//! round additionally carries its own lock around its submissions map and a
//! `sealing` flag so exactly one `PublishValues` call drives a given round's
//! sealing pipeline, even when several calls cross the expected-worker
//! threshold concurrently. The flag (not `state` itself) is the thing
//! compare-and-swapped: `state` only changes once the pipeline has either
//! committed or failed, so a reader can never observe `Sealed` without a
//! committed replicated blob.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use silhouette_pir::{params::PirParams, server::PirShard};
use silhouette_types::{Backend, ErrorKind, RoundId, RoundState, SilhouetteError, WorkerId};
use silhouette_store::{LogError, ReplicatedLogHandle};

use crate::metrics as m;

struct Round {
    expected_workers: i32,
    inner: Mutex<RoundInner>,
}

struct RoundInner {
    state: RoundState,
    submissions: HashMap<WorkerId, Vec<(String, Vec<u8>)>>,
    sealing: bool,
}

struct SealedArtifact {
    key_to_index: HashMap<String, i32>,
    /// `None` for an `EmptySealed` round: no shard is built when aggregation
    /// produced zero keys.
    shard: Option<PirShard>,
    base_params: Option<silhouette_pir::BaseParams>,
}

/// Drives the round coordinator's lifecycle: `StartRound`, `PublishValues`,
/// and the read-only `GetValue`/`GetBaseParams`/`GetKeyMapping` operations.
pub struct RoundCoordinator {
    log: ReplicatedLogHandle,
    backend: Backend,
    commit_timeout: std::time::Duration,
    rounds: RwLock<HashMap<RoundId, Arc<Round>>>,
    sealed: RwLock<HashMap<RoundId, Arc<SealedArtifact>>>,
}

impl RoundCoordinator {
    /// Builds a coordinator over `log`, encoding sealed rounds with
    /// `backend` and bounding every replicated commit by `commit_timeout`.
    pub fn new(log: ReplicatedLogHandle, backend: Backend, commit_timeout: std::time::Duration) -> Self {
        Self {
            log,
            backend,
            commit_timeout,
            rounds: RwLock::new(HashMap::new()),
            sealed: RwLock::new(HashMap::new()),
        }
    }

    /// Writes `value` under `key` in the replicated log, bounded by
    /// `commit_timeout`. A bare `log.set` call would block indefinitely on
    /// a stalled consensus round; this is the only path that should ever
    /// produce `ErrorKind::Timeout` for a `PublishValues` caller.
    async fn commit(&self, key: &str, value: Vec<u8>) -> Result<(), SilhouetteError> {
        match tokio::time::timeout(self.commit_timeout, self.log.set(key, value)).await {
            Ok(result) => result.map_err(log_error),
            Err(_) => Err(SilhouetteError::new(
                ErrorKind::Timeout,
                format!("replicated commit did not complete within {:?}", self.commit_timeout),
            )),
        }
    }

    async fn require_leader(&self) -> Result<(), SilhouetteError> {
        if self.log.is_leader().await {
            Ok(())
        } else {
            Err(SilhouetteError::new(
                ErrorKind::FailedPrecondition,
                "this node is not the current leader",
            ))
        }
    }

    /// Opens a fresh round, overwriting any prior leader-local state for
    /// `round_id`. Idempotent from an algorithm's point of view: any worker
    /// may call this for the same round id.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn start_round(&self, round_id: RoundId, expected_workers: i32) -> Result<(), SilhouetteError> {
        self.require_leader().await?;
        if expected_workers <= 0 {
            return Err(SilhouetteError::new(
                ErrorKind::InvalidArgument,
                "expected_workers must be positive",
            ));
        }

        let round = Arc::new(Round {
            expected_workers,
            inner: Mutex::new(RoundInner {
                state: RoundState::Open,
                submissions: HashMap::new(),
                sealing: false,
            }),
        });
        self.rounds.write().insert(round_id, round);
        self.sealed.write().remove(&round_id);

        metrics::counter!(m::METRICS_ID_ROUNDS_STARTED).increment(1);
        metrics::gauge!(m::METRICS_ID_ROUNDS_OPEN).increment(1.0);
        Ok(())
    }

    /// Records `worker_id`'s submission for `round_id`, triggering the
    /// sealing pipeline once the distinct submission count reaches
    /// `expected_workers`.
    #[tracing::instrument(level = "debug", skip(self, pairs), fields(round_id = %round_id, worker_id = %worker_id))]
    pub async fn publish_values(
        &self,
        round_id: RoundId,
        worker_id: WorkerId,
        pairs: Vec<(String, Vec<u8>)>,
    ) -> Result<(), SilhouetteError> {
        self.require_leader().await?;

        let round = self
            .rounds
            .read()
            .get(&round_id)
            .cloned()
            .ok_or_else(|| SilhouetteError::new(ErrorKind::NotFound, format!("round {round_id} was never started")))?;

        let (should_seal, snapshot) = {
            let mut inner = round.inner.lock();
            match inner.state {
                RoundState::Sealed | RoundState::EmptySealed => {
                    return Err(SilhouetteError::new(
                        ErrorKind::AlreadyExists,
                        format!("round {round_id} is already sealed"),
                    ));
                }
                RoundState::Open => {}
            }
            inner.submissions.insert(worker_id, pairs);
            let distinct = inner.submissions.len() as i32;
            let should_seal = distinct >= round.expected_workers && !inner.sealing;
            if should_seal {
                inner.sealing = true;
            }
            (should_seal, inner.submissions.clone())
        };

        metrics::counter!(m::METRICS_ID_PUBLISHES).increment(1);

        if !should_seal {
            return Ok(());
        }

        let started = std::time::Instant::now();
        let outcome = self.try_seal(round_id, snapshot).await;
        metrics::histogram!(m::METRICS_ID_SEAL_DURATION)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let mut inner = round.inner.lock();
        inner.sealing = false;
        match outcome {
            Ok(new_state) => {
                inner.state = new_state;
                metrics::gauge!(m::METRICS_ID_ROUNDS_OPEN).decrement(1.0);
                match new_state {
                    RoundState::Sealed => metrics::counter!(m::METRICS_ID_ROUNDS_SEALED).increment(1),
                    RoundState::EmptySealed => {
                        metrics::counter!(m::METRICS_ID_ROUNDS_EMPTY_SEALED).increment(1)
                    }
                    RoundState::Open => unreachable!("try_seal only returns a terminal state"),
                }
                Ok(())
            }
            Err(err) => {
                metrics::counter!(m::METRICS_ID_SEAL_ABORTED).increment(1);
                Err(err)
            }
        }
    }

    /// Aggregates `submissions`, encodes and persists the result, and builds
    /// the round's PIR shard. Leader-local metadata is installed only after
    /// the replicated `Set` has committed, so a reader can never observe
    /// metadata for a round whose blob was not actually committed.
    ///
    /// Refuses to re-seal: a round id that already has a persisted artifact
    /// in the replicated log (from before a `StartRound` reopened it
    /// in-memory) is left untouched and rejected with `AlreadyExists`,
    /// matching spec §4.6/§7.
    #[tracing::instrument(level = "debug", skip(self, submissions), fields(round_id = %round_id))]
    async fn try_seal(
        &self,
        round_id: RoundId,
        submissions: HashMap<WorkerId, Vec<(String, Vec<u8>)>>,
    ) -> Result<RoundState, SilhouetteError> {
        if self.log.get(&round_id.storage_key()).await.map_err(log_error)?.is_some() {
            return Err(SilhouetteError::new(
                ErrorKind::AlreadyExists,
                format!("round {round_id} already has a persisted artifact; refusing to re-seal"),
            ));
        }

        let mut aggregated: HashMap<String, (WorkerId, Vec<u8>)> = HashMap::new();
        for (worker_id, pairs) in &submissions {
            for (key, value) in pairs {
                if let Some((owner, _)) = aggregated.get(key) {
                    if owner != worker_id {
                        return Err(SilhouetteError::new(
                            ErrorKind::AlreadyExists,
                            format!("key `{key}` was already published by worker `{owner}`"),
                        ));
                    }
                }
                aggregated.insert(key.clone(), (worker_id.clone(), value.clone()));
            }
        }

        if aggregated.is_empty() {
            self.commit(&round_id.storage_key(), Vec::new()).await?;
            self.sealed.write().insert(
                round_id,
                Arc::new(SealedArtifact {
                    key_to_index: HashMap::new(),
                    shard: None,
                    base_params: None,
                }),
            );
            return Ok(RoundState::EmptySealed);
        }

        let mut ordered_keys: Vec<String> = aggregated.keys().cloned().collect();
        ordered_keys.sort();

        let pairs_for_encode: Vec<(String, Vec<u8>)> = ordered_keys
            .iter()
            .map(|key| (key.clone(), aggregated[key].1.clone()))
            .collect();

        let encoding_blob = match self.backend {
            Backend::Okvs => silhouette_codec::okvs_encode(&pairs_for_encode).map_err(okvs_error)?,
            Backend::Kvs => silhouette_codec::kvs_encode(&pairs_for_encode),
        };

        let raw_rows: Vec<Vec<u8>> = match self.backend {
            Backend::Okvs => ordered_keys
                .iter()
                .map(|key| {
                    silhouette_codec::okvs_decode(&encoding_blob, key).map(|bytes| bytes.to_vec())
                })
                .collect::<Result<_, _>>()
                .map_err(okvs_error)?,
            Backend::Kvs => ordered_keys
                .iter()
                .map(|key| silhouette_codec::kvs_decode(&encoding_blob, key))
                .collect::<Result<_, _>>()
                .map_err(kvs_error)?,
        };

        let max_len = raw_rows.iter().map(Vec::len).max().unwrap_or(0);
        let params = PirParams::select(raw_rows.len(), max_len, pir_seed(round_id));
        let rows: Vec<Vec<u8>> = raw_rows
            .into_iter()
            .map(|mut row| {
                row.resize(params.elem_size_bytes, 0);
                row
            })
            .collect();

        let shard = PirShard::build(params, rows).map_err(pir_error)?;
        let base_params = shard.base_params();

        self.commit(&round_id.storage_key(), encoding_blob).await?;

        let key_to_index = ordered_keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| (key, index as i32))
            .collect();

        self.sealed.write().insert(
            round_id,
            Arc::new(SealedArtifact {
                key_to_index,
                shard: Some(shard),
                base_params: Some(base_params),
            }),
        );

        Ok(RoundState::Sealed)
    }

    /// Answers an opaque PIR query against a sealed round's shard.
    #[tracing::instrument(level = "debug", skip(self, query), fields(round_id = %round_id))]
    pub async fn get_value(&self, round_id: RoundId, query: &[u8]) -> Result<Vec<u8>, SilhouetteError> {
        self.require_leader().await?;
        self.require_round_exists(round_id)?;

        let artifact = self.sealed.read().get(&round_id).cloned().ok_or_else(|| {
            SilhouetteError::new(ErrorKind::FailedPrecondition, format!("round {round_id} is not sealed"))
        })?;
        let shard = artifact.shard.as_ref().ok_or_else(|| {
            SilhouetteError::new(
                ErrorKind::FailedPrecondition,
                format!("round {round_id} sealed empty; no shard to query"),
            )
        })?;

        let query = silhouette_pir::wire::decode(query)
            .map_err(|_| SilhouetteError::new(ErrorKind::InvalidArgument, "malformed pir query"))?;

        let started = std::time::Instant::now();
        let response = shard.process_query(&query).map_err(pir_error)?;
        metrics::histogram!(m::METRICS_ID_QUERY_DURATION)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        metrics::counter!(m::METRICS_ID_QUERIES).increment(1);

        Ok(silhouette_pir::wire::encode(&response))
    }

    /// Returns the serialized `BaseParams` for a sealed (non-empty) round.
    pub async fn get_base_params(&self, round_id: RoundId) -> Result<Vec<u8>, SilhouetteError> {
        self.require_leader().await?;
        let artifact = self.committed_artifact(round_id)?;
        Ok(artifact
            .base_params
            .as_ref()
            .expect("committed_artifact only returns rounds with base params")
            .to_bytes())
    }

    /// Returns the committed `key -> row index` mapping for a sealed
    /// (non-empty) round.
    pub async fn get_key_mapping(&self, round_id: RoundId) -> Result<Vec<(String, i32)>, SilhouetteError> {
        self.require_leader().await?;
        let artifact = self.committed_artifact(round_id)?;
        let mut entries: Vec<(String, i32)> = artifact
            .key_to_index
            .iter()
            .map(|(key, index)| (key.clone(), *index))
            .collect();
        entries.sort_by_key(|(_, index)| *index);
        Ok(entries)
    }

    fn require_round_exists(&self, round_id: RoundId) -> Result<(), SilhouetteError> {
        self.rounds
            .read()
            .contains_key(&round_id)
            .then_some(())
            .ok_or_else(|| SilhouetteError::new(ErrorKind::NotFound, format!("round {round_id} was never started")))
    }

    fn committed_artifact(&self, round_id: RoundId) -> Result<Arc<SealedArtifact>, SilhouetteError> {
        self.sealed
            .read()
            .get(&round_id)
            .cloned()
            .filter(|artifact| artifact.base_params.is_some())
            .ok_or_else(|| {
                SilhouetteError::new(
                    ErrorKind::NotFound,
                    format!("round {round_id} has no committed metadata"),
                )
            })
    }

    /// Builds a coordinator over `log` and rebuilds leader-local metadata
    /// for every already-sealed round found in the log's snapshot.
    ///
    /// A KVS-backed round is fully recoverable: the blob enumerates its own
    /// keys, so `key_to_index` and the PIR shard can be rebuilt exactly.
    /// An OKVS-backed round is not: obliviousness means the blob does not
    /// reveal which keys it encodes, so a round sealed under that backend
    /// is left without committed metadata after a restart until a fresh
    /// `StartRound`/`PublishValues` cycle reseals it.
    #[tracing::instrument(level = "info", skip(log))]
    pub async fn recover(log: ReplicatedLogHandle, backend: Backend, commit_timeout: std::time::Duration) -> Self {
        let coordinator = Self::new(log, backend, commit_timeout);
        let snapshot = coordinator.log.snapshot().await;
        for (key, blob) in snapshot {
            if let Some(round_id) = parse_round_key(&key) {
                coordinator.recover_round(round_id, blob);
            }
        }
        coordinator
    }

    fn recover_round(&self, round_id: RoundId, blob: Vec<u8>) {
        let state = if blob.is_empty() {
            self.sealed.write().insert(
                round_id,
                Arc::new(SealedArtifact {
                    key_to_index: HashMap::new(),
                    shard: None,
                    base_params: None,
                }),
            );
            RoundState::EmptySealed
        } else {
            match self.backend {
                Backend::Okvs => {
                    tracing::warn!(
                        %round_id,
                        "cannot recover key mapping for an OKVS-backed round after restart; \
                         round has no committed metadata until resealed"
                    );
                    RoundState::Sealed
                }
                Backend::Kvs => match self.recover_kvs_round(round_id, &blob) {
                    Ok(()) => RoundState::Sealed,
                    Err(err) => {
                        tracing::error!(%round_id, %err, "failed to recover round from persisted encoding");
                        return;
                    }
                },
            }
        };

        self.rounds.write().insert(
            round_id,
            Arc::new(Round {
                expected_workers: 0,
                inner: Mutex::new(RoundInner {
                    state,
                    submissions: HashMap::new(),
                    sealing: false,
                }),
            }),
        );
    }

    fn recover_kvs_round(&self, round_id: RoundId, blob: &[u8]) -> Result<(), SilhouetteError> {
        let mut keys = silhouette_codec::kvs_keys(blob).map_err(kvs_error)?;
        keys.sort();
        let raw_rows: Vec<Vec<u8>> = keys
            .iter()
            .map(|key| silhouette_codec::kvs_decode(blob, key))
            .collect::<Result<_, _>>()
            .map_err(kvs_error)?;

        let max_len = raw_rows.iter().map(Vec::len).max().unwrap_or(0);
        let params = PirParams::select(raw_rows.len(), max_len, pir_seed(round_id));
        let rows: Vec<Vec<u8>> = raw_rows
            .into_iter()
            .map(|mut row| {
                row.resize(params.elem_size_bytes, 0);
                row
            })
            .collect();
        let shard = PirShard::build(params, rows).map_err(pir_error)?;
        let base_params = shard.base_params();

        let key_to_index = keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| (key, index as i32))
            .collect();

        self.sealed.write().insert(
            round_id,
            Arc::new(SealedArtifact {
                key_to_index,
                shard: Some(shard),
                base_params: Some(base_params),
            }),
        );
        Ok(())
    }
}

/// Parses a round id back out of a `round_<id>_results` storage key.
fn parse_round_key(key: &str) -> Option<RoundId> {
    let digits = key.strip_prefix("round_")?.strip_suffix("_results")?;
    digits.parse::<u64>().ok().map(RoundId::new)
}

fn pir_seed(round_id: RoundId) -> [u8; 32] {
    *blake3::hash(format!("silhouette-pir/{round_id}").as_bytes()).as_bytes()
}

fn log_error(err: LogError) -> SilhouetteError {
    match err {
        LogError::NotLeader => SilhouetteError::new(ErrorKind::FailedPrecondition, "not leader"),
        LogError::Timeout => SilhouetteError::new(ErrorKind::Timeout, "replicated commit timed out"),
        LogError::Internal(msg) => SilhouetteError::new(ErrorKind::Internal, msg),
    }
}

fn okvs_error(err: silhouette_codec::OkvsError) -> SilhouetteError {
    use silhouette_codec::OkvsError::{BadValueSize, ConstructionFailed, Malformed, TooFewPairs};
    match err {
        TooFewPairs | BadValueSize => SilhouetteError::new(ErrorKind::InvalidArgument, err.to_string()),
        ConstructionFailed | Malformed => SilhouetteError::new(ErrorKind::Internal, err.to_string()),
    }
}

fn kvs_error(err: silhouette_codec::KvsDecodeError) -> SilhouetteError {
    SilhouetteError::new(ErrorKind::Internal, err.to_string())
}

fn pir_error(err: silhouette_pir::PirError) -> SilhouetteError {
    SilhouetteError::new(ErrorKind::Internal, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use silhouette_store::{LocalLog, ReplicatedLog};

    fn worker(id: &str) -> WorkerId {
        WorkerId::new(id).unwrap()
    }

    const TEST_COMMIT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

    fn coordinator(backend: Backend) -> RoundCoordinator {
        RoundCoordinator::new(Arc::new(LocalLog::new("n1")), backend, TEST_COMMIT_TIMEOUT)
    }

    #[tokio::test]
    async fn two_worker_round_seals_and_answers_queries() {
        let coordinator = coordinator(Backend::Kvs);
        let round_id = RoundId::new(1);
        coordinator.start_round(round_id, 2).await.unwrap();

        coordinator
            .publish_values(
                round_id,
                worker("w1"),
                vec![
                    ("a".to_string(), 1u64.to_le_bytes().to_vec()),
                    ("b".to_string(), 2u64.to_le_bytes().to_vec()),
                ],
            )
            .await
            .unwrap();
        coordinator
            .publish_values(
                round_id,
                worker("w2"),
                vec![("c".to_string(), 3u64.to_le_bytes().to_vec())],
            )
            .await
            .unwrap();

        let mapping = coordinator.get_key_mapping(round_id).await.unwrap();
        assert_eq!(
            mapping,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
            ]
        );

        let base_params_bytes = coordinator.get_base_params(round_id).await.unwrap();
        let base_params = silhouette_pir::BaseParams::from_bytes(&base_params_bytes).unwrap();
        let mut session = silhouette_pir::PirSession::new(base_params);
        let query = session.generate_query(1).unwrap();
        let wire_query = silhouette_pir::wire::encode(&query);
        let wire_response = coordinator.get_value(round_id, &wire_query).await.unwrap();
        let response = silhouette_pir::wire::decode(&wire_response).unwrap();
        let decoded = session.decode_response(&response).unwrap();
        assert_eq!(&decoded[..8], &2u64.to_le_bytes());
    }

    #[tokio::test]
    async fn empty_round_seals_empty_and_rejects_queries() {
        let coordinator = coordinator(Backend::Kvs);
        let round_id = RoundId::new(3);
        coordinator.start_round(round_id, 3).await.unwrap();
        for w in ["w1", "w2", "w3"] {
            coordinator
                .publish_values(round_id, worker(w), Vec::new())
                .await
                .unwrap();
        }

        assert_eq!(
            coordinator.get_base_params(round_id).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            coordinator.get_value(round_id, &[]).await.unwrap_err().kind,
            ErrorKind::FailedPrecondition
        );
    }

    #[tokio::test]
    async fn duplicate_worker_publish_is_last_write_wins() {
        let coordinator = coordinator(Backend::Kvs);
        let round_id = RoundId::new(4);
        coordinator.start_round(round_id, 2).await.unwrap();

        coordinator
            .publish_values(round_id, worker("w1"), vec![("x".to_string(), b"v1".to_vec())])
            .await
            .unwrap();
        coordinator
            .publish_values(round_id, worker("w1"), vec![("x".to_string(), b"v1u".to_vec())])
            .await
            .unwrap();
        coordinator
            .publish_values(round_id, worker("w2"), vec![("y".to_string(), b"v2".to_vec())])
            .await
            .unwrap();

        let mapping: HashMap<String, i32> = coordinator
            .get_key_mapping(round_id)
            .await
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(mapping.len(), 2);
    }

    #[tokio::test]
    async fn cross_worker_collision_is_rejected() {
        let coordinator = coordinator(Backend::Kvs);
        let round_id = RoundId::new(5);
        coordinator.start_round(round_id, 2).await.unwrap();

        coordinator
            .publish_values(round_id, worker("w1"), vec![("dup".to_string(), b"v1".to_vec())])
            .await
            .unwrap();
        let err = coordinator
            .publish_values(round_id, worker("w2"), vec![("dup".to_string(), b"v2".to_vec())])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn non_existent_round_is_not_found() {
        let coordinator = coordinator(Backend::Kvs);
        let err = coordinator
            .get_value(RoundId::new(999), &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn okvs_below_minimum_fails_invalid_argument() {
        let coordinator = coordinator(Backend::Okvs);
        let round_id = RoundId::new(6);
        coordinator.start_round(round_id, 1).await.unwrap();

        let pairs = (0..10)
            .map(|i| (format!("k{i}"), (i as u64).to_le_bytes().to_vec()))
            .collect();
        let err = coordinator
            .publish_values(round_id, worker("w1"), pairs)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn sealed_round_rejects_further_publishes() {
        let coordinator = coordinator(Backend::Kvs);
        let round_id = RoundId::new(7);
        coordinator.start_round(round_id, 1).await.unwrap();
        coordinator
            .publish_values(round_id, worker("w1"), vec![("a".to_string(), vec![1])])
            .await
            .unwrap();

        let err = coordinator
            .publish_values(round_id, worker("w1"), vec![("a".to_string(), vec![2])])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn reopening_a_sealed_round_refuses_to_reseal_and_leaves_the_artifact_untouched() {
        let log = Arc::new(LocalLog::new("n1"));
        let coordinator = RoundCoordinator::new(log.clone(), Backend::Kvs, TEST_COMMIT_TIMEOUT);
        let round_id = RoundId::new(21);

        coordinator.start_round(round_id, 1).await.unwrap();
        coordinator
            .publish_values(round_id, worker("w1"), vec![("a".to_string(), vec![1, 2, 3])])
            .await
            .unwrap();
        let original_blob = log.get(&round_id.storage_key()).await.unwrap();

        coordinator.start_round(round_id, 1).await.unwrap();
        let err = coordinator
            .publish_values(round_id, worker("w1"), vec![("a".to_string(), vec![9, 9, 9])])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);

        let blob_after_reseal_attempt = log.get(&round_id.storage_key()).await.unwrap();
        assert_eq!(original_blob, blob_after_reseal_attempt);
    }

    #[tokio::test]
    async fn reopening_an_empty_sealed_round_also_refuses_to_reseal() {
        let coordinator = coordinator(Backend::Kvs);
        let round_id = RoundId::new(22);

        coordinator.start_round(round_id, 1).await.unwrap();
        coordinator
            .publish_values(round_id, worker("w1"), Vec::new())
            .await
            .unwrap();

        coordinator.start_round(round_id, 1).await.unwrap();
        let err = coordinator
            .publish_values(round_id, worker("w1"), vec![("a".to_string(), vec![1])])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn recover_rebuilds_kvs_rounds_from_a_log_snapshot() {
        let log = Arc::new(LocalLog::new("n1"));
        let sealed_on_old_leader = RoundCoordinator::new(log.clone(), Backend::Kvs, TEST_COMMIT_TIMEOUT);
        let round_id = RoundId::new(10);
        sealed_on_old_leader.start_round(round_id, 1).await.unwrap();
        sealed_on_old_leader
            .publish_values(round_id, worker("w1"), vec![("a".to_string(), vec![9, 9])])
            .await
            .unwrap();

        let recovered = RoundCoordinator::recover(log, Backend::Kvs, TEST_COMMIT_TIMEOUT).await;
        let mapping = recovered.get_key_mapping(round_id).await.unwrap();
        assert_eq!(mapping, vec![("a".to_string(), 0)]);

        let base_params_bytes = recovered.get_base_params(round_id).await.unwrap();
        let base_params = silhouette_pir::BaseParams::from_bytes(&base_params_bytes).unwrap();
        let mut session = silhouette_pir::PirSession::new(base_params);
        let query = session.generate_query(0).unwrap();
        let response = recovered
            .get_value(round_id, &silhouette_pir::wire::encode(&query))
            .await
            .unwrap();
        let decoded = session
            .decode_response(&silhouette_pir::wire::decode(&response).unwrap())
            .unwrap();
        assert_eq!(&decoded[..2], &[9, 9]);
    }

    #[tokio::test]
    async fn recover_restores_empty_sealed_rounds() {
        let log = Arc::new(LocalLog::new("n1"));
        let old_leader = RoundCoordinator::new(log.clone(), Backend::Kvs, TEST_COMMIT_TIMEOUT);
        let round_id = RoundId::new(11);
        old_leader.start_round(round_id, 1).await.unwrap();
        old_leader
            .publish_values(round_id, worker("w1"), Vec::new())
            .await
            .unwrap();

        let recovered = RoundCoordinator::recover(log, Backend::Kvs, TEST_COMMIT_TIMEOUT).await;
        assert_eq!(
            recovered.get_base_params(round_id).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            recovered.get_value(round_id, &[]).await.unwrap_err().kind,
            ErrorKind::FailedPrecondition
        );
    }

    #[tokio::test]
    async fn recover_leaves_okvs_rounds_without_metadata() {
        let log = Arc::new(LocalLog::new("n1"));
        let old_leader = RoundCoordinator::new(log.clone(), Backend::Okvs, TEST_COMMIT_TIMEOUT);
        let round_id = RoundId::new(12);
        old_leader.start_round(round_id, 1).await.unwrap();
        let pairs = (0..120)
            .map(|i| (format!("k{i}"), (i as u64).to_le_bytes().to_vec()))
            .collect();
        old_leader
            .publish_values(round_id, worker("w1"), pairs)
            .await
            .unwrap();

        let recovered = RoundCoordinator::recover(log, Backend::Okvs, TEST_COMMIT_TIMEOUT).await;
        assert_eq!(
            recovered.get_base_params(round_id).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            recovered.get_value(round_id, &[]).await.unwrap_err().kind,
            ErrorKind::FailedPrecondition
        );
    }
}
