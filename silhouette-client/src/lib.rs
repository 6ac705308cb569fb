#![deny(missing_docs)]
//! Driver client library for silhouette-db (C8).
//!
//! [`DriverClient`] is the entry point an algorithm driver uses to publish
//! into and read from a coordinator: `start_round`/`publish_values` for
//! writing, and `get_value` for the oblivious read path, which lazily
//! fetches and caches each round's [`silhouette_pir::BaseParams`] and
//! key→index mapping the first time one of its keys is read (see
//! [`sessions::RoundSessions`]), then builds a fresh single-use
//! [`silhouette_pir::PirSession`] per call.
//!
//! Every RPC is a single JSON request/response over `reqwest`, matching the
//! coordinator's plain `/api/v1/*` surface rather than a persistent
//! connection.

mod sessions;

use serde::Serialize;
use serde::de::DeserializeOwned;
use silhouette_pir::PirSession;
use silhouette_types::RoundId;
use silhouette_types::api::v1::{
    GetBaseParamsRequest, GetBaseParamsResponse, GetKeyMappingRequest, GetKeyMappingResponse,
    GetValueRequest, GetValueResponse, KeyValuePair, PublishValuesRequest, PublishValuesResponse,
    StartRoundRequest, StartRoundResponse,
};
use silhouette_types::{ErrorKind, SilhouetteError};
use tracing::instrument;

pub use sessions::{RoundMaterials, RoundSessions};

/// Errors returned while driving an RPC or a PIR session against a
/// coordinator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The coordinator's HTTP endpoint could not be reached, or the
    /// transport itself failed.
    #[error("request to coordinator failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The coordinator responded with an RPC-level error.
    #[error(transparent)]
    Coordinator(#[from] SilhouetteError),
    /// The client-side PIR session rejected the call.
    #[error(transparent)]
    Pir(#[from] silhouette_pir::PirError),
    /// The requested key was never published into the queried round.
    #[error("key `{0}` was not published into this round")]
    UnknownKey(String),
}

/// A connection to one coordinator node, caching per-round PIR session
/// material as rounds are read.
pub struct DriverClient {
    http: reqwest::Client,
    base_url: String,
    sessions: RoundSessions,
}

impl DriverClient {
    /// Builds a client targeting the coordinator at `base_url` (e.g.
    /// `http://127.0.0.1:8080`), with no host path suffix.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            sessions: RoundSessions::new(),
        }
    }

    /// Opens `round_id`, idempotently. Any worker may call this.
    #[instrument(level = "debug", skip(self))]
    pub async fn start_round(&self, round_id: RoundId, expected_workers: i32) -> Result<(), Error> {
        let _: StartRoundResponse = self
            .call(
                "start_round",
                &StartRoundRequest {
                    round_id,
                    expected_workers,
                },
            )
            .await?;
        Ok(())
    }

    /// Publishes `worker_id`'s contribution of `pairs` for `round_id`.
    #[instrument(level = "debug", skip(self, pairs), fields(round_id = %round_id))]
    pub async fn publish_values(
        &self,
        round_id: RoundId,
        worker_id: impl Into<String>,
        pairs: Vec<(String, Vec<u8>)>,
    ) -> Result<(), Error> {
        let pairs = pairs
            .into_iter()
            .map(|(key, value)| KeyValuePair { key, value })
            .collect();
        let _: PublishValuesResponse = self
            .call(
                "publish_values",
                &PublishValuesRequest {
                    round_id,
                    worker_id: worker_id.into(),
                    pairs,
                },
            )
            .await?;
        Ok(())
    }

    /// Attempts to establish this round's PIR session materials, retrying
    /// on [`ErrorKind::FailedPrecondition`]/[`ErrorKind::NotFound`] (the
    /// round is not sealed yet) up to `max_retries` times, sleeping
    /// `poll_interval` between attempts.
    ///
    /// Per spec §4.9 step 4: the first successful install is the signal
    /// that the round sealed. An `Empty-Sealed` round (no committed PIR
    /// metadata) also satisfies this — the caller simply has no keys to
    /// read.
    #[instrument(level = "debug", skip(self))]
    pub async fn poll_for_seal(
        &self,
        round_id: RoundId,
        poll_interval: std::time::Duration,
        max_retries: u32,
    ) -> Result<(), Error> {
        for attempt in 0..max_retries {
            match self.fetch_round_materials(round_id).await {
                Ok(materials) => {
                    self.sessions
                        .get_or_install(round_id, || async { Ok::<_, Error>(materials) })
                        .await?;
                    return Ok(());
                }
                Err(Error::Coordinator(err))
                    if matches!(err.kind, ErrorKind::FailedPrecondition | ErrorKind::NotFound) =>
                {
                    tracing::debug!(round_id = %round_id, attempt, "round not sealed yet");
                    tokio::time::sleep(poll_interval).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(Error::Coordinator(SilhouetteError::new(
            ErrorKind::Timeout,
            format!("round {round_id} did not seal within {max_retries} polls"),
        )))
    }

    /// Privately reads `key`'s value out of `round_id`.
    ///
    /// Fetches and installs the round's PIR session materials on first use
    /// (double-checked, see [`RoundSessions::get_or_install`]), then builds
    /// a fresh single-use [`PirSession`] for this call.
    #[instrument(level = "debug", skip(self), fields(round_id = %round_id))]
    pub async fn get_value(&self, round_id: RoundId, key: &str) -> Result<Vec<u8>, Error> {
        let materials = self
            .sessions
            .get_or_install(round_id, || self.fetch_round_materials(round_id))
            .await?;

        let index = materials
            .index_of(key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?;

        let mut session = PirSession::new(materials.base_params.clone());
        let query = session.generate_query(index as usize)?;

        let response: GetValueResponse = self
            .call(
                "get_value",
                &GetValueRequest {
                    round_id,
                    pir_query: silhouette_pir::wire::encode(&query),
                },
            )
            .await?;

        let decoded_response = silhouette_pir::wire::decode(&response.pir_response)
            .map_err(|_| SilhouetteError::new(ErrorKind::Internal, "malformed pir response"))?;
        Ok(session.decode_response(&decoded_response)?)
    }

    /// Discards any cached PIR session materials for `round_id`, forcing
    /// the next [`Self::get_value`] call for it to re-fetch.
    pub async fn forget_round(&self, round_id: RoundId) {
        self.sessions.invalidate(round_id).await;
    }

    async fn fetch_round_materials(&self, round_id: RoundId) -> Result<RoundMaterials, Error> {
        let base_params: GetBaseParamsResponse =
            self.call("get_base_params", &GetBaseParamsRequest { round_id }).await?;
        let mapping: GetKeyMappingResponse =
            self.call("get_key_mapping", &GetKeyMappingRequest { round_id }).await?;

        let base_params = silhouette_pir::BaseParams::from_bytes(&base_params.base_params)
            .map_err(|_| SilhouetteError::new(ErrorKind::Internal, "malformed base params"))?;
        let key_to_index = mapping
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.index))
            .collect();

        Ok(RoundMaterials::new(base_params, key_to_index))
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        op: &str,
        req: &Req,
    ) -> Result<Resp, Error> {
        let response = self
            .http
            .post(format!("{}/api/v1/{op}", self.base_url))
            .json(req)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<Resp>().await?)
        } else {
            let err: SilhouetteError = response.json().await?;
            Err(Error::Coordinator(err))
        }
    }
}
