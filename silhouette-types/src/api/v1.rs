//! # v1 API types
//!
//! Data transfer objects for the version 1 coordination RPC surface:
//! `StartRound`, `PublishValues`, `GetValue`, `GetBaseParams`, and
//! `GetKeyMapping`. Types here wrap the opaque PIR query/response and
//! sealed-round metadata with Serde (de)serialization so they can be sent
//! as JSON request/response bodies.

use serde::{Deserialize, Serialize};

use crate::RoundId;

/// Request body for `POST /api/v1/start_round`.
///
/// Idempotent: any worker may call this, the leader collapses duplicate
/// calls for the same `round_id` into a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRoundRequest {
    /// The round to open.
    pub round_id: RoundId,
    /// The number of workers expected to call `PublishValues` before the
    /// round is eligible for sealing.
    pub expected_workers: i32,
}

/// Response body for `POST /api/v1/start_round`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRoundResponse {
    /// `true` if the round is open (whether newly created or already
    /// existing from a prior idempotent call).
    pub success: bool,
}

/// A single published key/value pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// The key, unique within the owning worker's contribution.
    pub key: String,
    /// The raw value bytes; exact byte-for-byte round trip is required
    /// under the KVS backend.
    #[serde(with = "serde_bytes_base64")]
    pub value: Vec<u8>,
}

/// Request body for `POST /api/v1/publish_values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishValuesRequest {
    /// The round this publication belongs to.
    pub round_id: RoundId,
    /// The publishing worker's identifier.
    pub worker_id: String,
    /// The key/value pairs this worker contributes. A later call from the
    /// same worker for the same round overwrites its own prior pairs
    /// (last-write-wins within one worker), but a different worker
    /// publishing an already-seen key is rejected with `AlreadyExists`.
    pub pairs: Vec<KeyValuePair>,
}

/// Response body for `POST /api/v1/publish_values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishValuesResponse {
    /// `true` once the publication has been recorded.
    pub success: bool,
}

/// Request body for `POST /api/v1/get_value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetValueRequest {
    /// The sealed round to query.
    pub round_id: RoundId,
    /// An opaque PIR query produced by the client session.
    #[serde(with = "serde_bytes_base64")]
    pub pir_query: Vec<u8>,
}

/// Response body for `POST /api/v1/get_value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetValueResponse {
    /// An opaque PIR response; only the client session that produced the
    /// matching query can meaningfully decode it.
    #[serde(with = "serde_bytes_base64")]
    pub pir_response: Vec<u8>,
}

/// Request body for `POST /api/v1/get_base_params`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBaseParamsRequest {
    /// The sealed round whose PIR parameters are requested.
    pub round_id: RoundId,
}

/// Response body for `POST /api/v1/get_base_params`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBaseParamsResponse {
    /// Opaque, serialized PIR base parameters for the round's shard.
    #[serde(with = "serde_bytes_base64")]
    pub base_params: Vec<u8>,
}

/// Request body for `POST /api/v1/get_key_mapping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetKeyMappingRequest {
    /// The sealed round whose key-to-row mapping is requested.
    pub round_id: RoundId,
}

/// A single key's position within the sealed round's row-indexed database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMappingEntry {
    /// The published key.
    pub key: String,
    /// The row index a client must address to privately read this key's
    /// value.
    pub index: i32,
}

/// Response body for `POST /api/v1/get_key_mapping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetKeyMappingResponse {
    /// All keys published into the round, in the coordinator's committed
    /// ordering.
    pub entries: Vec<KeyMappingEntry>,
}

/// Base64 (de)serialization for opaque byte payloads, keeping wire bodies
/// JSON rather than binary framing.
mod serde_bytes_base64 {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
