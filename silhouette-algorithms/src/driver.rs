//! Algorithm driver contract (C9): the round loop primitives a graph
//! algorithm expresses itself over, plus deterministic worker assignment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use silhouette_client::DriverClient;
use silhouette_types::RoundId;

/// Assigns a vertex to a worker.
///
/// `override_map` takes precedence; otherwise `worker-<vertex_id mod
/// num_workers>`.
pub fn vertex_to_worker(
    vertex_id: u64,
    num_workers: u32,
    override_map: Option<&HashMap<u64, String>>,
) -> String {
    if let Some(worker_id) = override_map.and_then(|map| map.get(&vertex_id)) {
        return worker_id.clone();
    }
    format!("worker-{}", vertex_id % num_workers as u64)
}

/// Enumerated configuration for a round-based algorithm driver, replacing
/// the source's loosely-typed string-keyed parameter map (Design Note 9.1).
#[derive(Clone)]
pub struct DriverConfig {
    /// This process's own worker identifier.
    pub worker_id: String,
    /// Total number of workers participating in the computation.
    pub num_workers: u32,
    /// Total number of vertices in the graph.
    pub n: u64,
    /// The privacy amplification parameter ψ used by LEDP k-core's
    /// round-threshold geometric schedule.
    pub psi: f64,
    /// The total privacy budget ε allotted to the computation.
    pub epsilon: f64,
    /// Fraction of `epsilon` spent on the degree-publication round.
    pub factor: f64,
    /// Flat offset added to the per-round deterministic bias term before it
    /// is added to a noised count (spec §4.10); `0.0` for the formula alone.
    pub bias: f64,
    /// Multiplier scaling the computed deterministic bias term before
    /// `bias` is added; `1.0` to use the formula unscaled.
    pub bias_factor: f64,
    /// The noise source driving differentially-private counts. Only its
    /// interface matters (spec §1); this crate never assumes a concrete
    /// distribution beyond what [`NoiseSampler`] promises.
    pub noise: Arc<dyn NoiseSampler>,
    /// Path results are written to.
    pub result_file: std::path::PathBuf,
    /// Upper bound on the number of algorithm rounds, independent of any
    /// data-dependent cap the algorithm computes for itself.
    pub num_rounds: u32,
    /// Optional explicit vertex→worker overrides, consulted before the
    /// default modulo assignment.
    pub vertex_assignment: Option<HashMap<u64, String>>,
}

impl DriverConfig {
    /// Resolves `vertex_id`'s owning worker under this config's assignment.
    pub fn worker_of(&self, vertex_id: u64) -> String {
        vertex_to_worker(vertex_id, self.num_workers, self.vertex_assignment.as_ref())
    }

    /// `true` if `vertex_id` is owned by this process's own worker.
    pub fn owns(&self, vertex_id: u64) -> bool {
        self.worker_of(vertex_id) == self.worker_id
    }
}

/// A source of differentially-private noise. Only the interface matters —
/// concrete samplers are swappable per spec §1's framing of noise as an
/// external collaborator.
pub trait NoiseSampler: Send + Sync {
    /// Draws a single noise sample at the given `scale`.
    fn sample(&self, scale: f64) -> f64;
}

/// Always returns zero. Useful for exercising an algorithm's control flow
/// without the variance a real sampler would introduce.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroNoise;

impl NoiseSampler for ZeroNoise {
    fn sample(&self, _scale: f64) -> f64 {
        0.0
    }
}

/// Drives a round-based algorithm's `StartRound` → publish → poll-for-seal
/// → read loop against one coordinator (spec §4.9).
pub struct RoundDriver {
    client: Arc<DriverClient>,
    /// Sleep interval between seal-poll retries.
    pub poll_interval: Duration,
    /// Bounded retry count per seal-poll barrier.
    pub max_retries: u32,
}

impl RoundDriver {
    /// Wraps a [`DriverClient`] with seal-polling defaults (50ms / 100
    /// retries, matching spec §5's recommendation).
    pub fn new(client: Arc<DriverClient>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(50),
            max_retries: 100,
        }
    }

    /// Opens `round_id`, idempotently.
    pub async fn start_round(&self, round_id: RoundId, expected_workers: i32) -> Result<(), silhouette_client::Error> {
        self.client.start_round(round_id, expected_workers).await
    }

    /// Publishes this worker's contribution and blocks until the round
    /// seals (spec §4.9 steps 3-4).
    pub async fn publish_and_wait_for_seal(
        &self,
        round_id: RoundId,
        worker_id: &str,
        pairs: Vec<(String, Vec<u8>)>,
    ) -> Result<(), silhouette_client::Error> {
        self.client.publish_values(round_id, worker_id, pairs).await?;
        self.client
            .poll_for_seal(round_id, self.poll_interval, self.max_retries)
            .await
    }

    /// Privately reads `key` out of `round_id`.
    pub async fn get_value(&self, round_id: RoundId, key: &str) -> Result<Vec<u8>, silhouette_client::Error> {
        self.client.get_value(round_id, key).await
    }
}
