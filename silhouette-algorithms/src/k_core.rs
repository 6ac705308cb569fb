//! Many-round Locally-Edge-Differentially-Private k-core decomposition
//! (spec §4.10).
//!
//! Round 0 publishes a noised degree and each worker's local maximum
//! round-threshold; after it seals every worker learns
//! `max_public_round_threshold` and the number of subsequent rounds to run.
//! Each following round is a get-then-set over the previous round's
//! `level-<v>` entries: a vertex either advances one level, is marked
//! permanently stopped, or (once stopped) simply republishes its last
//! level so other workers can keep reading it.

use std::collections::HashMap;

use silhouette_types::RoundId;

use crate::driver::{DriverConfig, RoundDriver};

const LAMBDA: f64 = 0.5;

/// The final estimated core number for one owned vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreEstimate {
    /// The vertex.
    pub vertex: u64,
    /// Its estimated core number.
    pub core_number: f64,
}

fn log_base(n: f64, base: f64) -> f64 {
    n.ln() / base.ln()
}

fn levels_per_group(psi: f64, n: u64) -> f64 {
    log_base(n as f64, 1.0 + psi).ceil() / 4.0
}

fn n_rounds_cap(psi: f64, n: u64) -> u32 {
    (4.0 * log_base(n as f64, 1.0 + psi).powf(1.2)).ceil() as u32
}

fn round_threshold(noised_deg: f64, levels_per_group: f64) -> f64 {
    noised_deg.max(1.0).log2().ceil() * levels_per_group + 1.0
}

/// The deterministic bias term spec §4.10 adds to a noised neighbor count,
/// `⌊3·(2·e^s)/(e^{2s}−1)^3⌋` with `s` the noise sample's scale parameter.
fn deterministic_bias(s: f64) -> f64 {
    let numerator = 3.0 * 2.0 * s.exp();
    let denominator = ((2.0 * s).exp() - 1.0).powi(3);
    (numerator / denominator).floor()
}

fn vertex_key(prefix: &str, vertex: u64) -> String {
    format!("{prefix}-{vertex}")
}

fn decode_f64(bytes: &[u8]) -> f64 {
    f64::from_le_bytes(bytes[..8].try_into().unwrap())
}

fn encode_f64(value: f64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Runs the full LEDP k-core decomposition for this worker's owned
/// vertices and returns their estimated core numbers.
pub async fn run(
    driver: &RoundDriver,
    config: &DriverConfig,
    round0: RoundId,
    expected_workers: i32,
    adjacency: &HashMap<u64, Vec<u64>>,
    participant_worker_ids: &[String],
) -> Result<Vec<CoreEstimate>, silhouette_client::Error> {
    let owned_vertices: Vec<u64> = adjacency.keys().copied().collect();
    let lpg = levels_per_group(config.psi, config.n);

    driver.start_round(round0, expected_workers).await?;

    let degree_scale = config.epsilon * config.factor;
    let mut thresholds = HashMap::new();
    let mut round0_pairs = Vec::new();
    let mut local_max_threshold = 0.0f64;

    for &v in &owned_vertices {
        let true_degree = adjacency[&v].len() as f64;
        let noised_deg = (true_degree + config.noise.sample(degree_scale)).max(0.0);
        let threshold = round_threshold(noised_deg, lpg);
        thresholds.insert(v, threshold);
        local_max_threshold = local_max_threshold.max(threshold);

        round0_pairs.push((vertex_key("degree", v), encode_f64(noised_deg)));
        round0_pairs.push((vertex_key("level", v), encode_f64(0.0)));
    }
    round0_pairs.push((
        format!("max-threshold-{}", config.worker_id),
        encode_f64(local_max_threshold),
    ));

    driver
        .publish_and_wait_for_seal(round0, &config.worker_id, round0_pairs)
        .await?;

    let mut max_public_round_threshold = local_max_threshold;
    for peer in participant_worker_ids {
        let bytes = driver
            .get_value(round0, &format!("max-threshold-{peer}"))
            .await?;
        max_public_round_threshold = max_public_round_threshold.max(decode_f64(&bytes));
    }

    let cap = n_rounds_cap(config.psi, config.n);
    let num_rounds = (cap.saturating_sub(2) as f64).min(max_public_round_threshold).max(0.0) as u32;
    let num_rounds = num_rounds.min(config.num_rounds);

    let mut levels: HashMap<u64, f64> = owned_vertices.iter().map(|&v| (v, 0.0)).collect();
    let mut stopped: HashMap<u64, bool> = owned_vertices.iter().map(|&v| (v, false)).collect();

    for r in 1..=num_rounds {
        let current_round = RoundId::new(round0.into_inner() + r as u64);
        let previous_round = RoundId::new(round0.into_inner() + r as u64 - 1);
        driver.start_round(current_round, expected_workers).await?;

        let mut pairs = Vec::with_capacity(owned_vertices.len());
        for &v in &owned_vertices {
            let threshold = thresholds[&v];
            let new_level = if stopped[&v] {
                levels[&v]
            } else {
                let prev_level = decode_f64(&driver.get_value(previous_round, &vertex_key("level", v)).await?);
                if prev_level >= threshold {
                    stopped.insert(v, true);
                    prev_level
                } else {
                    let mut same_level_neighbors = 0u64;
                    for &neighbor in &adjacency[&v] {
                        let neighbor_level =
                            decode_f64(&driver.get_value(previous_round, &vertex_key("level", neighbor)).await?);
                        if neighbor_level == prev_level {
                            same_level_neighbors += 1;
                        }
                    }

                    let noise_scale = config.epsilon * (1.0 - config.factor) / (2.0 * threshold);
                    let bias = config.bias_factor * deterministic_bias(noise_scale) + config.bias;
                    let noisy_count = same_level_neighbors as f64 + config.noise.sample(noise_scale) + bias;
                    let group_threshold = (1.0 + config.psi).powf((prev_level / lpg).floor());

                    if noisy_count > group_threshold {
                        prev_level + 1.0
                    } else {
                        stopped.insert(v, true);
                        prev_level
                    }
                }
            };
            levels.insert(v, new_level);
            pairs.push((vertex_key("level", v), encode_f64(new_level)));
        }

        driver
            .publish_and_wait_for_seal(current_round, &config.worker_id, pairs)
            .await?;
    }

    Ok(owned_vertices
        .iter()
        .map(|&v| {
            let final_level = levels[&v];
            let group = ((final_level + 1.0) / lpg).floor() - 1.0;
            let core_number = (2.0 + LAMBDA) * (1.0 + config.psi).powf(group.max(0.0));
            CoreEstimate {
                vertex: v,
                core_number,
            }
        })
        .collect())
}
