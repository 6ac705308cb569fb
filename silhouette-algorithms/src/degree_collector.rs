//! Exact two-round degree collector (spec §4.10, scenario E6).
//!
//! Round 1: each worker publishes `vertex-<v>` → 8-byte LE degree for every
//! vertex it owns. Round 2: each worker privately reads the degree of
//! every neighbor of every vertex it owns, writes `vertex neighbor
//! neighbor_degree` lines to its result file, and publishes an empty map
//! purely for round-barrier synchronization.

use std::collections::HashMap;
use std::io::Write as _;

use silhouette_types::RoundId;

use crate::driver::{DriverConfig, RoundDriver};

/// One `(vertex, neighbor, neighbor_degree)` result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegreeResult {
    /// The vertex whose neighbor's degree was looked up.
    pub vertex: u64,
    /// The neighbor.
    pub neighbor: u64,
    /// The neighbor's degree, as read from round 1.
    pub neighbor_degree: u64,
}

/// Runs both rounds of the degree collector for this worker's slice of the
/// graph and returns the results that were also written to
/// `config.result_file`.
pub async fn run(
    driver: &RoundDriver,
    config: &DriverConfig,
    round1: RoundId,
    round2: RoundId,
    expected_workers: i32,
    adjacency: &HashMap<u64, Vec<u64>>,
) -> Result<Vec<DegreeResult>, silhouette_client::Error> {
    driver.start_round(round1, expected_workers).await?;

    let degree_pairs: Vec<(String, Vec<u8>)> = adjacency
        .iter()
        .map(|(vertex, neighbors)| (vertex_key(*vertex), (neighbors.len() as u64).to_le_bytes().to_vec()))
        .collect();
    driver
        .publish_and_wait_for_seal(round1, &config.worker_id, degree_pairs)
        .await?;

    driver.start_round(round2, expected_workers).await?;

    let mut results = Vec::new();
    for (&vertex, neighbors) in adjacency {
        for &neighbor in neighbors {
            let degree_bytes = driver.get_value(round1, &vertex_key(neighbor)).await?;
            let neighbor_degree = u64::from_le_bytes(degree_bytes[..8].try_into().unwrap());
            results.push(DegreeResult {
                vertex,
                neighbor,
                neighbor_degree,
            });
        }
    }

    write_results(&config.result_file, &results)
        .map_err(|err| silhouette_client::Error::UnknownKey(format!("could not write result file: {err}")))?;

    driver
        .publish_and_wait_for_seal(round2, &config.worker_id, Vec::new())
        .await?;

    Ok(results)
}

fn vertex_key(vertex: u64) -> String {
    format!("vertex-{vertex}")
}

fn write_results(path: &std::path::Path, results: &[DegreeResult]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for result in results {
        writeln!(file, "{} {} {}", result.vertex, result.neighbor, result.neighbor_degree)?;
    }
    Ok(())
}
