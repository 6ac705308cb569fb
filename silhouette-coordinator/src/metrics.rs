//! Metrics definitions for the round coordinator.
//!
//! This module defines all metrics keys used by the service and
//! provides a helper [`describe_metrics`] to set metadata for
//! each metric using the `metrics` crate.

/// Metrics key for started rounds.
pub const METRICS_ID_ROUNDS_STARTED: &str = "silhouette.coordinator.rounds.started";
/// Metrics key for the number of rounds currently `Open`.
pub const METRICS_ID_ROUNDS_OPEN: &str = "silhouette.coordinator.rounds.open";
/// Metrics key for rounds that sealed with a non-empty artifact.
pub const METRICS_ID_ROUNDS_SEALED: &str = "silhouette.coordinator.rounds.sealed";
/// Metrics key for rounds that sealed with an empty artifact.
pub const METRICS_ID_ROUNDS_EMPTY_SEALED: &str = "silhouette.coordinator.rounds.empty_sealed";
/// Metrics key for accepted `PublishValues` calls.
pub const METRICS_ID_PUBLISHES: &str = "silhouette.coordinator.publishes";
/// Metrics key for the duration of the sealing pipeline.
pub const METRICS_ID_SEAL_DURATION: &str = "silhouette.coordinator.seal.duration";
/// Metrics key for answered `GetValue` queries.
pub const METRICS_ID_QUERIES: &str = "silhouette.coordinator.queries";
/// Metrics key for the duration of `ProcessQuery`.
pub const METRICS_ID_QUERY_DURATION: &str = "silhouette.coordinator.query.duration";
/// Metrics key for sealing attempts aborted by a replication failure.
pub const METRICS_ID_SEAL_ABORTED: &str = "silhouette.coordinator.seal.aborted";

/// Describe all metrics used by the service.
///
/// This calls the `describe_*` functions from the `metrics` crate to set
/// metadata on the different metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_ROUNDS_STARTED,
        metrics::Unit::Count,
        "Number of StartRound calls accepted"
    );

    metrics::describe_gauge!(
        METRICS_ID_ROUNDS_OPEN,
        metrics::Unit::Count,
        "Number of rounds currently in the Open state"
    );

    metrics::describe_counter!(
        METRICS_ID_ROUNDS_SEALED,
        metrics::Unit::Count,
        "Number of rounds that sealed with a non-empty artifact"
    );

    metrics::describe_counter!(
        METRICS_ID_ROUNDS_EMPTY_SEALED,
        metrics::Unit::Count,
        "Number of rounds that sealed with an empty artifact"
    );

    metrics::describe_counter!(
        METRICS_ID_PUBLISHES,
        metrics::Unit::Count,
        "Number of accepted PublishValues calls"
    );

    metrics::describe_histogram!(
        METRICS_ID_SEAL_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of the sealing pipeline, from aggregation to committed Set"
    );

    metrics::describe_counter!(
        METRICS_ID_QUERIES,
        metrics::Unit::Count,
        "Number of answered GetValue queries"
    );

    metrics::describe_histogram!(
        METRICS_ID_QUERY_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of ProcessQuery against a round's PIR shard"
    );

    metrics::describe_counter!(
        METRICS_ID_SEAL_ABORTED,
        metrics::Unit::Count,
        "Number of sealing attempts aborted by a replicated Set failure"
    )
}
