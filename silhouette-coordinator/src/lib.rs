#![deny(missing_docs)]
//! Core functionality of a silhouette-db coordinator node.
//!
//! Concrete deployments use this library to assemble a coordinator: plug a
//! [`silhouette_store::ReplicatedLog`] implementation (a real multi-node one
//! in production, [`silhouette_store::LocalLog`] for a standalone or test
//! node) into a [`CoordinatorBuilder`], which recovers any already-sealed
//! rounds from the log and returns an `axum::Router` serving the
//! `/api/v1/*` coordination RPC surface.
//!
//! The round lifecycle itself — `StartRound`, `PublishValues`, and the
//! sealing pipeline — lives in [`services::RoundCoordinator`]; this crate's
//! `lib.rs` is only the wiring between that service, the configuration, and
//! the HTTP surface.

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub(crate) mod api;
pub mod config;
pub mod metrics;
pub mod services;

pub use config::CoordinatorConfig;
pub use services::RoundCoordinator;

/// Assembles a coordinator node's `axum::Router`.
///
/// `init` recovers the `RoundCoordinator` from the replicated log (any
/// already-sealed round found there gets its PIR shard rebuilt up front),
/// then `build` wraps it behind the `/api/v1` RPC surface.
pub struct CoordinatorBuilder {
    coordinator: Arc<RoundCoordinator>,
}

impl CoordinatorBuilder {
    /// Recovers a [`RoundCoordinator`] from `log` using `config`'s backend
    /// and wraps it ready to serve.
    pub async fn init(config: &CoordinatorConfig, log: silhouette_store::ReplicatedLogHandle) -> Self {
        metrics::describe_metrics();
        tracing::info!(node_id = %config.node_id, backend = %config.backend, "recovering coordinator state from replicated log");
        let coordinator = RoundCoordinator::recover(log, config.backend, config.commit_timeout).await;
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    /// Builds the `axum` [`Router`] serving the `/api/v1/*` coordination
    /// RPC surface.
    pub fn build(self) -> Router {
        Router::new()
            .nest("/api/v1", api::v1::routes().with_state(self.coordinator))
            .layer(TraceLayer::new_for_http())
    }
}
