//! Version 1 coordination RPC surface.
//!
//! Every operation is a single self-contained JSON request/response — unlike
//! a websocket session, there is no multi-message handshake here, so each
//! handler just validates, calls the [`RoundCoordinator`], and maps the
//! result.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use silhouette_types::{
    WorkerId,
    api::v1::{
        GetBaseParamsRequest, GetBaseParamsResponse, GetKeyMappingRequest, GetKeyMappingResponse,
        GetValueRequest, GetValueResponse, KeyMappingEntry, PublishValuesRequest,
        PublishValuesResponse, StartRoundRequest, StartRoundResponse,
    },
};
use tracing::instrument;

use crate::{api::errors::ApiError, services::RoundCoordinator};

#[instrument(level = "debug", skip(coordinator))]
async fn start_round(
    State(coordinator): State<Arc<RoundCoordinator>>,
    Json(req): Json<StartRoundRequest>,
) -> Result<Json<StartRoundResponse>, ApiError> {
    coordinator
        .start_round(req.round_id, req.expected_workers)
        .await?;
    Ok(Json(StartRoundResponse { success: true }))
}

#[instrument(level = "debug", skip(coordinator, req), fields(round_id = %req.round_id))]
async fn publish_values(
    State(coordinator): State<Arc<RoundCoordinator>>,
    Json(req): Json<PublishValuesRequest>,
) -> Result<Json<PublishValuesResponse>, ApiError> {
    let worker_id = WorkerId::new(req.worker_id)
        .map_err(|kind| silhouette_types::SilhouetteError::new(kind, "worker id must not be empty"))?;
    let pairs = req.pairs.into_iter().map(|kv| (kv.key, kv.value)).collect();

    coordinator
        .publish_values(req.round_id, worker_id, pairs)
        .await?;
    Ok(Json(PublishValuesResponse { success: true }))
}

#[instrument(level = "debug", skip(coordinator, req), fields(round_id = %req.round_id))]
async fn get_value(
    State(coordinator): State<Arc<RoundCoordinator>>,
    Json(req): Json<GetValueRequest>,
) -> Result<Json<GetValueResponse>, ApiError> {
    let pir_response = coordinator.get_value(req.round_id, &req.pir_query).await?;
    Ok(Json(GetValueResponse { pir_response }))
}

#[instrument(level = "debug", skip(coordinator, req), fields(round_id = %req.round_id))]
async fn get_base_params(
    State(coordinator): State<Arc<RoundCoordinator>>,
    Json(req): Json<GetBaseParamsRequest>,
) -> Result<Json<GetBaseParamsResponse>, ApiError> {
    let base_params = coordinator.get_base_params(req.round_id).await?;
    Ok(Json(GetBaseParamsResponse { base_params }))
}

#[instrument(level = "debug", skip(coordinator, req), fields(round_id = %req.round_id))]
async fn get_key_mapping(
    State(coordinator): State<Arc<RoundCoordinator>>,
    Json(req): Json<GetKeyMappingRequest>,
) -> Result<Json<GetKeyMappingResponse>, ApiError> {
    let entries = coordinator
        .get_key_mapping(req.round_id)
        .await?
        .into_iter()
        .map(|(key, index)| KeyMappingEntry { key, index })
        .collect();
    Ok(Json(GetKeyMappingResponse { entries }))
}

/// Builds the `/api/v1/*` router for a coordinator instance.
pub(crate) fn routes() -> Router<Arc<RoundCoordinator>> {
    Router::new()
        .route("/start_round", post(start_round))
        .route("/publish_values", post(publish_values))
        .route("/get_value", post(get_value))
        .route("/get_base_params", post(get_base_params))
        .route("/get_key_mapping", post(get_key_mapping))
}
