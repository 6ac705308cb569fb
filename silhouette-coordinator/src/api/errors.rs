//! Maps a [`SilhouetteError`] onto an HTTP response.
//!
//! Each RPC handler returns `Result<Json<_>, ApiError>`; this module is the
//! single place that decides the status code for each [`ErrorKind`] and
//! serializes the error body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use silhouette_types::{ErrorKind, SilhouetteError};
use tracing::instrument;

/// Newtype wrapper so [`IntoResponse`] can be implemented for a foreign
/// error type without an orphan-rule violation.
#[derive(Debug)]
pub(crate) struct ApiError(pub SilhouetteError);

impl From<SilhouetteError> for ApiError {
    fn from(value: SilhouetteError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    #[instrument(level = "debug", skip_all, fields(kind = ?self.0.kind))]
    fn into_response(self) -> Response {
        tracing::debug!("{}", self.0);
        let status = match self.0.kind {
            ErrorKind::NotLeader | ErrorKind::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            ErrorKind::NotFound | ErrorKind::UnknownKey => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0)).into_response()
    }
}
