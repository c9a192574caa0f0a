pub mod config;
pub mod models;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Error type returned by request handlers, mapped onto a JSON
/// `{message}` body with the matching status code.
pub enum AppError {
    /// Bad inbound request or an upstream rejection. Surfaced verbatim.
    BadRequest(String),
    /// Cache or configuration failure the caller cannot correct.
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => {
                tracing::warn!("{message}");
                (StatusCode::BAD_REQUEST, Json(ErrorBody { message })).into_response()
            }
            Self::Internal(err) => {
                tracing::error!("{err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody { message: format!("{err:#}") }),
                )
                    .into_response()
            }
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self { Self::Internal(err.into()) }
}
