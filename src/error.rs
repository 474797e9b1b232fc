use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("datastore unavailable: {0}")]
    Connection(sqlx::Error),

    #[error("query failed: {0}")]
    Query(sqlx::Error),

    #[error("invalid geometry in result row: {0}")]
    Geometry(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid tile coordinate {z}/{x}/{y}")]
    InvalidTileCoordinate { z: u8, x: u32, y: u32 },
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Error::Connection(err),
            _ => Error::Query(err),
        }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Configuration(_) | Error::Query(_) | Error::Geometry(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTileCoordinate { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = %status, "{}", self);
        } else {
            warn!(status = %status, "{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
