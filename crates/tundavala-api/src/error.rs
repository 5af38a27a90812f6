use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use tundavala_db::StoreError;

/// Error taxonomy surfaced to clients: absent records, rejected input,
/// missing/insufficient credentials, state conflicts, and everything else as
/// an opaque 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

/// Store-level domain failures become client errors; anything else stays an
/// internal error and is logged rather than leaked.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::NotFound) => Self::NotFound("record not found"),
            Some(StoreError::NotParticipant) => Self::Forbidden,
            Some(StoreError::InvalidTransition) => {
                Self::Conflict("invalid status transition".to_string())
            }
            Some(StoreError::InsufficientBalance) => {
                Self::Validation("insufficient balance".to_string())
            }
            None => Self::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Internal(err) => {
                error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_client_statuses() {
        let cases = [
            (StoreError::NotFound, StatusCode::NOT_FOUND),
            (StoreError::NotParticipant, StatusCode::FORBIDDEN),
            (StoreError::InvalidTransition, StatusCode::CONFLICT),
            (StoreError::InsufficientBalance, StatusCode::BAD_REQUEST),
        ];
        for (store_err, expected) in cases {
            let api_err = ApiError::from(anyhow::Error::new(store_err));
            assert_eq!(api_err.into_response().status(), expected);
        }
    }

    #[test]
    fn unknown_errors_stay_internal() {
        let api_err = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(
            api_err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
