//! Error types for the HTTP control routes.
//!
//! [`ApiError`] converts domain errors into the JSON envelope the
//! protocol promises: `{"status": "Error", "message": ...}` with a
//! 4xx status code.

use arenaviz_core::controller::ControllerError;
use arenaviz_core::engine::EngineError;
use arenaviz_types::CommandResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors surfaced by the HTTP control routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested transition is not valid right now.
    #[error("{0}")]
    InvalidTransition(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A request parameter failed validation.
    #[error("{0}")]
    BadRequest(String),
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::InvalidTransition { .. } => Self::InvalidTransition(format!("{err}")),
            ControllerError::Engine(EngineError::EntityNotFound { .. }) => {
                Self::NotFound(format!("{err}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = CommandResponse::error(format!("{self}"));
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arenaviz_types::ExperimentState;

    #[test]
    fn invalid_transition_maps_to_conflict() {
        let err: ApiError = ControllerError::InvalidTransition {
            state: ExperimentState::Paused,
        }
        .into();
        assert!(format!("{err}").contains("EXPERIMENT_PAUSED"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn entity_not_found_maps_to_404() {
        let err: ApiError = ControllerError::Engine(EngineError::EntityNotFound {
            id: String::from("ghost"),
        })
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let response = ApiError::BadRequest(String::from("steps out of range")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
