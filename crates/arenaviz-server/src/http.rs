//! HTTP control routes.
//!
//! Each route mirrors one controller operation synchronously and answers
//! a [`CommandResponse`] envelope. Silent-tolerant operations (play,
//! fast-forward, terminate) answer `Ok` even when the controller logged
//! a wrong-state warning; the hard-failing ones (pause, unknown entity)
//! surface an [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text server banner |
//! | `GET` | `/start` | Start or resume playing |
//! | `GET` | `/pause` | Pause a running experiment |
//! | `GET` | `/step` | Advance exactly one step |
//! | `GET` | `/reset` | Reset to the initial state |
//! | `GET` | `/fastforward` | Enter fast-forward mode (`?steps=`) |

use std::sync::Arc;

use arenaviz_types::CommandResponse;
use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /fastforward`.
#[derive(Debug, serde::Deserialize)]
pub struct FastForwardParams {
    /// Steps to execute per broadcast; range [1,1000].
    pub steps: Option<u16>,
}

/// Serve the plain-text server banner.
pub async fn index() -> impl IntoResponse {
    format!(
        "Reached Arenaviz server\n\nArenaviz version: {}\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Start or resume playing.
pub async fn start(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.controller.play();
    Json(CommandResponse::ok("Experiment playing"))
}

/// Pause a running experiment.
///
/// # Errors
///
/// Answers `409 Conflict` with the current state string when the
/// experiment is not running.
pub async fn pause(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.controller.pause()?;
    Ok(Json(CommandResponse::ok("Experiment paused")))
}

/// Advance exactly one engine step.
pub async fn step(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.controller.step();
    Json(CommandResponse::ok("Experiment step done"))
}

/// Reset the experiment.
pub async fn reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.controller.reset();
    Json(CommandResponse::ok("Experiment reset"))
}

/// Enter fast-forward mode.
///
/// # Errors
///
/// Answers `400 Bad Request` when `steps` is outside [1,1000]. (The
/// websocket path silently keeps the current setting instead; HTTP has a
/// back-channel, so it uses it.)
pub async fn fastforward(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FastForwardParams>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(steps) = params.steps {
        if !(1..=1000).contains(&steps) {
            return Err(ApiError::BadRequest(String::from(
                "steps is out of range [1,1000]",
            )));
        }
    }
    state.controller.fast_forward(params.steps);
    Ok(Json(CommandResponse::ok("Experiment fast-forwarding")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arenaviz_core::broadcast::Broadcaster;
    use arenaviz_core::controller::ExperimentController;
    use arenaviz_core::encode::EncoderRegistry;
    use arenaviz_types::ExperimentState;
    use axum::http::StatusCode;

    fn make_state() -> Arc<AppState> {
        let broadcaster = Arc::new(Broadcaster::new());
        let controller = Arc::new(ExperimentController::new(
            Box::new(arenaviz_core::engine::StubEngine::default()),
            EncoderRegistry::new(),
            Arc::clone(&broadcaster),
            2,
        ));
        Arc::new(AppState::new(controller, broadcaster))
    }

    #[tokio::test]
    async fn start_route_plays() {
        let state = make_state();
        let _ = start(State(Arc::clone(&state))).await;
        assert_eq!(state.controller.state(), ExperimentState::Playing);
    }

    #[tokio::test]
    async fn pause_route_surfaces_the_domain_error() {
        let state = make_state();

        // Not running yet: 409 with the state string in the envelope.
        let err = pause(State(Arc::clone(&state))).await.map(|_| ()).unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        state.controller.play();
        assert!(pause(State(Arc::clone(&state))).await.is_ok());
        assert_eq!(state.controller.state(), ExperimentState::Paused);
    }

    #[tokio::test]
    async fn step_route_pauses_after_one_step() {
        let state = make_state();
        let _ = step(State(Arc::clone(&state))).await;
        assert_eq!(state.controller.state(), ExperimentState::Paused);
    }

    #[tokio::test]
    async fn reset_route_reinitializes() {
        let state = make_state();
        state.controller.play();
        let _ = reset(State(Arc::clone(&state))).await;
        assert_eq!(state.controller.state(), ExperimentState::Initialized);
    }

    #[tokio::test]
    async fn fastforward_route_validates_steps() {
        let state = make_state();

        let err = fastforward(
            State(Arc::clone(&state)),
            Query(FastForwardParams { steps: Some(0) }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.controller.state(), ExperimentState::Initialized);

        assert!(
            fastforward(
                State(Arc::clone(&state)),
                Query(FastForwardParams { steps: Some(4) }),
            )
            .await
            .is_ok()
        );
        assert_eq!(state.controller.state(), ExperimentState::FastForwarding);
        assert_eq!(state.controller.frames_per_broadcast(), 4);
    }
}
