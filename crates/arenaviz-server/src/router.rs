//! Axum router construction.
//!
//! Assembles the websocket endpoint and the HTTP control routes into a
//! single [`Router`] with CORS enabled for cross-origin dashboards.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http;
use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// Routes:
/// - `GET /` -- plain-text server banner
/// - `GET /ws` -- websocket (topics via query string)
/// - `GET /start`, `/pause`, `/step`, `/reset`, `/fastforward` --
///   synchronous control routes
///
/// CORS allows any origin; the server is meant to sit next to whatever
/// dashboard wants to talk to it.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(http::index))
        .route("/ws", get(ws::ws_handler))
        .route("/start", get(http::start))
        .route("/pause", get(http::pause))
        .route("/step", get(http::step))
        .route("/reset", get(http::reset))
        .route("/fastforward", get(http::fastforward))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arenaviz_core::broadcast::Broadcaster;
    use arenaviz_core::controller::ExperimentController;
    use arenaviz_core::encode::EncoderRegistry;
    use arenaviz_core::engine::StubEngine;
    use arenaviz_types::ExperimentState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt as _;

    fn make_app() -> (Router, Arc<AppState>) {
        let broadcaster = Arc::new(Broadcaster::new());
        let controller = Arc::new(ExperimentController::new(
            Box::new(StubEngine::default()),
            EncoderRegistry::new(),
            Arc::clone(&broadcaster),
            2,
        ));
        let state = Arc::new(AppState::new(controller, broadcaster));
        (build_router(Arc::clone(&state)), state)
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn banner_route_responds() {
        let (app, _state) = make_app();
        assert_eq!(get_status(app, "/").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn control_routes_drive_the_controller() {
        let (app, state) = make_app();

        assert_eq!(get_status(app.clone(), "/start").await, StatusCode::OK);
        assert_eq!(state.controller.state(), ExperimentState::Playing);

        assert_eq!(get_status(app.clone(), "/pause").await, StatusCode::OK);
        assert_eq!(state.controller.state(), ExperimentState::Paused);

        // Pause again: the domain error surfaces as a conflict envelope.
        assert_eq!(get_status(app.clone(), "/pause").await, StatusCode::CONFLICT);

        assert_eq!(
            get_status(app.clone(), "/fastforward?steps=8").await,
            StatusCode::OK
        );
        assert_eq!(state.controller.frames_per_broadcast(), 8);

        assert_eq!(
            get_status(app.clone(), "/fastforward?steps=2000").await,
            StatusCode::BAD_REQUEST
        );

        assert_eq!(get_status(app, "/reset").await, StatusCode::OK);
        assert_eq!(state.controller.state(), ExperimentState::Initialized);
    }
}
