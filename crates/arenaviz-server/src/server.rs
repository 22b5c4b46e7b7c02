//! Server lifecycle: bind and serve, plain or TLS.
//!
//! The bind is eager so a busy port fails startup instead of surfacing
//! later; running on an undefined port is not an option.

use std::net::SocketAddr;
use std::sync::Arc;

use arenaviz_core::config::VizConfig;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// Failed to load the configured TLS material.
    #[error("tls error: {0}")]
    Tls(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Start the server and run it until the process exits.
///
/// When any TLS path is configured the transport switches to
/// `https`/`wss` via rustls; otherwise it serves plain TCP. Connection
/// peer addresses are propagated so the websocket layer can label
/// clients.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] when the port is unavailable,
/// [`ServerError::Tls`] when certificate material cannot be loaded, or
/// [`ServerError::Serve`] on a fatal I/O error.
pub async fn start_server(config: &VizConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = build_router(state).into_make_service_with_connect_info::<SocketAddr>();

    if config.tls.enabled() {
        let tls = RustlsConfig::from_pem_file(&config.tls.cert_file, &config.tls.key_file)
            .await
            .map_err(|e| ServerError::Tls(format!("loading tls material: {e}")))?;

        info!(%addr, "Arenaviz server listening (wss)");
        axum_server::bind_rustls(addr, tls)
            .serve(router)
            .await
            .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;
    } else {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

        info!(%addr, "Arenaviz server listening");
        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;
    }

    Ok(())
}
