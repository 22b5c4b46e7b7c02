//! HTTP + websocket transport for the Arenaviz visualization server.
//!
//! This crate provides the Axum server that exposes:
//!
//! - **Websocket endpoint** (`GET /ws`) delivering the `broadcasts`,
//!   `events`, and `logs` topics and accepting control commands
//! - **HTTP control routes** (`/start`, `/pause`, `/step`, `/reset`,
//!   `/fastforward`) mirroring the controller operations synchronously
//! - **A tracing layer** ([`logs::BroadcastLogLayer`]) that feeds every
//!   server log line into the broadcaster's log queue
//!
//! # Architecture
//!
//! The transport owns no simulation state. Inbound commands go straight
//! to the [`ExperimentController`](arenaviz_core::ExperimentController);
//! outbound traffic arrives through per-connection mailboxes registered
//! with the [`Broadcaster`](arenaviz_core::Broadcaster). A websocket is
//! only ever written from the task that owns it, so the broadcaster's
//! fan-out can run on its own thread without touching sockets.

pub mod error;
pub mod http;
pub mod logs;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use logs::BroadcastLogLayer;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
