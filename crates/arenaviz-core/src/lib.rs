//! Core of the Arenaviz visualization server.
//!
//! This crate holds the hard concurrent machinery: the experiment
//! lifecycle state machine, the paced simulation step loop, and the
//! broadcast pipeline that fans state snapshots, lifecycle events, and log
//! batches out to connected clients.
//!
//! # Architecture
//!
//! Three concurrent roles share state through narrow, lock-disciplined
//! seams:
//!
//! - The **step loop** (a dedicated OS thread, [`step_loop::run_step_loop`])
//!   advances the opaque [`engine::SimulationEngine`] at a paced rate and
//!   produces state snapshots.
//! - The **broadcast loop** (a second OS thread,
//!   [`broadcast::run_broadcast_loop`]) periodically drains the snapshot
//!   slot, event queue, and log queue owned by [`broadcast::Broadcaster`]
//!   and posts frames into per-client mailboxes.
//! - **I/O tasks** (the transport crate) deliver inbound commands to the
//!   [`controller::ExperimentController`] and drain the mailboxes to
//!   sockets.
//!
//! The lifecycle state itself is a single atomic cell
//! ([`state::SharedExperimentState`]), so every thread can poll it without
//! a lock. The three broadcast buffers each sit behind their own mutex,
//! never held simultaneously, with all socket I/O performed after release.

pub mod broadcast;
pub mod commands;
pub mod config;
pub mod controller;
pub mod encode;
pub mod engine;
pub mod state;
pub mod step_loop;
pub mod timer;

// Re-export primary types for convenience.
pub use broadcast::{Broadcaster, run_broadcast_loop};
pub use commands::{CommandHook, NoOpCommandHook, route_message};
pub use config::{ConfigError, TlsConfig, VizConfig};
pub use controller::{ControllerError, ExperimentController};
pub use encode::EncoderRegistry;
pub use engine::{EngineError, EntityRecord, MoveOutcome, SimulationEngine, StubEngine};
pub use state::SharedExperimentState;
pub use step_loop::run_step_loop;
pub use timer::Timer;
