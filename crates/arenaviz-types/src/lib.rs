//! Shared type definitions for the Arenaviz visualization server.
//!
//! This crate is the single source of truth for the types that cross the
//! wire between the simulator and connected visualization clients, and for
//! the experiment lifecycle state shared across the workspace.
//!
//! # Modules
//!
//! - [`state`] -- the experiment lifecycle state enum
//! - [`math`] -- minimal vector and quaternion value types
//! - [`messages`] -- client command payloads and outbound message schemas

pub mod math;
pub mod messages;
pub mod state;

// Re-export all public types at crate root for convenience.
pub use math::{Quaternion, Vec3};
pub use messages::{
    ArenaInfo, ClientCommand, CommandResponse, EventMessage, LogBatch, LogRecord, StateSnapshot,
    Topic,
};
pub use state::ExperimentState;
