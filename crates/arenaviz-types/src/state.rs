//! Experiment lifecycle state.
//!
//! One process-wide value of [`ExperimentState`] describes where the
//! experiment is in its lifecycle. The wire rendering (`EXPERIMENT_*`) is
//! part of the protocol: it appears in every state snapshot, in lifecycle
//! event messages, and in error messages returned to clients.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the experiment.
///
/// Valid transitions are enforced by the controller, not here; this enum
/// only enumerates the states and their wire strings. Fast-forwarding is a
/// distinct state rather than a flag on top of `Playing`, so a single
/// atomic cell can hold the whole truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExperimentState {
    /// The experiment is loaded and ready; no steps have run since the
    /// last reset.
    #[serde(rename = "EXPERIMENT_INITIALIZED")]
    Initialized = 0,

    /// The step loop is advancing the engine one step per tick.
    #[serde(rename = "EXPERIMENT_PLAYING")]
    Playing = 1,

    /// The step loop is idle; state is preserved.
    #[serde(rename = "EXPERIMENT_PAUSED")]
    Paused = 2,

    /// The step loop is advancing the engine multiple steps per broadcast,
    /// trading visual granularity for throughput.
    #[serde(rename = "EXPERIMENT_FAST_FORWARDING")]
    FastForwarding = 3,

    /// The engine reported completion (or was terminated). Only a reset
    /// leaves this state.
    #[serde(rename = "EXPERIMENT_DONE")]
    Done = 4,
}

impl ExperimentState {
    /// The wire rendering of this state, as sent in snapshots and events.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "EXPERIMENT_INITIALIZED",
            Self::Playing => "EXPERIMENT_PLAYING",
            Self::Paused => "EXPERIMENT_PAUSED",
            Self::FastForwarding => "EXPERIMENT_FAST_FORWARDING",
            Self::Done => "EXPERIMENT_DONE",
        }
    }

    /// Whether the step loop should be advancing the engine in this state.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Playing | Self::FastForwarding)
    }
}

impl std::fmt::Display for ExperimentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_protocol() {
        assert_eq!(
            ExperimentState::Initialized.as_str(),
            "EXPERIMENT_INITIALIZED"
        );
        assert_eq!(ExperimentState::Playing.as_str(), "EXPERIMENT_PLAYING");
        assert_eq!(ExperimentState::Paused.as_str(), "EXPERIMENT_PAUSED");
        assert_eq!(
            ExperimentState::FastForwarding.as_str(),
            "EXPERIMENT_FAST_FORWARDING"
        );
        assert_eq!(ExperimentState::Done.as_str(), "EXPERIMENT_DONE");
    }

    #[test]
    fn serializes_to_wire_string() {
        let json = serde_json::to_string(&ExperimentState::FastForwarding).unwrap();
        assert_eq!(json, "\"EXPERIMENT_FAST_FORWARDING\"");
    }

    #[test]
    fn deserializes_from_wire_string() {
        let state: ExperimentState = serde_json::from_str("\"EXPERIMENT_PAUSED\"").unwrap();
        assert_eq!(state, ExperimentState::Paused);
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(
            format!("{}", ExperimentState::Done),
            ExperimentState::Done.as_str()
        );
    }

    #[test]
    fn running_states() {
        assert!(ExperimentState::Playing.is_running());
        assert!(ExperimentState::FastForwarding.is_running());
        assert!(!ExperimentState::Initialized.is_running());
        assert!(!ExperimentState::Paused.is_running());
        assert!(!ExperimentState::Done.is_running());
    }
}
