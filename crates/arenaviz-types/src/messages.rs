//! Wire message schemas.
//!
//! Three kinds of traffic cross the websocket boundary:
//!
//! - **Inbound**: [`ClientCommand`] objects, tagged by their `command`
//!   field. Anything that does not parse is discarded at the transport
//!   boundary (there is no reliable back-channel for malformed frames).
//! - **Outbound, per topic**: [`StateSnapshot`] on `broadcasts`,
//!   [`EventMessage`] on `events`, [`LogBatch`] on `logs`.
//! - **HTTP**: [`CommandResponse`] envelopes from the control routes.

use serde::{Deserialize, Deserializer, Serialize};

use crate::math::{Quaternion, Vec3};
use crate::state::ExperimentState;

/// Pub/sub topics a websocket client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Periodic full state snapshots.
    Broadcasts,
    /// Lifecycle transition events.
    Events,
    /// Batched server log records.
    Logs,
}

impl Topic {
    /// All topics, in fan-out order.
    pub const ALL: [Self; 3] = [Self::Broadcasts, Self::Events, Self::Logs];

    /// The topic name used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Broadcasts => "broadcasts",
            Self::Events => "events",
            Self::Logs => "logs",
        }
    }

    /// Parse a subscription token from the websocket query string.
    ///
    /// Both `broadcast` and `broadcasts` are accepted for the snapshot
    /// topic; earlier clients used the singular form.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "broadcast" | "broadcasts" => Some(Self::Broadcasts),
            "events" => Some(Self::Events),
            "logs" => Some(Self::Logs),
            _ => None,
        }
    }
}

/// A control command sent by a client over the websocket.
///
/// The JSON object carries a `command` field naming the operation; the
/// remaining fields depend on the command. Unknown `command` values fail
/// to parse here and are handed to the user extension hook instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum ClientCommand {
    /// Start or resume playing.
    #[serde(rename = "play")]
    Play,

    /// Pause a running experiment.
    #[serde(rename = "pause")]
    Pause,

    /// Advance exactly one engine step.
    #[serde(rename = "step")]
    Step,

    /// Reset the experiment to its initial state.
    #[serde(rename = "reset")]
    Reset,

    /// Terminate the experiment.
    #[serde(rename = "terminate")]
    Terminate,

    /// Enter fast-forward mode.
    #[serde(rename = "fastforward")]
    FastForward {
        /// Steps to execute per broadcast. Values outside [1,1000] (or a
        /// malformed value) leave the current setting untouched.
        #[serde(default, deserialize_with = "lenient_steps")]
        steps: Option<u16>,
    },

    /// Move an entity to a new pose.
    #[serde(rename = "moveEntity")]
    MoveEntity {
        /// The engine-assigned entity identifier.
        entity_id: String,
        /// Target position.
        position: Vec3,
        /// Target orientation.
        orientation: Quaternion,
    },
}

/// Tolerant `steps` parser: a missing, malformed, or non-integral value
/// becomes `None` rather than failing the whole command.
fn lenient_steps<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u16::try_from(n).ok()))
}

/// Arena geometry included in every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaInfo {
    /// Arena extent along each axis.
    pub size: Vec3,
    /// Arena center position.
    pub center: Vec3,
}

/// A full state snapshot, published on the `broadcasts` topic.
///
/// Entity objects are opaque here: their shape is decided by the encoder
/// registered for each entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// One opaque JSON object per entity in the arena.
    pub entities: Vec<serde_json::Value>,
    /// Arena geometry.
    pub arena: ArenaInfo,
    /// Unix epoch milliseconds at snapshot time.
    pub timestamp: i64,
    /// Experiment lifecycle state at snapshot time.
    pub state: ExperimentState,
    /// Engine step counter at snapshot time.
    pub steps: u64,
    /// Message discriminator; always `"broadcast"`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// A lifecycle transition event, published on the `events` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Message discriminator; always `"event"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable event name, e.g. `"Experiment playing"`.
    pub event: String,
    /// Lifecycle state after the transition.
    pub state: ExperimentState,
}

impl EventMessage {
    /// Build an event message for a transition.
    pub fn new(event: impl Into<String>, state: ExperimentState) -> Self {
        Self {
            kind: String::from("event"),
            event: event.into(),
            state,
        }
    }
}

/// One intercepted log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Source stream: `"LOG"` for routine output, `"LOGERR"` for
    /// warnings and errors.
    pub log_type: String,
    /// The log line.
    pub log_message: String,
    /// Engine step counter when the record was produced.
    pub step: u64,
}

/// A batch of log records fused into one message, published on the
/// `logs` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatch {
    /// Message discriminator; always `"log"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Unix epoch milliseconds when the batch was assembled.
    pub timestamp: i64,
    /// The drained records, oldest first.
    pub messages: Vec<LogRecord>,
}

impl LogBatch {
    /// Assemble a batch from drained records.
    pub fn new(timestamp: i64, messages: Vec<LogRecord>) -> Self {
        Self {
            kind: String::from("log"),
            timestamp,
            messages,
        }
    }
}

/// JSON envelope returned by the HTTP control routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// `"Ok"` on success, `"Error"` otherwise.
    pub status: String,
    /// Optional human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    /// A success envelope with a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: String::from("Ok"),
            message: Some(message.into()),
        }
    }

    /// An error envelope with a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: String::from("Error"),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_commands() {
        for (json, expected) in [
            (r#"{"command":"play"}"#, ClientCommand::Play),
            (r#"{"command":"pause"}"#, ClientCommand::Pause),
            (r#"{"command":"step"}"#, ClientCommand::Step),
            (r#"{"command":"reset"}"#, ClientCommand::Reset),
            (r#"{"command":"terminate"}"#, ClientCommand::Terminate),
        ] {
            let cmd: ClientCommand = serde_json::from_str(json).unwrap();
            assert_eq!(cmd, expected);
        }
    }

    #[test]
    fn parses_fastforward_with_steps() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"command":"fastforward","steps":5}"#).unwrap();
        assert_eq!(cmd, ClientCommand::FastForward { steps: Some(5) });
    }

    #[test]
    fn fastforward_without_steps() {
        let cmd: ClientCommand = serde_json::from_str(r#"{"command":"fastforward"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::FastForward { steps: None });
    }

    #[test]
    fn fastforward_malformed_steps_is_tolerated() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"command":"fastforward","steps":"soon"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::FastForward { steps: None });

        let cmd: ClientCommand =
            serde_json::from_str(r#"{"command":"fastforward","steps":-3}"#).unwrap();
        assert_eq!(cmd, ClientCommand::FastForward { steps: None });
    }

    #[test]
    fn parses_move_entity() {
        let json = r#"{
            "command": "moveEntity",
            "entity_id": "bot_04",
            "position": {"x": 1.0, "y": 2.0, "z": 0.0},
            "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}
        }"#;
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::MoveEntity {
                entity_id: String::from("bot_04"),
                position: Vec3::new(1.0, 2.0, 0.0),
                orientation: Quaternion::identity(),
            }
        );
    }

    #[test]
    fn unknown_command_fails_to_parse() {
        let result: Result<ClientCommand, _> =
            serde_json::from_str(r#"{"command":"selfdestruct"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn snapshot_wire_keys() {
        let snapshot = StateSnapshot {
            entities: vec![serde_json::json!({"id": "box_0"})],
            arena: ArenaInfo::default(),
            timestamp: 1_700_000_000_000,
            state: ExperimentState::Playing,
            steps: 42,
            kind: String::from("broadcast"),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        let object = value.as_object().unwrap();
        for key in ["entities", "arena", "timestamp", "state", "steps", "type"] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(value.get("type").unwrap(), "broadcast");
        assert_eq!(value.get("state").unwrap(), "EXPERIMENT_PLAYING");
    }

    #[test]
    fn event_message_wire_shape() {
        let event = EventMessage::new("Experiment paused", ExperimentState::Paused);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value.get("type").unwrap(), "event");
        assert_eq!(value.get("event").unwrap(), "Experiment paused");
        assert_eq!(value.get("state").unwrap(), "EXPERIMENT_PAUSED");
    }

    #[test]
    fn log_batch_wire_shape() {
        let batch = LogBatch::new(
            1_700_000_000_000,
            vec![LogRecord {
                log_type: String::from("LOG"),
                log_message: String::from("Experiment playing"),
                step: 3,
            }],
        );
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value.get("type").unwrap(), "log");
        assert_eq!(
            value
                .get("messages")
                .and_then(|m| m.as_array())
                .map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn topic_parse_accepts_both_snapshot_spellings() {
        assert_eq!(Topic::parse("broadcast"), Some(Topic::Broadcasts));
        assert_eq!(Topic::parse("broadcasts"), Some(Topic::Broadcasts));
        assert_eq!(Topic::parse("events"), Some(Topic::Events));
        assert_eq!(Topic::parse("logs"), Some(Topic::Logs));
        assert_eq!(Topic::parse("metrics"), None);
    }

    #[test]
    fn command_response_omits_empty_message() {
        let response = CommandResponse {
            status: String::from("Ok"),
            message: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"Ok"}"#);
    }
}
