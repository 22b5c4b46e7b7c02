//! Inbound command routing.
//!
//! The transport hands every inbound text frame to [`route_message`].
//! Malformed JSON is logged and swallowed -- the websocket has no
//! reliable back-channel for malformed frames, so the sender is never
//! answered. Recognized commands dispatch to the controller; anything
//! else is offered to a pluggable [`CommandHook`] so deployments can
//! extend the protocol without touching the core.

use arenaviz_types::ClientCommand;
use tracing::{error, warn};

use crate::controller::ExperimentController;

/// Commands the core router handles itself. Frames naming one of these
/// with bad arguments are a protocol error, not hook material.
const KNOWN_COMMANDS: [&str; 7] = [
    "play",
    "pause",
    "step",
    "reset",
    "terminate",
    "fastforward",
    "moveEntity",
];

/// User extension point for unrecognized commands.
///
/// The hook sees the full JSON payload of any frame whose `command` the
/// core does not recognize (or that has no `command` field at all). Hook
/// failures are logged and otherwise ignored.
pub trait CommandHook: Send + Sync {
    /// Handle an unrecognized client payload.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the failure is logged at the call site
    /// and never propagated to the client.
    fn handle(
        &self,
        client: &str,
        payload: &serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// The default hook: ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCommandHook;

impl CommandHook for NoOpCommandHook {
    fn handle(
        &self,
        _client: &str,
        _payload: &serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Route one inbound text frame from `client`.
pub fn route_message(
    controller: &ExperimentController,
    hook: &dyn CommandHook,
    client: &str,
    raw: &str,
) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(%client, error = %e, "discarding malformed client frame");
            return;
        }
    };

    match serde_json::from_value::<ClientCommand>(value.clone()) {
        Ok(command) => dispatch(controller, client, command),
        Err(parse_err) => {
            let name = value.get("command").and_then(serde_json::Value::as_str);
            if name.is_some_and(|n| KNOWN_COMMANDS.contains(&n)) {
                warn!(
                    %client,
                    command = name.unwrap_or_default(),
                    error = %parse_err,
                    "invalid arguments for command"
                );
            } else if let Err(e) = hook.handle(client, &value) {
                error!(%client, error = %e, "error in user command hook");
            }
        }
    }
}

/// Dispatch a parsed command, translating domain errors to log lines.
fn dispatch(controller: &ExperimentController, client: &str, command: ClientCommand) {
    match command {
        ClientCommand::Play => controller.play(),
        ClientCommand::Pause => {
            if let Err(e) = controller.pause() {
                warn!(%client, error = %e, "pause rejected");
            }
        }
        ClientCommand::Step => controller.step(),
        ClientCommand::Reset => controller.reset(),
        ClientCommand::Terminate => controller.terminate(),
        ClientCommand::FastForward { steps } => controller.fast_forward(steps),
        ClientCommand::MoveEntity {
            entity_id,
            position,
            orientation,
        } => {
            if let Err(e) = controller.move_entity(&entity_id, position, orientation) {
                error!(%client, error = %e, "moveEntity failed");
            }
        }
    }
}
