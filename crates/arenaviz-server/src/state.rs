//! Shared application state for the transport layer.

use std::sync::Arc;

use arenaviz_core::broadcast::Broadcaster;
use arenaviz_core::commands::{CommandHook, NoOpCommandHook};
use arenaviz_core::controller::ExperimentController;

/// State injected into every Axum handler.
///
/// Wrapped in [`Arc`] and cloned freely; all fields are themselves
/// shared handles.
#[derive(Clone)]
pub struct AppState {
    /// The experiment lifecycle controller.
    pub controller: Arc<ExperimentController>,
    /// The broadcast pipeline (client registry + queues).
    pub broadcaster: Arc<Broadcaster>,
    /// Extension hook for unrecognized client commands.
    pub hook: Arc<dyn CommandHook>,
}

impl AppState {
    /// Create application state with the default (no-op) command hook.
    pub fn new(controller: Arc<ExperimentController>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            controller,
            broadcaster,
            hook: Arc::new(NoOpCommandHook),
        }
    }

    /// Replace the command hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn CommandHook>) -> Self {
        self.hook = hook;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
