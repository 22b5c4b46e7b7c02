//! Entity-to-JSON encoder registry.
//!
//! Per-entity wire shapes are not the core's business: the host registers
//! one pure encoding function per entity kind, and the snapshot builder
//! dispatches through this table. An entity whose kind has no registered
//! encoder is reported once per snapshot and skipped -- the rest of the
//! snapshot still goes out.

use std::collections::HashMap;

use tracing::error;

use crate::engine::EntityRecord;

/// A pure encoding function for one entity kind.
pub type EncodeFn = Box<dyn Fn(&EntityRecord) -> serde_json::Value + Send + Sync>;

/// Kind-keyed table of entity encoders.
#[derive(Default)]
pub struct EncoderRegistry {
    encoders: HashMap<String, EncodeFn>,
}

impl EncoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an encoder for an entity kind, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<String>, encode: F)
    where
        F: Fn(&EntityRecord) -> serde_json::Value + Send + Sync + 'static,
    {
        self.encoders.insert(kind.into(), Box::new(encode));
    }

    /// Encode one entity record, or `None` if its kind is unregistered.
    pub fn encode(&self, record: &EntityRecord) -> Option<serde_json::Value> {
        match self.encoders.get(&record.kind) {
            Some(encode) => Some(encode(record)),
            None => {
                error!(
                    kind = %record.kind,
                    id = %record.id,
                    "unknown entity kind, register an encoder to include it in snapshots"
                );
                None
            }
        }
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    /// Whether the registry has no encoders.
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

impl std::fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("kinds", &self.encoders.keys().collect::<Vec<_>>())
            .finish()
    }
}
