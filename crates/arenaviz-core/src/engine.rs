//! The opaque simulation engine seam.
//!
//! The physics/space engine is an external collaborator: the core only
//! ever steps it, asks whether it is finished, resets or terminates it,
//! and reads back the data every snapshot needs (arena geometry, entity
//! records, step counter). Everything behind those calls -- entity graphs,
//! collision checking, loop functions -- is the engine's business.

use std::time::Duration;

use arenaviz_types::{ArenaInfo, Quaternion, Vec3};

/// Errors surfaced by an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No entity with the requested identifier exists.
    #[error("no entity found with id: {id}")]
    EntityNotFound {
        /// The identifier that failed to resolve.
        id: String,
    },
}

/// Result of a [`SimulationEngine::move_entity`] request that resolved an
/// entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The entity was moved to the requested pose.
    Moved,
    /// Physics refused the move (collision); the pose is unchanged.
    CollisionRefused,
}

/// A snapshot-facing view of one entity.
///
/// The `extra` payload carries kind-specific data (a light's intensity, a
/// box's extents); its shape is an agreement between the engine and the
/// encoder registered for `kind`, opaque to the core.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Engine-assigned identifier, unique within the arena.
    pub id: String,
    /// Entity kind tag used to select an encoder (e.g. `"box"`, `"bot"`).
    pub kind: String,
    /// Current position.
    pub position: Vec3,
    /// Current orientation.
    pub orientation: Quaternion,
    /// Kind-specific payload; `Null` when there is none.
    pub extra: serde_json::Value,
}

/// The opaque stepper the core drives.
///
/// One call to [`step`](Self::step) advances the simulation by exactly one
/// tick. The pre-step, post-step, and post-experiment hooks have empty
/// default bodies; engines with loop functions override them.
pub trait SimulationEngine: Send {
    /// Advance the simulation by one step.
    fn step(&mut self);

    /// Whether the experiment has reached its end condition.
    fn is_finished(&self) -> bool;

    /// Return the experiment to its initial state.
    fn reset(&mut self);

    /// Terminate the experiment early.
    fn terminate(&mut self);

    /// The configured real-time duration of one simulation step. Sampled
    /// once per play/fast-forward call to derive the tick budget.
    fn clock_tick(&self) -> Duration;

    /// Number of steps executed since the last reset.
    fn step_count(&self) -> u64;

    /// Arena geometry for snapshots.
    fn arena(&self) -> ArenaInfo;

    /// Snapshot-facing records for every entity in the arena.
    fn entities(&self) -> Vec<EntityRecord>;

    /// Move an entity to a new pose.
    ///
    /// Resolution of the identifier to a movable body (directly embodied,
    /// or through a composed body sub-component) is the engine's concern.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EntityNotFound`] when the identifier does
    /// not resolve to a movable entity.
    fn move_entity(
        &mut self,
        id: &str,
        position: Vec3,
        orientation: Quaternion,
    ) -> Result<MoveOutcome, EngineError>;

    /// Hook run before each step (or batch of fast-forward steps).
    fn pre_step(&mut self) {}

    /// Hook run after each step (or batch) and its broadcast.
    fn post_step(&mut self) {}

    /// Hook run exactly once when the experiment completes.
    fn post_experiment(&mut self) {}
}

/// A minimal engine for tests and wiring examples: counts steps, owns no
/// entities, finishes only when terminated.
#[derive(Debug, Default)]
pub struct StubEngine {
    steps: u64,
    finished: bool,
}

impl SimulationEngine for StubEngine {
    fn step(&mut self) {
        self.steps = self.steps.saturating_add(1);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn reset(&mut self) {
        self.steps = 0;
        self.finished = false;
    }

    fn terminate(&mut self) {
        self.finished = true;
    }

    fn clock_tick(&self) -> Duration {
        Duration::from_millis(1)
    }

    fn step_count(&self) -> u64 {
        self.steps
    }

    fn arena(&self) -> ArenaInfo {
        ArenaInfo::default()
    }

    fn entities(&self) -> Vec<EntityRecord> {
        Vec::new()
    }

    fn move_entity(
        &mut self,
        id: &str,
        _position: Vec3,
        _orientation: Quaternion,
    ) -> Result<MoveOutcome, EngineError> {
        Err(EngineError::EntityNotFound {
            id: String::from(id),
        })
    }
}
