//! The experiment controller: lifecycle state machine and snapshot
//! producer.
//!
//! The controller exclusively owns the engine handle, the atomic state
//! cell, and the tick budget. It is shared (`Arc`) between the command
//! paths (websocket router, HTTP routes) and the step loop; every
//! operation here is safe to call from any of them.
//!
//! Transition policy: play and fast-forward are silent no-ops on misuse
//! because they are commonly triggered by UI double-clicks. Pause fails
//! hard, and a step requested while running only forces a pause -- those
//! two can corrupt the concurrent step loop if not serialized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arenaviz_types::{ExperimentState, Quaternion, StateSnapshot, Vec3};
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::encode::EncoderRegistry;
use crate::engine::{EngineError, MoveOutcome, SimulationEngine};
use crate::state::SharedExperimentState;
use crate::timer::Timer;

/// Errors surfaced to command callers.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The requested transition is not valid from the current state.
    #[error("invalid transition from state {state}")]
    InvalidTransition {
        /// The lifecycle state at the time of the request.
        state: ExperimentState,
    },

    /// The engine rejected the request.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Recover the guard from a poisoned mutex; see
/// [`broadcast`](crate::broadcast) for the rationale.
fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The experiment lifecycle controller.
pub struct ExperimentController {
    shared: SharedExperimentState,
    engine: Mutex<Box<dyn SimulationEngine>>,
    encoders: EncoderRegistry,
    broadcaster: Arc<Broadcaster>,
    /// Engine steps per broadcast while fast-forwarding; range [1,1000].
    ff_frames: AtomicU64,
    /// Real-time budget of one step, milliseconds. Written by
    /// play/fast-forward, read every step-loop iteration.
    tick_budget_ms: AtomicU64,
    /// Pacing stopwatch shared with the step loop.
    pacing: Mutex<Timer>,
}

impl std::fmt::Debug for ExperimentController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentController")
            .field("state", &self.shared.load())
            .field("ff_frames", &self.ff_frames.load(Ordering::Acquire))
            .field("tick_budget_ms", &self.tick_budget_ms.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl ExperimentController {
    /// Create a controller in the `Initialized` state.
    ///
    /// `ff_frames` is the configured number of engine steps per broadcast
    /// while fast-forwarding (`ff_draw_frames_every`).
    pub fn new(
        engine: Box<dyn SimulationEngine>,
        encoders: EncoderRegistry,
        broadcaster: Arc<Broadcaster>,
        ff_frames: u64,
    ) -> Self {
        Self {
            shared: SharedExperimentState::default(),
            engine: Mutex::new(engine),
            encoders,
            broadcaster,
            ff_frames: AtomicU64::new(ff_frames),
            tick_budget_ms: AtomicU64::new(0),
            pacing: Mutex::new(Timer::new()),
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ExperimentState {
        self.shared.load()
    }

    /// Engine steps executed per broadcast while fast-forwarding.
    pub fn frames_per_broadcast(&self) -> u64 {
        self.ff_frames.load(Ordering::Acquire)
    }

    /// The real-time budget of one step.
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_budget_ms.load(Ordering::Acquire))
    }

    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut dyn SimulationEngine) -> R) -> R {
        let mut guard = lock_unpoisoned(&self.engine);
        f(guard.as_mut())
    }

    fn store_tick_budget(&self) {
        let tick = self.with_engine(|engine| engine.clock_tick());
        let millis = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);
        self.tick_budget_ms.store(millis, Ordering::Release);
    }

    pub(crate) fn start_pacing_timer(&self) {
        lock_unpoisoned(&self.pacing).start();
    }

    /// Stop the pacing stopwatch and return the measured duration.
    pub(crate) fn stop_pacing_timer(&self) -> Duration {
        let mut timer = lock_unpoisoned(&self.pacing);
        timer.stop();
        timer.elapsed()
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------------

    /// Start or resume playing.
    ///
    /// Valid from `Initialized` and `Paused`; anywhere else this logs a
    /// warning and returns without effect.
    pub fn play(&self) {
        let current = self.shared.load();
        if !matches!(
            current,
            ExperimentState::Initialized | ExperimentState::Paused
        ) {
            warn!(state = %current, "play requested in wrong state");
            return;
        }

        self.store_tick_budget();
        self.shared.store(ExperimentState::Playing);
        self.broadcaster
            .push_event("Experiment playing", ExperimentState::Playing);
        info!("Experiment playing");
        self.start_pacing_timer();
    }

    /// Enter fast-forward mode, optionally adjusting the frame count.
    ///
    /// Valid from `Initialized` and `Paused`. From `Done` this returns
    /// without effect; from a running state it warns and proceeds anyway
    /// (the step loop just switches batch size). A `steps` value outside
    /// [1,1000] leaves the configured count untouched.
    pub fn fast_forward(&self, steps: Option<u16>) {
        let current = self.shared.load();
        if !matches!(
            current,
            ExperimentState::Initialized | ExperimentState::Paused
        ) {
            warn!(
                state = %current,
                "fast-forward requested in wrong state, continuing in fast-forward mode"
            );
            if current == ExperimentState::Done {
                return;
            }
        }

        if let Some(steps) = steps {
            if (1..=1000).contains(&steps) {
                self.ff_frames.store(u64::from(steps), Ordering::Release);
            } else {
                warn!(steps, "ignoring fast-forward frame count outside [1,1000]");
            }
        }

        self.store_tick_budget();
        self.shared.store(ExperimentState::FastForwarding);
        self.broadcaster
            .push_event("Experiment fast-forwarding", ExperimentState::FastForwarding);
        info!("Experiment fast-forwarding");
        self.start_pacing_timer();
    }

    /// Pause a running experiment.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] when the experiment
    /// is not playing or fast-forwarding; the error carries the observed
    /// state for the client-visible message.
    pub fn pause(&self) -> Result<(), ControllerError> {
        let current = self.shared.load();
        if !current.is_running() {
            return Err(ControllerError::InvalidTransition { state: current });
        }

        self.shared.store(ExperimentState::Paused);
        self.broadcaster
            .push_event("Experiment paused", ExperimentState::Paused);
        info!("Experiment paused");
        Ok(())
    }

    /// Advance exactly one engine step, then pause.
    ///
    /// If the experiment is currently running this only forces a pause --
    /// the step loop may be mid-batch, and racing it with a second
    /// stepper would corrupt the engine. A snapshot is still broadcast so
    /// every step request remains observable.
    pub fn step(&self) {
        let current = self.shared.load();
        if current.is_running() {
            warn!(state = %current, "step requested while running, pausing instead");
            self.shared.store(ExperimentState::Paused);
            self.broadcast_state();
            return;
        }

        let finished = self.with_engine(|engine| engine.is_finished());
        if finished {
            self.with_engine(|engine| engine.post_experiment());
            self.shared.store(ExperimentState::Done);
            self.broadcaster
                .push_event("Experiment done", ExperimentState::Done);
            info!("Experiment done");
        } else {
            self.with_engine(|engine| {
                engine.pre_step();
                engine.step();
                engine.post_step();
            });
            self.shared.store(ExperimentState::Paused);
            self.broadcaster
                .push_event("Experiment step done", ExperimentState::Paused);
        }

        self.broadcast_state();
    }

    /// Reset the experiment to its initial state. Always succeeds.
    pub fn reset(&self) {
        self.with_engine(|engine| engine.reset());
        self.shared.store(ExperimentState::Initialized);
        self.broadcaster
            .push_event("Experiment reset", ExperimentState::Initialized);
        self.broadcast_state();
        info!("Experiment reset");
    }

    /// Terminate a running or paused experiment.
    ///
    /// From `Initialized` or `Done` this logs a warning and returns
    /// without effect.
    pub fn terminate(&self) {
        let current = self.shared.load();
        if !matches!(
            current,
            ExperimentState::Playing | ExperimentState::Paused | ExperimentState::FastForwarding
        ) {
            warn!(state = %current, "terminate requested in wrong state");
            return;
        }

        self.with_engine(|engine| {
            engine.terminate();
            engine.post_experiment();
        });
        self.shared.store(ExperimentState::Done);
        self.broadcaster
            .push_event("Experiment done", ExperimentState::Done);
        info!("Experiment done");
    }

    /// Move an entity to a new pose.
    ///
    /// A collision refusal is a warning, not an error: the command
    /// succeeded from the protocol's perspective, physics just said no.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Engine`] when the identifier does not
    /// resolve to a movable entity.
    pub fn move_entity(
        &self,
        id: &str,
        position: Vec3,
        orientation: Quaternion,
    ) -> Result<(), ControllerError> {
        let outcome =
            self.with_engine(|engine| engine.move_entity(id, position, orientation))?;
        match outcome {
            MoveOutcome::Moved => info!(entity_id = id, "entity moved"),
            MoveOutcome::CollisionRefused => {
                warn!(entity_id = id, "entity cannot be moved, collision detected");
            }
        }
        Ok(())
    }

    /// Build and publish a state snapshot into the broadcast slot.
    ///
    /// Entities whose kind has no registered encoder are skipped (the
    /// registry logs them). The broadcaster's step stamp is refreshed so
    /// subsequent log records carry the right step number.
    pub fn broadcast_state(&self) {
        let snapshot = {
            let mut guard = lock_unpoisoned(&self.engine);
            let engine = guard.as_mut();
            let entities = engine
                .entities()
                .into_iter()
                .filter_map(|record| self.encoders.encode(&record))
                .collect();
            let steps = engine.step_count();
            self.broadcaster.set_current_step(steps);
            StateSnapshot {
                entities,
                arena: engine.arena(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                state: self.shared.load(),
                steps,
                kind: String::from("broadcast"),
            }
        };

        match serde_json::to_string(&snapshot) {
            Ok(json) => self.broadcaster.push_snapshot(json),
            Err(e) => warn!(error = %e, "failed to serialize state snapshot"),
        }
    }

    /// Transition `from` to `Done` exactly once: run the post-experiment
    /// hook and emit the lifecycle event only if this call won the race.
    ///
    /// Returns `true` when the transition happened here.
    pub(crate) fn finish_experiment_from(&self, from: ExperimentState) -> bool {
        if self.shared.compare_exchange(from, ExperimentState::Done).is_err() {
            return false;
        }
        self.with_engine(|engine| engine.post_experiment());
        self.broadcaster
            .push_event("Experiment done", ExperimentState::Done);
        info!("Experiment done");
        true
    }
}
