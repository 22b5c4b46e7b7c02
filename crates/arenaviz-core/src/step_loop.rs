//! The simulation step loop.
//!
//! Runs on a dedicated OS thread for the life of the process. While the
//! experiment is playing it advances the engine at the paced tick rate
//! (one step per tick, or a whole batch per broadcast when
//! fast-forwarding); while idle it broadcasts the current state at a slow
//! poll so late-joining clients still see something.
//!
//! Pacing here is advisory: a tick that overruns its budget is logged and
//! the next tick starts a fresh window. There is no catch-up -- the
//! simulation rate is rate-limited, not deadline-scheduled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::controller::ExperimentController;

/// Poll interval while the experiment is not running. Idle broadcasts
/// exist for late joiners; 250ms keeps the churn low without making the
/// UI feel stale.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Run the step loop until the running flag clears.
///
/// The flag is checked in the outer loop and inside the fast-forward
/// batch, so shutdown takes effect within one engine step.
pub fn run_step_loop(controller: &ExperimentController, running: &AtomicBool) {
    while running.load(Ordering::Acquire) {
        let state = controller.state();
        if state.is_running() {
            run_play_iteration(controller, running);
            pace(controller);
        } else {
            controller.broadcast_state();
            std::thread::sleep(IDLE_POLL);
        }
    }
}

/// One playing/fast-forwarding iteration: a batch of engine steps, a
/// snapshot, the post-step hook, and -- if the engine finished during the
/// batch -- the one-shot transition to `Done`.
fn run_play_iteration(controller: &ExperimentController, running: &AtomicBool) {
    let frames = frames_for(controller);

    let finished = controller.with_engine(|engine| {
        engine.pre_step();
        let mut remaining = frames;
        // The state and shutdown guards let a concurrent pause (or
        // process exit) take effect mid-batch instead of after it.
        while remaining > 0
            && !engine.is_finished()
            && running.load(Ordering::Acquire)
            && controller_is_running(controller)
        {
            engine.step();
            remaining = remaining.saturating_sub(1);
        }
        engine.is_finished()
    });

    // Snapshots reflect the state after the whole batch, never an
    // intermediate frame.
    controller.broadcast_state();
    controller.with_engine(|engine| engine.post_step());

    if finished {
        let current = controller.state();
        if current.is_running() {
            // Compare-exchange inside: if a concurrent command moved the
            // state first, the post-experiment hook is not re-run.
            let _ = controller.finish_experiment_from(current);
        }
    }
}

/// Lock-free state poll, split out so the batch loop reads naturally.
fn controller_is_running(controller: &ExperimentController) -> bool {
    controller.state().is_running()
}

/// Engine steps to run this iteration: the configured batch size when
/// fast-forwarding, otherwise one.
fn frames_for(controller: &ExperimentController) -> u64 {
    if controller.state() == arenaviz_types::ExperimentState::FastForwarding {
        controller.frames_per_broadcast()
    } else {
        1
    }
}

/// Advisory tick pacing: sleep out the remainder of the budget, or log
/// the overrun and carry on with a fresh window.
fn pace(controller: &ExperimentController) {
    let budget = controller.tick_budget();
    let elapsed = controller.stop_pacing_timer();

    if elapsed < budget {
        std::thread::sleep(budget.saturating_sub(elapsed));
    } else {
        warn!(
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            "clock tick took longer than expected, recovering in next cycle"
        );
    }

    controller.start_pacing_timer();
}
