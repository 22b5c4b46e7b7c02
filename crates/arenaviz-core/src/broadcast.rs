//! The broadcast pipeline: three producer buffers, a client registry, and
//! the periodic loop that flushes them to subscribers.
//!
//! The [`Broadcaster`] exclusively owns its buffers; producers (the
//! controller, the log sink) only ever call the public enqueue methods,
//! so lock scope stays inside this module:
//!
//! - **Snapshot slot** -- one string, last write wins. Broadcasting every
//!   intermediate state would either block the step loop on slow network
//!   I/O or grow a queue without bound; collapsing to "most recent state"
//!   trades perfect delivery for bounded memory and decoupled pacing.
//! - **Event queue** -- true FIFO, one entry per lifecycle transition,
//!   drained fully each period (never dropped, never reordered).
//! - **Log queue** -- true FIFO, drained fully each period and fused into
//!   a single batch message.
//!
//! Each buffer has its own mutex; no two are ever held at once, and all
//! fan-out happens after every buffer lock is released. Fan-out itself
//! never touches a socket: a websocket handle may only be written from
//! the task that owns it, so each registered client is a mailbox sender
//! whose receiving end lives in that client's I/O task.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arenaviz_types::{EventMessage, ExperimentState, LogBatch, LogRecord, Topic};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::timer::Timer;

/// An outbound frame addressed to one topic.
///
/// The payload is shared, not cloned, across the fan-out to N clients.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// The topic this frame belongs to.
    pub topic: Topic,
    /// Serialized message body.
    pub payload: std::sync::Arc<str>,
}

/// One registered client: its subscriptions and its mailbox.
#[derive(Debug)]
struct ClientHandle {
    topics: HashSet<Topic>,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

/// Everything drained in one broadcast period.
#[derive(Debug)]
pub struct BroadcastCycle {
    /// The current snapshot, if one has ever been produced.
    pub snapshot: Option<String>,
    /// All queued lifecycle events, oldest first.
    pub events: Vec<String>,
    /// The fused log batch, if any records were queued.
    pub log_batch: Option<String>,
}

impl BroadcastCycle {
    /// Convert the drained buffers into topic-addressed frames.
    fn into_frames(self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        if let Some(snapshot) = self.snapshot {
            frames.push(OutboundFrame {
                topic: Topic::Broadcasts,
                payload: snapshot.into(),
            });
        }
        for event in self.events {
            frames.push(OutboundFrame {
                topic: Topic::Events,
                payload: event.into(),
            });
        }
        if let Some(batch) = self.log_batch {
            frames.push(OutboundFrame {
                topic: Topic::Logs,
                payload: batch.into(),
            });
        }
        frames
    }
}

/// Owner of the broadcast buffers and the client registry.
#[derive(Debug, Default)]
pub struct Broadcaster {
    snapshot: Mutex<String>,
    events: Mutex<VecDeque<String>>,
    logs: Mutex<VecDeque<LogRecord>>,
    clients: Mutex<HashMap<u64, ClientHandle>>,
    next_client_id: AtomicU64,
    current_step: AtomicU64,
}

/// Recover the guard from a poisoned mutex.
///
/// Producers never panic while holding these locks (the workspace denies
/// panics), so poisoning only arises from a panicking test thread; the
/// buffers remain structurally valid either way.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Broadcaster {
    /// Create a broadcaster with empty buffers and no clients.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Producer API
    // -----------------------------------------------------------------------

    /// Replace the broadcast snapshot.
    ///
    /// The previous value is discarded even if it was never sent; slow
    /// broadcasters see the latest state, not every state.
    pub fn push_snapshot(&self, snapshot: String) {
        let mut slot = lock_unpoisoned(&self.snapshot);
        *slot = snapshot;
    }

    /// Queue a lifecycle event for delivery on the `events` topic.
    pub fn push_event(&self, event: &str, state: ExperimentState) {
        match serde_json::to_string(&EventMessage::new(event, state)) {
            Ok(json) => {
                let mut queue = lock_unpoisoned(&self.events);
                queue.push_back(json);
            }
            Err(e) => warn!(event, error = %e, "failed to serialize lifecycle event"),
        }
    }

    /// Queue a log record for delivery on the `logs` topic.
    ///
    /// Empty messages are dropped. The record is stamped with the step
    /// counter of the most recent snapshot. This method must stay silent:
    /// it is called from the tracing pipeline itself.
    pub fn push_log(&self, log_type: &str, message: &str) {
        if message.is_empty() {
            return;
        }
        let record = LogRecord {
            log_type: String::from(log_type),
            log_message: String::from(message),
            step: self.current_step.load(Ordering::Acquire),
        };
        let mut queue = lock_unpoisoned(&self.logs);
        queue.push_back(record);
    }

    /// Record the engine step counter log records should be stamped with.
    pub fn set_current_step(&self, step: u64) {
        self.current_step.store(step, Ordering::Release);
    }

    /// The step counter log records are currently stamped with.
    pub fn current_step(&self) -> u64 {
        self.current_step.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Client registry
    // -----------------------------------------------------------------------

    /// Register a client with its topic subscriptions.
    ///
    /// Returns the client id and the mailbox receiver; the caller's I/O
    /// task owns the receiver and is the only place the client's socket
    /// is written.
    pub fn register_client(
        &self,
        topics: HashSet<Topic>,
    ) -> (u64, mpsc::UnboundedReceiver<OutboundFrame>) {
        let id = self.next_client_id.fetch_add(1, Ordering::AcqRel);
        let (sender, receiver) = mpsc::unbounded_channel();
        let total = {
            let mut clients = lock_unpoisoned(&self.clients);
            clients.insert(id, ClientHandle { topics, sender });
            clients.len()
        };
        info!(client_id = id, total, "client connected");
        (id, receiver)
    }

    /// Remove a client on disconnect.
    pub fn unregister_client(&self, id: u64) {
        let total = {
            let mut clients = lock_unpoisoned(&self.clients);
            clients.remove(&id);
            clients.len()
        };
        info!(client_id = id, total, "client disconnected");
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> usize {
        lock_unpoisoned(&self.clients).len()
    }

    // -----------------------------------------------------------------------
    // Broadcast cycle
    // -----------------------------------------------------------------------

    /// Drain the buffers for one broadcast period.
    ///
    /// The snapshot read is non-destructive; events and logs are consumed.
    /// Each buffer lock is taken on its own and released before the next.
    pub fn drain_cycle(&self) -> BroadcastCycle {
        let snapshot = {
            let slot = lock_unpoisoned(&self.snapshot);
            if slot.is_empty() {
                None
            } else {
                Some(slot.clone())
            }
        };

        let events: Vec<String> = {
            let mut queue = lock_unpoisoned(&self.events);
            queue.drain(..).collect()
        };

        let records: Vec<LogRecord> = {
            let mut queue = lock_unpoisoned(&self.logs);
            queue.drain(..).collect()
        };
        let log_batch = if records.is_empty() {
            None
        } else {
            let batch = LogBatch::new(chrono::Utc::now().timestamp_millis(), records);
            match serde_json::to_string(&batch) {
                Ok(json) => Some(json),
                Err(e) => {
                    warn!(error = %e, "failed to serialize log batch");
                    None
                }
            }
        };

        BroadcastCycle {
            snapshot,
            events,
            log_batch,
        }
    }

    /// Post frames into every subscribed client's mailbox.
    ///
    /// A full or closed mailbox is skipped; the owning I/O task removes
    /// the registration when the connection goes away.
    pub fn fan_out(&self, frames: &[OutboundFrame]) {
        let clients = lock_unpoisoned(&self.clients);
        for handle in clients.values() {
            for frame in frames {
                if handle.topics.contains(&frame.topic) {
                    let _ = handle.sender.send(frame.clone());
                }
            }
        }
    }
}

/// Run the periodic broadcast loop until shutdown or overrun.
///
/// Each period: measure the previous cycle; if it exceeded the period
/// budget the broadcaster cannot keep up and the loop exits (a
/// permanently-behind broadcaster would accumulate unbounded backlog, so
/// it fails closed -- unlike the step loop, whose overruns are advisory).
/// Otherwise sleep out the remainder, drain the buffers, and fan out.
pub fn run_broadcast_loop(broadcaster: &Broadcaster, period: Duration, running: &AtomicBool) {
    let mut timer = Timer::new();
    timer.start();

    while running.load(Ordering::Acquire) {
        timer.stop();
        let elapsed = timer.elapsed();

        if elapsed < period {
            std::thread::sleep(period.saturating_sub(elapsed));
        } else {
            warn!(
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
                "broadcast cycle took longer than its period, stopping the broadcaster; \
                 reduce broadcast_frequency"
            );
            break;
        }

        timer.start();

        let frames = broadcaster.drain_cycle().into_frames();
        if !frames.is_empty() {
            broadcaster.fan_out(&frames);
        }
    }
}
