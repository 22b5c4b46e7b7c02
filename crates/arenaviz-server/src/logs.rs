//! Tracing layer that feeds server logs to connected clients.
//!
//! The original design streams the simulator's log output to the
//! dashboard over the `logs` topic. Here that interception is a
//! [`tracing_subscriber::Layer`]: every event's message is captured and
//! queued on the broadcaster, which fuses pending records into one batch
//! per broadcast period.
//!
//! Warnings and errors are tagged `LOGERR`, everything else `LOG`,
//! mirroring the two output streams clients already distinguish.

use std::sync::Arc;

use arenaviz_core::broadcast::Broadcaster;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// A layer that copies every event's message into the broadcast log
/// queue.
#[derive(Debug, Clone)]
pub struct BroadcastLogLayer {
    broadcaster: Arc<Broadcaster>,
}

impl BroadcastLogLayer {
    /// Create a layer feeding the given broadcaster.
    pub const fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl<S: Subscriber> Layer<S> for BroadcastLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if visitor.message.is_empty() {
            return;
        }

        // Level ordering: ERROR < WARN < INFO < DEBUG < TRACE.
        let source = if *event.metadata().level() <= Level::WARN {
            "LOGERR"
        } else {
            "LOG"
        };
        // push_log never emits tracing events itself, so this cannot
        // recurse.
        self.broadcaster.push_log(source, &visitor.message);
    }
}

/// Field visitor that extracts the conventional `message` field.
#[derive(Debug, Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            use std::fmt::Write as _;
            let _ = write!(self.message, "{value:?}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arenaviz_types::LogBatch;
    use tracing_subscriber::layer::SubscriberExt as _;

    fn with_layer(f: impl FnOnce()) -> Arc<Broadcaster> {
        let broadcaster = Arc::new(Broadcaster::new());
        let subscriber = tracing_subscriber::registry()
            .with(BroadcastLogLayer::new(Arc::clone(&broadcaster)));
        tracing::subscriber::with_default(subscriber, f);
        broadcaster
    }

    #[test]
    fn info_events_are_tagged_log() {
        let broadcaster = with_layer(|| {
            tracing::info!("Experiment playing");
        });

        let batch: LogBatch =
            serde_json::from_str(&broadcaster.drain_cycle().log_batch.unwrap()).unwrap();
        let record = batch.messages.first().unwrap();
        assert_eq!(record.log_type, "LOG");
        assert_eq!(record.log_message, "Experiment playing");
    }

    #[test]
    fn warnings_and_errors_are_tagged_logerr() {
        let broadcaster = with_layer(|| {
            tracing::warn!("clock tick took longer than expected");
            tracing::error!("no entity found with id: ghost");
        });

        let batch: LogBatch =
            serde_json::from_str(&broadcaster.drain_cycle().log_batch.unwrap()).unwrap();
        assert_eq!(batch.messages.len(), 2);
        assert!(batch.messages.iter().all(|r| r.log_type == "LOGERR"));
    }

    #[test]
    fn records_carry_the_current_step() {
        let broadcaster = with_layer(|| {
            tracing::info!("before any step");
        });
        broadcaster.set_current_step(12);
        // Records queued before the stamp keep step 0; new ones pick up 12.
        let subscriber = tracing_subscriber::registry()
            .with(BroadcastLogLayer::new(Arc::clone(&broadcaster)));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("after step 12");
        });

        let batch: LogBatch =
            serde_json::from_str(&broadcaster.drain_cycle().log_batch.unwrap()).unwrap();
        assert_eq!(batch.messages.first().unwrap().step, 0);
        assert_eq!(batch.messages.last().unwrap().step, 12);
    }

    #[test]
    fn events_without_a_message_are_dropped() {
        let broadcaster = with_layer(|| {
            tracing::info!(count = 3);
        });
        assert!(broadcaster.drain_cycle().log_batch.is_none());
    }
}
