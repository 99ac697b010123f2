//! Apply events and notifiers for observability.
//!
//! Events are emitted while a plan is applied so that consumers can follow
//! progress, stream it to a UI, or collect it in tests.

use serde::Serialize;
use strata_config::ResourceId;
use strata_plan::Operation;
use tokio::sync::mpsc;

use crate::result::{RunStatus, SkipReason};

/// Events emitted during an apply run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ApplyEvent {
  RunStarted {
    run_id: String,
    entries: usize,
    dry_run: bool,
  },

  EntryStarted {
    run_id: String,
    id: ResourceId,
    operation: Operation,
  },

  /// A transient provider failure will be retried.
  EntryRetrying {
    run_id: String,
    id: ResourceId,
    attempt: u32,
    error: String,
  },

  EntrySucceeded {
    run_id: String,
    id: ResourceId,
    operation: Operation,
  },

  EntryFailed {
    run_id: String,
    id: ResourceId,
    operation: Operation,
    error: String,
  },

  EntrySkipped {
    run_id: String,
    id: ResourceId,
    operation: Operation,
    reason: SkipReason,
  },

  RunFinished { run_id: String, status: RunStatus },
}

/// Trait for receiving apply events.
///
/// The executor calls `notify` for each event. Implementations decide what to
/// do with them.
pub trait ApplyNotifier: Send + Sync {
  fn notify(&self, event: ApplyEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ApplyNotifier for NoopNotifier {
  fn notify(&self, _event: ApplyEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls the executor. Volume is a handful
/// of events per plan entry.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ApplyEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ApplyEvent>) -> Self {
    Self { sender }
  }
}

impl ApplyNotifier for ChannelNotifier {
  fn notify(&self, event: ApplyEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
