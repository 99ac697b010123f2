//! Apply result types.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strata_config::ResourceId;
use strata_graph::Outputs;
use strata_plan::Operation;

use crate::error::ExecutorError;

/// Why an entry was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  /// A dependency in the same plan failed or was itself skipped.
  DependencyFailed { dependency: ResourceId },
  /// Cancellation fired before the entry was scheduled.
  Cancelled,
  /// The run was a dry run and the entry would change a resource.
  DryRun,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::DependencyFailed { dependency } => write!(f, "dependency {} failed", dependency),
      Self::Cancelled => f.write_str("cancelled"),
      Self::DryRun => f.write_str("dry run"),
    }
  }
}

/// Terminal outcome of one plan entry.
#[derive(Debug)]
pub enum EntryOutcome {
  /// Outputs of the resource after the operation. Empty for deletes.
  Succeeded { outputs: Outputs },
  Failed { error: ExecutorError },
  Skipped { reason: SkipReason },
}

impl EntryOutcome {
  pub fn is_succeeded(&self) -> bool {
    matches!(self, Self::Succeeded { .. })
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, Self::Failed { .. })
  }

  pub fn is_skipped(&self) -> bool {
    matches!(self, Self::Skipped { .. })
  }

  pub fn outputs(&self) -> Option<&Outputs> {
    match self {
      Self::Succeeded { outputs } => Some(outputs),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ExecutorError> {
    match self {
      Self::Failed { error } => Some(error),
      _ => None,
    }
  }

  pub fn skip_reason(&self) -> Option<&SkipReason> {
    match self {
      Self::Skipped { reason } => Some(reason),
      _ => None,
    }
  }
}

/// Outcome of a plan entry, with its identity.
#[derive(Debug)]
pub struct EntryResult {
  pub id: ResourceId,
  pub operation: Operation,
  pub outcome: EntryOutcome,
  /// Provider calls made, including retries.
  pub attempts: u32,
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  /// No entry failed or was skipped because of a failure.
  Succeeded,
  /// Some changes were applied and some entries failed or were skipped.
  Partial,
  /// At least one failure and no change was applied.
  Failed,
  /// Cancellation fired before every entry was scheduled.
  Cancelled,
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Succeeded => "succeeded",
      Self::Partial => "partial",
      Self::Failed => "failed",
      Self::Cancelled => "cancelled",
    };
    f.write_str(s)
  }
}

/// Result of applying a plan. One entry result per plan entry, in plan order.
#[derive(Debug)]
pub struct ApplyResult {
  pub run_id: String,
  pub status: RunStatus,
  pub entries: Vec<EntryResult>,
}

impl ApplyResult {
  pub fn get(&self, id: &ResourceId) -> Option<&EntryResult> {
    self.entries.iter().find(|e| &e.id == id)
  }

  pub fn outcome(&self, id: &ResourceId) -> Option<&EntryOutcome> {
    self.get(id).map(|e| &e.outcome)
  }

  pub fn succeeded(&self) -> impl Iterator<Item = &EntryResult> {
    self.entries.iter().filter(|e| e.outcome.is_succeeded())
  }

  pub fn failed(&self) -> impl Iterator<Item = &EntryResult> {
    self.entries.iter().filter(|e| e.outcome.is_failed())
  }

  pub fn skipped(&self) -> impl Iterator<Item = &EntryResult> {
    self.entries.iter().filter(|e| e.outcome.is_skipped())
  }

  /// Outputs of every resource that exists after the run and succeeded.
  pub fn outputs(&self) -> HashMap<ResourceId, Outputs> {
    self
      .entries
      .iter()
      .filter(|e| e.operation != Operation::Delete)
      .filter_map(|e| Some((e.id.clone(), e.outcome.outputs()?.clone())))
      .collect()
  }
}

/// Derive the overall status from entry outcomes.
pub(crate) fn run_status(entries: &[EntryResult], cancelled: bool) -> RunStatus {
  if cancelled {
    return RunStatus::Cancelled;
  }

  let failures = entries.iter().any(|e| match &e.outcome {
    EntryOutcome::Failed { .. } => true,
    EntryOutcome::Skipped { reason } => matches!(reason, SkipReason::DependencyFailed { .. }),
    EntryOutcome::Succeeded { .. } => false,
  });
  if !failures {
    return RunStatus::Succeeded;
  }

  let applied = entries
    .iter()
    .any(|e| e.operation.is_change() && e.outcome.is_succeeded());
  if applied {
    RunStatus::Partial
  } else {
    RunStatus::Failed
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(name: &str, operation: Operation, outcome: EntryOutcome) -> EntryResult {
    EntryResult {
      id: ResourceId::new("test:Thing", name),
      operation,
      outcome,
      attempts: 1,
    }
  }

  fn ok() -> EntryOutcome {
    EntryOutcome::Succeeded {
      outputs: Outputs::new(),
    }
  }

  fn failed() -> EntryOutcome {
    EntryOutcome::Failed {
      error: ExecutorError::Cancelled,
    }
  }

  #[test]
  fn test_run_status() {
    let all_ok = vec![entry("a", Operation::Create, ok())];
    assert_eq!(run_status(&all_ok, false), RunStatus::Succeeded);
    assert_eq!(run_status(&all_ok, true), RunStatus::Cancelled);

    let partial = vec![
      entry("a", Operation::Create, ok()),
      entry("b", Operation::Create, failed()),
    ];
    assert_eq!(run_status(&partial, false), RunStatus::Partial);

    // A no-op success is not a change.
    let failed_only = vec![
      entry("a", Operation::NoOp, ok()),
      entry("b", Operation::Update, failed()),
      entry(
        "c",
        Operation::Create,
        EntryOutcome::Skipped {
          reason: SkipReason::DependencyFailed {
            dependency: ResourceId::new("test:Thing", "b"),
          },
        },
      ),
    ];
    assert_eq!(run_status(&failed_only, false), RunStatus::Failed);

    let dry_run = vec![entry(
      "a",
      Operation::Create,
      EntryOutcome::Skipped {
        reason: SkipReason::DryRun,
      },
    )];
    assert_eq!(run_status(&dry_run, false), RunStatus::Succeeded);
  }
}
