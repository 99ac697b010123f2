use std::collections::BTreeMap;

use strata_executor::{ApplyResult, RunStatus};
use strata_plan::{Plan, PlanSummary};

/// A plan computed without executing anything.
#[derive(Debug, Clone)]
pub struct Preview {
  pub run_id: String,
  pub plan: Plan,
  pub summary: PlanSummary,
}

/// Result of an `up` or `destroy` run.
#[derive(Debug)]
pub struct RunReport {
  pub run_id: String,
  pub summary: PlanSummary,
  pub apply: ApplyResult,
  /// Stack outputs whose sources are all available.
  pub outputs: BTreeMap<String, serde_json::Value>,
  /// Stack outputs that could not be evaluated, because a resource they read
  /// from failed, was skipped, or was not applied.
  pub unresolved_outputs: Vec<String>,
}

impl RunReport {
  pub fn status(&self) -> RunStatus {
    self.apply.status
  }

  pub fn is_success(&self) -> bool {
    self.apply.status == RunStatus::Succeeded
  }
}
