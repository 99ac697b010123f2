//! Engine error types.

use strata_config::ConfigError;
use strata_graph::GraphError;
use strata_plan::PlanError;
use strata_state::StateError;

/// Errors that abort a run before or around execution.
///
/// Per-resource failures during apply are not errors here; they are reported
/// in the run's [`ApplyResult`](strata_executor::ApplyResult).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),

  #[error("invalid resource graph: {0}")]
  Graph(#[from] GraphError),

  #[error("planning failed: {0}")]
  Plan(#[from] PlanError),

  #[error("state store error: {0}")]
  State(#[from] StateError),
}
