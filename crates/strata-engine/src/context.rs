use strata_config::{StackConfig, StackDef};
use strata_graph::{Graph, GraphBuilder};
use strata_state::PriorState;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Everything one run needs, passed explicitly from step to step.
#[derive(Debug, Clone)]
pub struct RunContext {
  pub run_id: String,
  pub graph: Graph,
  /// State as loaded at the start of the run.
  pub prior: PriorState,
  pub config: EngineConfig,
}

impl RunContext {
  pub fn new(graph: Graph, prior: PriorState, config: EngineConfig) -> Self {
    Self {
      run_id: uuid::Uuid::new_v4().to_string(),
      graph,
      prior,
      config,
    }
  }
}

/// Load a stack declaration into a finalized graph.
pub fn load_stack(def: StackDef, config: StackConfig) -> Result<Graph, EngineError> {
  Ok(GraphBuilder::from_stack(def, config)?.finalize()?)
}
