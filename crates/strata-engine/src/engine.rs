use std::collections::BTreeMap;
use std::sync::Arc;

use strata_executor::{ApplyNotifier, ApplyResult, Executor, NoopNotifier, RefreshResult};
use strata_graph::{Graph, resolve_value};
use strata_plan::{Plan, Planner};
use strata_provider::ProviderRegistry;
use strata_state::StateStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::context::RunContext;
use crate::error::EngineError;
use crate::report::{Preview, RunReport};

/// Reconciles declared graphs against state through providers.
///
/// Every run loads state once, plans, and then applies. The engine itself
/// holds no per-run data: each run builds its own [`RunContext`].
pub struct Engine {
  providers: ProviderRegistry,
  state: Arc<dyn StateStore>,
  config: EngineConfig,
  notifier: Arc<dyn ApplyNotifier>,
}

impl Engine {
  pub fn new(providers: ProviderRegistry, state: Arc<dyn StateStore>, config: EngineConfig) -> Self {
    Self {
      providers,
      state,
      config,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Send apply events to `notifier`.
  pub fn with_notifier(mut self, notifier: Arc<dyn ApplyNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn providers(&self) -> &ProviderRegistry {
    &self.providers
  }

  /// Load state and bundle it with `graph` for a new run.
  pub async fn context(&self, graph: Graph) -> Result<RunContext, EngineError> {
    let prior = self.state.load().await?;
    Ok(RunContext::new(graph, prior, self.config.clone()))
  }

  /// Diff the context's graph against its prior state.
  pub fn plan(&self, ctx: &RunContext) -> Result<Plan, EngineError> {
    Ok(Planner::new(&self.providers).plan(&ctx.graph, &ctx.prior)?)
  }

  /// Compute the plan for `graph` without executing it.
  #[instrument(name = "engine_preview", skip_all, fields(nodes = graph.len()))]
  pub async fn preview(&self, graph: Graph) -> Result<Preview, EngineError> {
    let ctx = self.context(graph).await?;
    let plan = self.plan(&ctx)?;
    let summary = plan.summary();
    info!(run_id = %ctx.run_id, summary = %summary, "preview_planned");
    Ok(Preview {
      run_id: ctx.run_id,
      plan,
      summary,
    })
  }

  /// Bring the provider side in line with `graph`.
  #[instrument(name = "engine_up", skip_all, fields(nodes = graph.len()))]
  pub async fn up(&self, graph: Graph, cancel: CancellationToken) -> Result<RunReport, EngineError> {
    let ctx = self.context(graph).await?;
    self.run(&ctx, cancel).await
  }

  /// Delete every resource recorded in state.
  #[instrument(name = "engine_destroy", skip_all)]
  pub async fn destroy(&self, cancel: CancellationToken) -> Result<RunReport, EngineError> {
    let ctx = self.context(Graph::empty()).await?;
    self.run(&ctx, cancel).await
  }

  /// Plan and apply a prepared context.
  #[instrument(name = "engine_run", skip_all, fields(run_id = %ctx.run_id))]
  pub async fn run(&self, ctx: &RunContext, cancel: CancellationToken) -> Result<RunReport, EngineError> {
    let plan = self.plan(ctx)?;
    let summary = plan.summary();
    info!(run_id = %ctx.run_id, summary = %summary, "plan_ready");

    let apply = self.executor(ctx).apply_as(&ctx.run_id, &plan, cancel).await;
    let (outputs, unresolved_outputs) = resolve_outputs(&ctx.graph, &apply);
    if !unresolved_outputs.is_empty() {
      warn!(run_id = %ctx.run_id, unresolved = ?unresolved_outputs, "outputs_unresolved");
    }

    Ok(RunReport {
      run_id: ctx.run_id.clone(),
      summary,
      apply,
      outputs,
      unresolved_outputs,
    })
  }

  /// Read every recorded resource back and reconcile drift into state.
  #[instrument(name = "engine_refresh", skip_all)]
  pub async fn refresh(&self, cancel: CancellationToken) -> Result<RefreshResult, EngineError> {
    let ctx = self.context(Graph::empty()).await?;
    Ok(self.executor(&ctx).refresh(&ctx.prior, cancel).await)
  }

  fn executor(&self, ctx: &RunContext) -> Executor {
    Executor::new(
      self.providers.clone(),
      self.state.clone(),
      ctx.config.executor.clone(),
    )
    .with_notifier(self.notifier.clone())
  }
}

/// Evaluate stack outputs against the outputs of resources that succeeded.
fn resolve_outputs(
  graph: &Graph,
  apply: &ApplyResult,
) -> (BTreeMap<String, serde_json::Value>, Vec<String>) {
  let known = apply.outputs();
  let mut resolved = BTreeMap::new();
  let mut unresolved = Vec::new();

  for (name, value) in graph.outputs() {
    match resolve_value(value, &known) {
      Ok(v) => {
        resolved.insert(name.clone(), v);
      }
      Err(_) => unresolved.push(name.clone()),
    }
  }
  (resolved, unresolved)
}
