//! Plan executor.
//!
//! The [`Executor`] walks a [`Plan`] in dependency order. Entries whose
//! dependencies have all succeeded are spawned as tokio tasks, up to
//! `max_concurrency` at a time. References in an entry's properties are
//! evaluated right before it is spawned, against the outputs known so far.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use strata_config::ResourceId;
use strata_graph::{Outputs, ResourceNode, resolve_properties};
use strata_plan::{Operation, Plan, PlanEntry};
use strata_provider::{Provider, ProviderError, ProviderRegistry};
use strata_state::{StateRecord, StateStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{ExecutorConfig, RetryPolicy};
use crate::error::ExecutorError;
use crate::events::{ApplyEvent, ApplyNotifier, NoopNotifier};
use crate::result::{ApplyResult, EntryOutcome, EntryResult, SkipReason, run_status};
use crate::retry::{CallSite, with_retry};

/// Applies plans through providers and records the results in a state store.
pub struct Executor {
  providers: ProviderRegistry,
  state: Arc<dyn StateStore>,
  config: ExecutorConfig,
  notifier: Arc<dyn ApplyNotifier>,
}

impl Executor {
  pub fn new(providers: ProviderRegistry, state: Arc<dyn StateStore>, config: ExecutorConfig) -> Self {
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

  pub fn config(&self) -> &ExecutorConfig {
    &self.config
  }

  pub(crate) fn providers(&self) -> &ProviderRegistry {
    &self.providers
  }

  pub(crate) fn state(&self) -> &Arc<dyn StateStore> {
    &self.state
  }

  /// Apply `plan` under a fresh run id.
  pub async fn apply(&self, plan: &Plan, cancel: CancellationToken) -> ApplyResult {
    let run_id = uuid::Uuid::new_v4().to_string();
    self.apply_as(&run_id, plan, cancel).await
  }

  /// Apply `plan` under the caller's run id.
  #[instrument(
    name = "executor_apply",
    skip(self, plan, cancel),
    fields(run_id = %run_id, entries = plan.len(), dry_run = self.config.dry_run)
  )]
  pub async fn apply_as(&self, run_id: &str, plan: &Plan, cancel: CancellationToken) -> ApplyResult {
    info!(run_id = %run_id, entries = plan.len(), "run_started");
    self.notifier.notify(ApplyEvent::RunStarted {
      run_id: run_id.to_string(),
      entries: plan.len(),
      dry_run: self.config.dry_run,
    });

    let result = if self.config.dry_run {
      self.preview(run_id, plan)
    } else {
      self.execute(run_id, plan, &cancel).await
    };

    info!(
      run_id = %run_id,
      status = %result.status,
      succeeded = result.succeeded().count(),
      failed = result.failed().count(),
      skipped = result.skipped().count(),
      "run_finished"
    );
    self.notifier.notify(ApplyEvent::RunFinished {
      run_id: run_id.to_string(),
      status: result.status,
    });
    result
  }

  /// Report the plan without calling providers or writing state.
  fn preview(&self, run_id: &str, plan: &Plan) -> ApplyResult {
    let entries = plan
      .entries()
      .iter()
      .map(|entry| {
        let outcome = match (&entry.operation, &entry.prior) {
          (Operation::NoOp, Some(prior)) => EntryOutcome::Succeeded {
            outputs: prior.outputs.clone(),
          },
          _ => EntryOutcome::Skipped {
            reason: SkipReason::DryRun,
          },
        };
        self.report(run_id, entry, &outcome);
        EntryResult {
          id: entry.id.clone(),
          operation: entry.operation,
          outcome,
          attempts: 0,
        }
      })
      .collect::<Vec<_>>();

    ApplyResult {
      run_id: run_id.to_string(),
      status: run_status(&entries, false),
      entries,
    }
  }

  async fn execute(&self, run_id: &str, plan: &Plan, cancel: &CancellationToken) -> ApplyResult {
    let entries = plan.entries();
    let mut schedule = Schedule::new(entries);
    let max_concurrency = self.config.max_concurrency.max(1);

    // Resources untouched by this run keep the outputs recorded in state.
    let mut known: HashMap<ResourceId, Outputs> = entries
      .iter()
      .filter_map(|e| Some((e.id.clone(), e.prior.as_ref()?.outputs.clone())))
      .collect();

    let mut in_flight = FuturesUnordered::new();

    loop {
      while in_flight.len() < max_concurrency && !cancel.is_cancelled() {
        let Some(index) = schedule.next_ready() else {
          break;
        };
        let entry = &entries[index];

        if let Some(dependency) = schedule.unsatisfied_dependency(entry) {
          let outcome = EntryOutcome::Skipped {
            reason: SkipReason::DependencyFailed { dependency },
          };
          self.report(run_id, entry, &outcome);
          schedule.complete(index, outcome, 0);
          continue;
        }

        match self.prepare(run_id, entry, &known, cancel) {
          Ok(job) => {
            info!(run_id = %run_id, node_id = %entry.id, operation = %entry.operation, "entry_started");
            self.notifier.notify(ApplyEvent::EntryStarted {
              run_id: run_id.to_string(),
              id: entry.id.clone(),
              operation: entry.operation,
            });
            let handle = tokio::spawn(job.run());
            in_flight.push(async move { (index, handle.await) });
          }
          Err(error) => {
            let outcome = EntryOutcome::Failed { error };
            self.report(run_id, entry, &outcome);
            schedule.complete(index, outcome, 0);
          }
        }
      }

      let Some((index, joined)) = in_flight.next().await else {
        break;
      };
      let entry = &entries[index];
      let (outcome, attempts) = joined.unwrap_or_else(|e| {
        let error = ExecutorError::Join {
          message: e.to_string(),
        };
        (EntryOutcome::Failed { error }, 0)
      });

      if let EntryOutcome::Succeeded { outputs } = &outcome {
        if entry.operation == Operation::Delete {
          known.remove(&entry.id);
        } else {
          known.insert(entry.id.clone(), outputs.clone());
        }
      }
      self.report(run_id, entry, &outcome);
      schedule.complete(index, outcome, attempts);
    }

    let cancelled = schedule.has_unscheduled();
    if cancelled {
      warn!(run_id = %run_id, "run_cancelled");
    }

    let results = schedule
      .into_outcomes()
      .into_iter()
      .zip(entries)
      .map(|(slot, entry)| {
        let (outcome, attempts) = slot.unwrap_or_else(|| {
          let outcome = EntryOutcome::Skipped {
            reason: SkipReason::Cancelled,
          };
          self.report(run_id, entry, &outcome);
          (outcome, 0)
        });
        EntryResult {
          id: entry.id.clone(),
          operation: entry.operation,
          outcome,
          attempts,
        }
      })
      .collect::<Vec<_>>();

    ApplyResult {
      run_id: run_id.to_string(),
      status: run_status(&results, cancelled),
      entries: results,
    }
  }

  /// Resolve providers and inputs for an entry whose dependencies succeeded.
  fn prepare(
    &self,
    run_id: &str,
    entry: &PlanEntry,
    known: &HashMap<ResourceId, Outputs>,
    cancel: &CancellationToken,
  ) -> Result<Job, ExecutorError> {
    let provider = |tag: &str| {
      self
        .providers
        .get(tag)
        .ok_or_else(|| ExecutorError::UnknownProvider {
          provider: tag.to_string(),
        })
    };
    let prior = || {
      entry
        .prior
        .clone()
        .ok_or_else(|| ExecutorError::InvalidEntry {
          message: format!("{} of {} has no state record", entry.operation, entry.id),
        })
    };
    let node = || {
      entry
        .node
        .clone()
        .ok_or_else(|| ExecutorError::InvalidEntry {
          message: format!("{} of {} has no declaration", entry.operation, entry.id),
        })
    };

    let action = match entry.operation {
      Operation::Create => {
        let node = node()?;
        Action::Create {
          provider: provider(&node.provider)?,
          inputs: resolve_properties(&node.properties, known)?,
          node,
        }
      }
      Operation::Update => {
        let node = node()?;
        Action::Update {
          provider: provider(&node.provider)?,
          inputs: resolve_properties(&node.properties, known)?,
          node,
          prior: prior()?,
        }
      }
      Operation::Replace => {
        let node = node()?;
        let prior = prior()?;
        Action::Replace {
          old_provider: provider(&prior.provider)?,
          provider: provider(&node.provider)?,
          inputs: resolve_properties(&node.properties, known)?,
          node,
          prior,
        }
      }
      Operation::Delete => {
        let prior = prior()?;
        Action::Delete {
          provider: provider(&prior.provider)?,
          prior,
        }
      }
      Operation::NoOp => Action::Keep {
        node: node()?,
        prior: prior()?,
      },
    };

    Ok(Job {
      run_id: run_id.to_string(),
      id: entry.id.clone(),
      operation: entry.operation,
      action,
      state: self.state.clone(),
      retry: self.config.retry.clone(),
      notifier: self.notifier.clone(),
      cancel: cancel.clone(),
    })
  }

  /// Log and notify a terminal outcome.
  fn report(&self, run_id: &str, entry: &PlanEntry, outcome: &EntryOutcome) {
    let run_id = run_id.to_string();
    let id = entry.id.clone();
    let operation = entry.operation;

    match outcome {
      EntryOutcome::Succeeded { .. } => {
        info!(run_id = %run_id, node_id = %id, operation = %operation, "entry_succeeded");
        self.notifier.notify(ApplyEvent::EntrySucceeded {
          run_id,
          id,
          operation,
        });
      }
      EntryOutcome::Failed { error } => {
        error!(run_id = %run_id, node_id = %id, operation = %operation, error = %error, "entry_failed");
        self.notifier.notify(ApplyEvent::EntryFailed {
          run_id,
          id,
          operation,
          error: error.to_string(),
        });
      }
      EntryOutcome::Skipped { reason } => {
        warn!(run_id = %run_id, node_id = %id, operation = %operation, reason = %reason, "entry_skipped");
        self.notifier.notify(ApplyEvent::EntrySkipped {
          run_id,
          id,
          operation,
          reason: reason.clone(),
        });
      }
    }
  }
}

/// Dependency bookkeeping for one run.
struct Schedule {
  index: HashMap<ResourceId, usize>,
  /// Unfinished in-plan dependencies per entry.
  waiting: Vec<usize>,
  dependents: Vec<Vec<usize>>,
  /// Entries whose dependencies are all terminal, lowest plan position first.
  ready: BTreeSet<usize>,
  outcomes: Vec<Option<(EntryOutcome, u32)>>,
}

impl Schedule {
  fn new(entries: &[PlanEntry]) -> Self {
    let index: HashMap<ResourceId, usize> = entries
      .iter()
      .enumerate()
      .map(|(i, e)| (e.id.clone(), i))
      .collect();

    let mut waiting = vec![0; entries.len()];
    let mut dependents = vec![Vec::new(); entries.len()];
    for (i, entry) in entries.iter().enumerate() {
      for dep in &entry.depends_on {
        // Dependencies outside the plan are already in their final state.
        if let Some(&j) = index.get(dep) {
          waiting[i] += 1;
          dependents[j].push(i);
        }
      }
    }

    let ready = (0..entries.len()).filter(|&i| waiting[i] == 0).collect();
    Self {
      index,
      waiting,
      dependents,
      ready,
      outcomes: (0..entries.len()).map(|_| None).collect(),
    }
  }

  fn next_ready(&mut self) -> Option<usize> {
    self.ready.pop_first()
  }

  /// First in-plan dependency of `entry` that did not succeed.
  fn unsatisfied_dependency(&self, entry: &PlanEntry) -> Option<ResourceId> {
    entry
      .depends_on
      .iter()
      .find(|dep| {
        self.index.get(*dep).is_some_and(|&j| {
          !matches!(&self.outcomes[j], Some((outcome, _)) if outcome.is_succeeded())
        })
      })
      .cloned()
  }

  fn complete(&mut self, index: usize, outcome: EntryOutcome, attempts: u32) {
    self.outcomes[index] = Some((outcome, attempts));
    for &dependent in &self.dependents[index] {
      self.waiting[dependent] -= 1;
      if self.waiting[dependent] == 0 {
        self.ready.insert(dependent);
      }
    }
  }

  fn has_unscheduled(&self) -> bool {
    self.outcomes.iter().any(Option::is_none)
  }

  fn into_outcomes(self) -> Vec<Option<(EntryOutcome, u32)>> {
    self.outcomes
  }
}

/// What a job does, with everything it needs resolved up front.
enum Action {
  Create {
    node: ResourceNode,
    provider: Arc<dyn Provider>,
    inputs: Outputs,
  },
  Update {
    node: ResourceNode,
    prior: StateRecord,
    provider: Arc<dyn Provider>,
    inputs: Outputs,
  },
  Replace {
    node: ResourceNode,
    prior: StateRecord,
    old_provider: Arc<dyn Provider>,
    provider: Arc<dyn Provider>,
    inputs: Outputs,
  },
  Delete {
    prior: StateRecord,
    provider: Arc<dyn Provider>,
  },
  Keep {
    node: ResourceNode,
    prior: StateRecord,
  },
}

/// One plan entry, ready to run on its own task.
struct Job {
  run_id: String,
  id: ResourceId,
  operation: Operation,
  action: Action,
  state: Arc<dyn StateStore>,
  retry: RetryPolicy,
  notifier: Arc<dyn ApplyNotifier>,
  cancel: CancellationToken,
}

impl Job {
  #[instrument(
    name = "apply_entry",
    skip(self),
    fields(run_id = %self.run_id, node_id = %self.id, operation = %self.operation)
  )]
  async fn run(self) -> (EntryOutcome, u32) {
    let mut attempts = 0;
    let outcome = match self.execute(&mut attempts).await {
      Ok(outputs) => EntryOutcome::Succeeded { outputs },
      Err(error) => EntryOutcome::Failed { error },
    };
    (outcome, attempts)
  }

  async fn execute(&self, attempts: &mut u32) -> Result<Outputs, ExecutorError> {
    match &self.action {
      Action::Create {
        node,
        provider,
        inputs,
      } => self.create(node, provider.as_ref(), inputs, attempts).await,
      Action::Update {
        node,
        prior,
        provider,
        inputs,
      } => {
        let provider = provider.as_ref();
        let outputs = with_retry(&self.retry, &self.cancel, &self.site(), attempts, || {
          provider.update(&node.id.resource_type, &prior.provider_id, inputs)
        })
        .await?;
        let record = new_record(node, prior.provider_id.clone(), inputs, &outputs);
        self.state.commit(&self.id, &record).await?;
        Ok(outputs)
      }
      Action::Replace {
        node,
        prior,
        old_provider,
        provider,
        inputs,
      } => {
        self.delete(prior, old_provider.as_ref(), attempts).await?;
        self.create(node, provider.as_ref(), inputs, attempts).await
      }
      Action::Delete { prior, provider } => {
        self.delete(prior, provider.as_ref(), attempts).await?;
        Ok(Outputs::new())
      }
      Action::Keep { node, prior } => {
        // Bookkeeping fields can drift without any provider-visible change.
        let dependencies = node.dependencies();
        if prior.dependencies != dependencies || prior.protect != node.options.protect {
          let record = StateRecord {
            dependencies,
            protect: node.options.protect,
            updated_at: Utc::now(),
            ..prior.clone()
          };
          self.state.commit(&self.id, &record).await?;
        }
        Ok(prior.outputs.clone())
      }
    }
  }

  async fn create(
    &self,
    node: &ResourceNode,
    provider: &dyn Provider,
    inputs: &Outputs,
    attempts: &mut u32,
  ) -> Result<Outputs, ExecutorError> {
    let created = with_retry(&self.retry, &self.cancel, &self.site(), attempts, || {
      provider.create(&node.id.resource_type, inputs)
    })
    .await?;
    let record = new_record(node, created.provider_id, inputs, &created.outputs);
    self.state.commit(&self.id, &record).await?;
    Ok(created.outputs)
  }

  /// Delete the recorded resource and drop its record. A resource that is
  /// already gone counts as deleted.
  async fn delete(
    &self,
    prior: &StateRecord,
    provider: &dyn Provider,
    attempts: &mut u32,
  ) -> Result<(), ExecutorError> {
    let result = with_retry(&self.retry, &self.cancel, &self.site(), attempts, || {
      provider.delete(&prior.resource_type, &prior.provider_id)
    })
    .await;

    match result {
      Ok(()) => {}
      Err(ExecutorError::Provider {
        source: ProviderError::NotFound { .. },
        ..
      }) => {
        warn!(node_id = %self.id, provider_id = %prior.provider_id, "resource_already_deleted");
      }
      Err(e) => return Err(e),
    }
    self.state.remove(&self.id).await?;
    Ok(())
  }

  fn site(&self) -> CallSite<'_> {
    CallSite {
      run_id: &self.run_id,
      id: &self.id,
      notifier: self.notifier.as_ref(),
    }
  }
}

fn new_record(
  node: &ResourceNode,
  provider_id: String,
  inputs: &Outputs,
  outputs: &Outputs,
) -> StateRecord {
  StateRecord {
    provider_id,
    resource_type: node.id.resource_type.clone(),
    provider: node.provider.clone(),
    properties: node.properties.clone(),
    inputs: inputs.clone(),
    outputs: outputs.clone(),
    dependencies: node.dependencies(),
    protect: node.options.protect,
    updated_at: Utc::now(),
  }
}
