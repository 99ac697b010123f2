//! Drift reconciliation.

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use strata_config::ResourceId;
use strata_provider::ProviderError;
use strata_state::{PriorState, StateRecord};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::ExecutorError;
use crate::events::NoopNotifier;
use crate::executor::Executor;
use crate::retry::{CallSite, with_retry};

/// What a refresh found, per resource. Each list is ordered by resource id.
#[derive(Debug, Default)]
pub struct RefreshResult {
  /// Outputs differed from state and were rewritten.
  pub updated: Vec<ResourceId>,
  pub unchanged: Vec<ResourceId>,
  /// The resource no longer exists and its record was removed.
  pub removed: Vec<ResourceId>,
  pub failed: Vec<(ResourceId, ExecutorError)>,
}

enum Drift {
  Updated,
  Unchanged,
  Removed,
}

impl Executor {
  /// Read every recorded resource back from its provider.
  ///
  /// Records whose outputs changed are rewritten; records whose resource is
  /// gone are removed. In dry-run mode the state store is left untouched.
  #[instrument(name = "executor_refresh", skip_all, fields(records = prior.len()))]
  pub async fn refresh(&self, prior: &PriorState, cancel: CancellationToken) -> RefreshResult {
    let max_concurrency = self.config().max_concurrency.max(1);
    let run_id = uuid::Uuid::new_v4().to_string();

    let results: Vec<(ResourceId, Result<Drift, ExecutorError>)> = stream::iter(prior.iter())
      .map(|(id, record)| {
        let cancel = cancel.clone();
        let run_id = run_id.as_str();
        async move { (id.clone(), self.refresh_one(run_id, id, record, &cancel).await) }
      })
      .buffer_unordered(max_concurrency)
      .collect()
      .await;

    let mut result = RefreshResult::default();
    for (id, drift) in results {
      match drift {
        Ok(Drift::Updated) => result.updated.push(id),
        Ok(Drift::Unchanged) => result.unchanged.push(id),
        Ok(Drift::Removed) => result.removed.push(id),
        Err(error) => {
          warn!(node_id = %id, error = %error, "refresh_failed");
          result.failed.push((id, error));
        }
      }
    }
    result.updated.sort();
    result.unchanged.sort();
    result.removed.sort();
    result.failed.sort_by(|a, b| a.0.cmp(&b.0));

    info!(
      updated = result.updated.len(),
      removed = result.removed.len(),
      failed = result.failed.len(),
      "refresh_finished"
    );
    result
  }

  async fn refresh_one(
    &self,
    run_id: &str,
    id: &ResourceId,
    record: &StateRecord,
    cancel: &CancellationToken,
  ) -> Result<Drift, ExecutorError> {
    if cancel.is_cancelled() {
      return Err(ExecutorError::Cancelled);
    }
    let provider = self
      .providers()
      .get(&record.provider)
      .ok_or_else(|| ExecutorError::UnknownProvider {
        provider: record.provider.clone(),
      })?;
    let provider = provider.as_ref();

    let site = CallSite {
      run_id,
      id,
      notifier: &NoopNotifier,
    };
    let mut attempts = 0;
    let read = with_retry(&self.config().retry, cancel, &site, &mut attempts, || {
      provider.read(&record.resource_type, &record.provider_id)
    })
    .await;
    let dry_run = self.config().dry_run;

    match read {
      Ok(outputs) if outputs == record.outputs => Ok(Drift::Unchanged),
      Ok(outputs) => {
        info!(node_id = %id, "resource_drifted");
        if !dry_run {
          let updated = StateRecord {
            outputs,
            updated_at: Utc::now(),
            ..record.clone()
          };
          self.state().commit(id, &updated).await?;
        }
        Ok(Drift::Updated)
      }
      Err(ExecutorError::Provider {
        source: ProviderError::NotFound { .. },
        ..
      }) => {
        info!(node_id = %id, provider_id = %record.provider_id, "resource_gone");
        if !dry_run {
          self.state().remove(id).await?;
        }
        Ok(Drift::Removed)
      }
      Err(e) => Err(e),
    }
  }
}
