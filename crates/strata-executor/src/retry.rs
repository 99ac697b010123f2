//! Retries for provider calls.
//!
//! Transient failures are retried with the policy's backoff. Permanent and
//! not-found errors return immediately.

use std::future::Future;

use strata_config::ResourceId;
use strata_provider::ProviderError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::ExecutorError;
use crate::events::{ApplyEvent, ApplyNotifier};

/// Identifies the entry a provider call belongs to, for logs and events.
pub(crate) struct CallSite<'a> {
  pub run_id: &'a str,
  pub id: &'a ResourceId,
  pub notifier: &'a dyn ApplyNotifier,
}

/// Run `call` until it succeeds, fails permanently, or runs out of attempts.
///
/// Only [`ProviderError::Transient`] is retried. Backoff sleeps end early when
/// `cancel` fires. `attempts` is incremented for every call made.
pub(crate) async fn with_retry<T, F, Fut>(
  policy: &RetryPolicy,
  cancel: &CancellationToken,
  site: &CallSite<'_>,
  attempts: &mut u32,
  mut call: F,
) -> Result<T, ExecutorError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, ProviderError>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut tries = 0;

  loop {
    tries += 1;
    *attempts += 1;

    let error = match call().await {
      Ok(value) => return Ok(value),
      Err(e) => e,
    };

    if !error.is_retryable() || tries >= max_attempts {
      return Err(ExecutorError::Provider {
        attempts: tries,
        source: error,
      });
    }

    let delay = policy.delay_for(tries);
    warn!(
      run_id = %site.run_id,
      node_id = %site.id,
      attempt = tries,
      delay_ms = delay.as_millis() as u64,
      error = %error,
      "entry_retrying"
    );
    site.notifier.notify(ApplyEvent::EntryRetrying {
      run_id: site.run_id.to_string(),
      id: site.id.clone(),
      attempt: tries,
      error: error.to_string(),
    });

    tokio::select! {
      _ = tokio::time::sleep(delay) => {}
      _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::NoopNotifier;

  fn policy() -> RetryPolicy {
    RetryPolicy {
      max_attempts: 4,
      initial_delay_ms: 1,
      max_delay_ms: 1,
      ..RetryPolicy::default()
    }
  }

  #[tokio::test]
  async fn test_permanent_errors_are_not_retried() {
    let id = ResourceId::new("aws:s3/Bucket", "site");
    let site = CallSite {
      run_id: "run",
      id: &id,
      notifier: &NoopNotifier,
    };
    let mut attempts = 0;

    let cancel = CancellationToken::new();
    let result: Result<(), _> = with_retry(&policy(), &cancel, &site, &mut attempts, || async {
      Err(ProviderError::permanent("denied"))
    })
    .await;

    assert!(matches!(result, Err(ExecutorError::Provider { attempts: 1, .. })));
    assert_eq!(attempts, 1);
  }

  #[tokio::test]
  async fn test_transient_errors_retry_until_success() {
    let id = ResourceId::new("aws:s3/Bucket", "site");
    let site = CallSite {
      run_id: "run",
      id: &id,
      notifier: &NoopNotifier,
    };
    let mut attempts = 0;
    let mut calls = 0;

    let result = with_retry(&policy(), &CancellationToken::new(), &site, &mut attempts, || {
      calls += 1;
      let outcome = if calls < 3 {
        Err(ProviderError::transient("throttled"))
      } else {
        Ok(calls)
      };
      async move { outcome }
    })
    .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(attempts, 3);
  }
}
