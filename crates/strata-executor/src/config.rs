//! Executor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_config::RetryBackoff;

/// Retry behaviour for transient provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts, including the first. `1` disables retries.
  pub max_attempts: u32,
  pub backoff: RetryBackoff,
  pub initial_delay_ms: u64,
  /// Upper bound on a single delay.
  pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff: RetryBackoff::Exponential,
      initial_delay_ms: 200,
      max_delay_ms: 10_000,
    }
  }
}

impl RetryPolicy {
  /// A policy that never retries.
  pub fn none() -> Self {
    Self {
      max_attempts: 1,
      ..Self::default()
    }
  }

  /// Delay before retry number `retry` (1 for the first retry).
  pub fn delay_for(&self, retry: u32) -> Duration {
    let retry = retry.max(1);
    let ms = match self.backoff {
      RetryBackoff::Constant => self.initial_delay_ms,
      RetryBackoff::Linear => self.initial_delay_ms.saturating_mul(u64::from(retry)),
      RetryBackoff::Exponential => {
        let factor = 2u64.checked_pow(retry - 1).unwrap_or(u64::MAX);
        self.initial_delay_ms.saturating_mul(factor)
      }
    };
    Duration::from_millis(ms.min(self.max_delay_ms))
  }
}

/// Configuration for the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
  /// Maximum number of entries running at once.
  pub max_concurrency: usize,
  /// Report what would happen without calling mutating provider methods.
  pub dry_run: bool,
  pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      max_concurrency: 10,
      dry_run: false,
      retry: RetryPolicy::default(),
    }
  }
}
