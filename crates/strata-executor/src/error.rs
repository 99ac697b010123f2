//! Executor error types.

use strata_graph::ResolveError;
use strata_provider::ProviderError;
use strata_state::StateError;

/// Why a single plan entry failed.
///
/// Failures are scoped to their entry: they never abort the run, they only
/// cause dependents to be skipped.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
  /// Execution was cancelled while the entry was waiting to retry.
  #[error("execution cancelled")]
  Cancelled,

  /// The provider call failed, after `attempts` tries.
  #[error("provider call failed after {attempts} attempt(s): {source}")]
  Provider {
    attempts: u32,
    #[source]
    source: ProviderError,
  },

  /// Inputs could not be evaluated from upstream outputs.
  #[error("input resolution failed: {0}")]
  Resolve(#[from] ResolveError),

  /// The provider succeeded but its result could not be recorded.
  #[error("failed to record state: {0}")]
  State(#[from] StateError),

  /// No provider is registered under the entry's tag.
  #[error("no provider registered as '{provider}'")]
  UnknownProvider { provider: String },

  /// The entry needs a prior state record and has none.
  #[error("invalid plan entry: {message}")]
  InvalidEntry { message: String },

  /// The task running the entry panicked or was aborted.
  #[error("entry task failed: {message}")]
  Join { message: String },
}

impl ExecutorError {
  /// The provider error behind this failure, if any.
  pub fn provider_error(&self) -> Option<&ProviderError> {
    match self {
      Self::Provider { source, .. } => Some(source),
      _ => None,
    }
  }
}
