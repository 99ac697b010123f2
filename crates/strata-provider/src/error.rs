use thiserror::Error;

/// Errors returned by provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
  /// The call may succeed if retried (throttling, timeouts, eventual consistency).
  #[error("transient provider error: {message}")]
  Transient { message: String },

  /// The call will fail again if retried.
  #[error("provider error: {message}")]
  Permanent { message: String },

  /// The resource no longer exists on the provider side.
  #[error("resource not found: {provider_id}")]
  NotFound { provider_id: String },
}

impl ProviderError {
  pub fn transient(message: impl Into<String>) -> Self {
    Self::Transient {
      message: message.into(),
    }
  }

  pub fn permanent(message: impl Into<String>) -> Self {
    Self::Permanent {
      message: message.into(),
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Transient { .. })
  }
}
