use strata_config::ResourceId;
use thiserror::Error;

use crate::plan::Operation;

/// Errors that abort planning before anything is executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  /// No provider is registered under the resource's tag.
  #[error("no provider registered as '{provider}' (required by {id})")]
  UnknownProvider { id: ResourceId, provider: String },

  /// The resource is protected and the plan would destroy it.
  #[error("refusing to {operation} protected resource {id}")]
  ProtectedResource { id: ResourceId, operation: Operation },
}
