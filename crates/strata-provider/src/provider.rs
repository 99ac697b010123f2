use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Resolved properties sent to a provider, and outputs returned by it.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Created {
  /// Identifier assigned by the provider (an ARN, an instance id, ...).
  pub provider_id: String,
  pub outputs: Properties,
}

/// CRUD boundary to an external system.
///
/// One provider serves many resource types, so every call carries the type.
/// Implementations classify failures: [`ProviderError::Transient`] is retried
/// by the executor, [`ProviderError::Permanent`] is reported immediately.
#[async_trait]
pub trait Provider: Send + Sync {
  /// Create a resource and return its provider id and outputs.
  async fn create(
    &self,
    resource_type: &str,
    properties: &Properties,
  ) -> Result<Created, ProviderError>;

  /// Read the current outputs of a resource.
  ///
  /// Returns [`ProviderError::NotFound`] if the resource is gone.
  async fn read(&self, resource_type: &str, provider_id: &str)
  -> Result<Properties, ProviderError>;

  /// Update a resource in place and return its new outputs.
  async fn update(
    &self,
    resource_type: &str,
    provider_id: &str,
    properties: &Properties,
  ) -> Result<Properties, ProviderError>;

  /// Delete a resource.
  async fn delete(&self, resource_type: &str, provider_id: &str) -> Result<(), ProviderError>;

  /// Properties of `resource_type` that cannot be changed in place.
  fn replace_on_changes(&self, _resource_type: &str) -> Vec<String> {
    Vec::new()
  }
}
