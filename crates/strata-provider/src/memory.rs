use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{Created, Properties, Provider};

#[derive(Debug, Clone)]
struct StoredResource {
  resource_type: String,
  properties: Properties,
}

/// In-process provider.
///
/// Assigns sequential ids and echoes the resolved properties back as outputs,
/// together with `id`. Suitable for previews and tests.
#[derive(Debug, Default)]
pub struct MemoryProvider {
  resources: Mutex<HashMap<String, StoredResource>>,
  next_id: AtomicU64,
  replace_on_changes: HashMap<String, Vec<String>>,
}

impl MemoryProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mark properties of `resource_type` as requiring replacement.
  pub fn with_replace_on_changes(
    mut self,
    resource_type: impl Into<String>,
    properties: &[&str],
  ) -> Self {
    self.replace_on_changes.insert(
      resource_type.into(),
      properties.iter().map(|p| p.to_string()).collect(),
    );
    self
  }

  /// Number of live resources.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Current properties of a resource, if it exists.
  pub fn get(&self, provider_id: &str) -> Option<Properties> {
    self.lock().get(provider_id).map(|r| r.properties.clone())
  }

  /// Remove a resource behind the engine's back, simulating drift.
  pub fn forget(&self, provider_id: &str) -> bool {
    self.lock().remove(provider_id).is_some()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredResource>> {
    self.resources.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn outputs(provider_id: &str, properties: &Properties) -> Properties {
    let mut outputs = properties.clone();
    outputs.insert("id".to_string(), provider_id.into());
    outputs
  }
}

/// `aws:s3/Bucket` -> `bucket`
fn id_prefix(resource_type: &str) -> String {
  resource_type
    .rsplit(['/', ':'])
    .next()
    .unwrap_or(resource_type)
    .to_lowercase()
}

#[async_trait]
impl Provider for MemoryProvider {
  async fn create(
    &self,
    resource_type: &str,
    properties: &Properties,
  ) -> Result<Created, ProviderError> {
    let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    let provider_id = format!("{}-{:04}", id_prefix(resource_type), n);

    self.lock().insert(
      provider_id.clone(),
      StoredResource {
        resource_type: resource_type.to_string(),
        properties: properties.clone(),
      },
    );
    debug!(provider_id = %provider_id, resource_type, "memory resource created");

    Ok(Created {
      outputs: Self::outputs(&provider_id, properties),
      provider_id,
    })
  }

  async fn read(
    &self,
    resource_type: &str,
    provider_id: &str,
  ) -> Result<Properties, ProviderError> {
    match self.lock().get(provider_id) {
      Some(stored) if stored.resource_type == resource_type => {
        Ok(Self::outputs(provider_id, &stored.properties))
      }
      _ => Err(ProviderError::NotFound {
        provider_id: provider_id.to_string(),
      }),
    }
  }

  async fn update(
    &self,
    _resource_type: &str,
    provider_id: &str,
    properties: &Properties,
  ) -> Result<Properties, ProviderError> {
    let mut resources = self.lock();
    let stored = resources
      .get_mut(provider_id)
      .ok_or_else(|| ProviderError::NotFound {
        provider_id: provider_id.to_string(),
      })?;
    stored.properties = properties.clone();
    Ok(Self::outputs(provider_id, properties))
  }

  async fn delete(&self, _resource_type: &str, provider_id: &str) -> Result<(), ProviderError> {
    match self.lock().remove(provider_id) {
      Some(_) => Ok(()),
      None => Err(ProviderError::NotFound {
        provider_id: provider_id.to_string(),
      }),
    }
  }

  fn replace_on_changes(&self, resource_type: &str) -> Vec<String> {
    self
      .replace_on_changes
      .get(resource_type)
      .cloned()
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn props(value: serde_json::Value) -> Properties {
    value.as_object().cloned().unwrap()
  }

  #[tokio::test]
  async fn test_memory_provider_lifecycle() {
    let provider = MemoryProvider::new();

    let created = provider
      .create("aws:s3/Bucket", &props(json!({ "acl": "private" })))
      .await
      .unwrap();
    assert_eq!(created.provider_id, "bucket-0001");
    assert_eq!(created.outputs["id"], json!("bucket-0001"));
    assert_eq!(created.outputs["acl"], json!("private"));

    let updated = provider
      .update("aws:s3/Bucket", "bucket-0001", &props(json!({ "acl": "public-read" })))
      .await
      .unwrap();
    assert_eq!(updated["acl"], json!("public-read"));

    let read = provider.read("aws:s3/Bucket", "bucket-0001").await.unwrap();
    assert_eq!(read, updated);

    provider.delete("aws:s3/Bucket", "bucket-0001").await.unwrap();
    assert!(provider.is_empty());
    assert_eq!(
      provider.read("aws:s3/Bucket", "bucket-0001").await,
      Err(ProviderError::NotFound {
        provider_id: "bucket-0001".to_string()
      })
    );
  }

  #[test]
  fn test_replace_on_changes_per_type() {
    let provider =
      MemoryProvider::new().with_replace_on_changes("aws:ec2/Instance", &["ami", "subnet_id"]);
    assert_eq!(
      provider.replace_on_changes("aws:ec2/Instance"),
      vec!["ami".to_string(), "subnet_id".to_string()]
    );
    assert!(provider.replace_on_changes("aws:s3/Bucket").is_empty());
  }
}
