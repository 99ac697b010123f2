use async_trait::async_trait;
use strata_config::ResourceId;
use tokio::sync::RwLock;

use crate::{PriorState, StateError, StateRecord, StateStore};

/// In-memory state store.
///
/// Nothing survives the process. Suitable for previews and testing.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
  records: RwLock<PriorState>,
}

impl MemoryStateStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from existing records.
  pub fn with_state(state: PriorState) -> Self {
    Self {
      records: RwLock::new(state),
    }
  }
}

#[async_trait]
impl StateStore for MemoryStateStore {
  async fn load(&self) -> Result<PriorState, StateError> {
    Ok(self.records.read().await.clone())
  }

  async fn commit(&self, id: &ResourceId, record: &StateRecord) -> Result<(), StateError> {
    self
      .records
      .write()
      .await
      .insert(id.clone(), record.clone());
    Ok(())
  }

  async fn remove(&self, id: &ResourceId) -> Result<(), StateError> {
    self.records.write().await.remove(id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use strata_config::PropertyMap;

  fn record(provider_id: &str) -> StateRecord {
    StateRecord {
      provider_id: provider_id.to_string(),
      resource_type: "aws:s3/Bucket".to_string(),
      provider: "aws".to_string(),
      properties: PropertyMap::new(),
      inputs: Default::default(),
      outputs: Default::default(),
      dependencies: Vec::new(),
      protect: false,
      updated_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn test_memory_state_store() {
    let store = MemoryStateStore::new();
    let id = ResourceId::new("aws:s3/Bucket", "site");

    assert!(store.load().await.unwrap().is_empty());

    store.commit(&id, &record("bucket-1")).await.unwrap();
    store.commit(&id, &record("bucket-2")).await.unwrap();
    let state = store.load().await.unwrap();
    assert_eq!(state.len(), 1);
    assert_eq!(state.get(&id).unwrap().provider_id, "bucket-2");

    store.remove(&id).await.unwrap();
    store.remove(&id).await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
  }
}
