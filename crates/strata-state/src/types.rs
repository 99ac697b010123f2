use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_config::{PropertyMap, ResourceId};

/// JSON object of resolved inputs or provider outputs.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// What the engine knows about one applied resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
  /// Identifier assigned by the provider on create.
  pub provider_id: String,
  pub resource_type: String,
  /// Tag of the provider that created the resource.
  pub provider: String,
  /// Declared properties as last applied, references unresolved.
  pub properties: PropertyMap,
  /// Resolved properties last sent to the provider.
  #[serde(default)]
  pub inputs: JsonMap,
  #[serde(default)]
  pub outputs: JsonMap,
  /// Resources this one depended on when it was applied.
  #[serde(default)]
  pub dependencies: Vec<ResourceId>,
  /// Deleting or replacing this resource is refused.
  #[serde(default)]
  pub protect: bool,
  pub updated_at: DateTime<Utc>,
}

/// State as loaded at the start of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorState {
  records: BTreeMap<ResourceId, StateRecord>,
}

impl PriorState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, id: &ResourceId) -> Option<&StateRecord> {
    self.records.get(id)
  }

  pub fn contains(&self, id: &ResourceId) -> bool {
    self.records.contains_key(id)
  }

  pub fn insert(&mut self, id: ResourceId, record: StateRecord) -> Option<StateRecord> {
    self.records.insert(id, record)
  }

  pub fn remove(&mut self, id: &ResourceId) -> Option<StateRecord> {
    self.records.remove(id)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Records ordered by resource id.
  pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &StateRecord)> {
    self.records.iter()
  }

  pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
    self.records.keys()
  }
}

impl FromIterator<(ResourceId, StateRecord)> for PriorState {
  fn from_iter<I: IntoIterator<Item = (ResourceId, StateRecord)>>(iter: I) -> Self {
    Self {
      records: iter.into_iter().collect(),
    }
  }
}

impl IntoIterator for PriorState {
  type Item = (ResourceId, StateRecord);
  type IntoIter = std::collections::btree_map::IntoIter<ResourceId, StateRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.into_iter()
  }
}
