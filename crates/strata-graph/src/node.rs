use serde::{Deserialize, Serialize};
use strata_config::{PropertyMap, ResourceDef, ResourceId, ResourceOptions, Value};

/// A declared resource: identity, desired properties and provider tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
  pub id: ResourceId,
  /// Tag of the provider plugin that manages this resource.
  pub provider: String,
  pub properties: PropertyMap,
  #[serde(default)]
  pub options: ResourceOptions,
}

impl ResourceNode {
  pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
    let id = ResourceId::new(resource_type, name);
    let provider = id.default_provider().to_string();
    Self {
      id,
      provider,
      properties: PropertyMap::new(),
      options: ResourceOptions::default(),
    }
  }

  pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.properties.insert(key.into(), value.into());
    self
  }

  pub fn provider(mut self, provider: impl Into<String>) -> Self {
    self.provider = provider.into();
    self
  }

  pub fn depends_on(mut self, id: ResourceId) -> Self {
    if !self.options.depends_on.contains(&id) {
      self.options.depends_on.push(id);
    }
    self
  }

  pub fn replace_on_changes(mut self, property: impl Into<String>) -> Self {
    self.options.replace_on_changes.push(property.into());
    self
  }

  pub fn protect(mut self) -> Self {
    self.options.protect = true;
    self
  }

  /// Resources this node depends on: referenced ones first, then explicit
  /// `depends_on`, without duplicates.
  pub fn dependencies(&self) -> Vec<ResourceId> {
    let mut deps: Vec<ResourceId> = Vec::new();
    let referenced = self
      .properties
      .values()
      .flat_map(Value::references)
      .map(|r| &r.resource);

    for id in referenced.chain(self.options.depends_on.iter()) {
      if !deps.contains(id) {
        deps.push(id.clone());
      }
    }
    deps
  }
}

impl From<ResourceDef> for ResourceNode {
  fn from(def: ResourceDef) -> Self {
    let id = def.id();
    let provider = def
      .provider
      .unwrap_or_else(|| id.default_provider().to_string());
    Self {
      id,
      provider,
      properties: def.properties,
      options: def.options,
    }
  }
}
