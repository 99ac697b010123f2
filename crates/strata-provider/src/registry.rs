use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::provider::Provider;

/// Providers keyed by their tag (`aws`, `gcp`, ...).
#[derive(Clone, Default)]
pub struct ProviderRegistry {
  providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a provider under `tag`, replacing any previous one.
  pub fn register(&mut self, tag: impl Into<String>, provider: Arc<dyn Provider>) {
    self.providers.insert(tag.into(), provider);
  }

  pub fn with(mut self, tag: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
    self.register(tag, provider);
    self
  }

  pub fn get(&self, tag: &str) -> Option<Arc<dyn Provider>> {
    self.providers.get(tag).cloned()
  }

  pub fn contains(&self, tag: &str) -> bool {
    self.providers.contains_key(tag)
  }

  pub fn tags(&self) -> impl Iterator<Item = &str> {
    self.providers.keys().map(String::as_str)
  }
}

impl fmt::Debug for ProviderRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut tags: Vec<&str> = self.tags().collect();
    tags.sort_unstable();
    f.debug_struct("ProviderRegistry")
      .field("providers", &tags)
      .finish()
  }
}
