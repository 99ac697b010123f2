use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_config::ConfigError;
use strata_executor::ExecutorConfig;

/// Configuration for the engine.
///
/// Every field has a default, so a partial JSON document is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub executor: ExecutorConfig,
}

impl EngineConfig {
  pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(content)?)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Self::from_json_str(&content)
  }

  /// The same configuration with dry-run forced on.
  pub fn dry_run(mut self) -> Self {
    self.executor.dry_run = true;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_config() {
    let config =
      EngineConfig::from_json_str(r#"{ "executor": { "max_concurrency": 4, "dry_run": true } }"#)
        .unwrap();
    assert_eq!(config.executor.max_concurrency, 4);
    assert!(config.executor.dry_run);
    assert_eq!(config.executor.retry, Default::default());

    assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
  }
}
