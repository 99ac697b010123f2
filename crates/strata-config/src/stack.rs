use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceDef;
use crate::value::Value;

/// A complete stack declaration: resources plus exported outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDef {
  pub name: String,
  #[serde(default)]
  pub resources: Vec<ResourceDef>,
  #[serde(default)]
  pub outputs: BTreeMap<String, Value>,
}

impl StackDef {
  pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(content)?)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Self::from_json_str(&content)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// A required configuration key has no value.
  #[error("missing required configuration value: {key}")]
  Missing { key: String },

  #[error("failed to read configuration: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse configuration: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Stack configuration values.
///
/// Holds everything a stack needs from its caller: sizes, network ids,
/// name prefixes. Keys are plain strings, values are arbitrary JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackConfig {
  values: BTreeMap<String, serde_json::Value>,
}

impl StackConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(content)?)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Self::from_json_str(&content)
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
    self.values.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
    self.values.get(key)
  }

  pub fn get_or(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
    self.values.get(key).cloned().unwrap_or(default)
  }

  pub fn require(&self, key: &str) -> Result<&serde_json::Value, ConfigError> {
    self.values.get(key).ok_or_else(|| ConfigError::Missing {
      key: key.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_require_and_defaults() {
    let mut config = StackConfig::new();
    config.set("vpc_id", "vpc-123");

    assert_eq!(config.require("vpc_id").unwrap(), &json!("vpc-123"));
    assert!(matches!(
      config.require("site_dir"),
      Err(ConfigError::Missing { key }) if key == "site_dir"
    ));
    assert_eq!(config.get_or("ec2_size", json!("t2.micro")), json!("t2.micro"));
  }

  #[test]
  fn test_stack_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.config.json");
    std::fs::write(&path, r#"{ "ec2_size": "t3.small", "public_subnet_name_prefix": "pub" }"#)
      .unwrap();

    let config = StackConfig::from_file(&path).unwrap();
    assert_eq!(config.get("ec2_size"), Some(&json!("t3.small")));
  }

  #[test]
  fn test_stack_def_from_json() {
    let stack = StackDef::from_json_str(
      r#"{
        "name": "static-site",
        "resources": [
          { "name": "site", "type": "aws:s3/Bucket",
            "properties": { "website": { "literal": { "index_document": "index.html" } } } }
        ],
        "outputs": {
          "bucket_name": { "reference": { "resource": "aws:s3/Bucket::site", "output": "bucket" } }
        }
      }"#,
    )
    .unwrap();

    assert_eq!(stack.resources.len(), 1);
    assert!(stack.outputs.contains_key("bucket_name"));
  }
}
