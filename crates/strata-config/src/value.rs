//! Property values for resource declarations.
//!
//! A property value is either a literal JSON value or an expression that can
//! only be evaluated once other resources exist: a reference to another
//! resource's output, or a structure that embeds such references.
//!
//! # Examples
//!
//! ```json
//! {
//!   "bucket": { "reference": { "resource": "aws:s3/Bucket::site", "output": "bucket" } },
//!   "content_type": { "literal": "text/html" },
//!   "vpc_id": { "config": { "key": "vpc_id" } },
//!   "url": { "concat": [
//!     { "literal": "http://" },
//!     { "reference": { "resource": "aws:s3/Bucket::site", "output": "website_endpoint" } }
//!   ] }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceId;

/// A resource's desired property bag.
pub type PropertyMap = BTreeMap<String, Value>;

/// Reference to an output of another resource.
///
/// `output` is a dot-separated path into the resource's outputs. Numeric
/// segments index into arrays, so `"ids.0"` is the first element of `ids`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
  pub resource: ResourceId,
  pub output: String,
}

/// Lookup of a stack configuration key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRef {
  pub key: String,
  /// Used when the key is absent. Without a default the key is required.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
  Literal(serde_json::Value),
  Reference(OutputRef),
  Config(ConfigRef),
  /// String concatenation of the rendered parts.
  Concat(Vec<Value>),
  List(Vec<Value>),
  Map(BTreeMap<String, Value>),
}

impl Value {
  pub fn literal(value: impl Into<serde_json::Value>) -> Self {
    Self::Literal(value.into())
  }

  pub fn reference(resource: ResourceId, output: impl Into<String>) -> Self {
    Self::Reference(OutputRef {
      resource,
      output: output.into(),
    })
  }

  pub fn config(key: impl Into<String>) -> Self {
    Self::Config(ConfigRef {
      key: key.into(),
      default: None,
    })
  }

  pub fn config_or(key: impl Into<String>, default: impl Into<serde_json::Value>) -> Self {
    Self::Config(ConfigRef {
      key: key.into(),
      default: Some(default.into()),
    })
  }

  /// All output references embedded in this value, depth first.
  pub fn references(&self) -> Vec<&OutputRef> {
    let mut refs = Vec::new();
    self.collect_references(&mut refs);
    refs
  }

  fn collect_references<'a>(&'a self, refs: &mut Vec<&'a OutputRef>) {
    match self {
      Value::Reference(r) => refs.push(r),
      Value::Concat(parts) | Value::List(parts) => {
        for part in parts {
          part.collect_references(refs);
        }
      }
      Value::Map(entries) => {
        for value in entries.values() {
          value.collect_references(refs);
        }
      }
      Value::Literal(_) | Value::Config(_) => {}
    }
  }

  /// Whether this value contains no references or config lookups.
  pub fn is_literal(&self) -> bool {
    match self {
      Value::Literal(_) => true,
      Value::Reference(_) | Value::Config(_) => false,
      Value::Concat(parts) | Value::List(parts) => parts.iter().all(Value::is_literal),
      Value::Map(entries) => entries.values().all(Value::is_literal),
    }
  }
}

impl From<serde_json::Value> for Value {
  fn from(value: serde_json::Value) -> Self {
    Self::Literal(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Self::Literal(value.into())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Self::Literal(value.into())
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Self::Literal(value.into())
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Self::Literal(value.into())
  }
}

impl From<OutputRef> for Value {
  fn from(value: OutputRef) -> Self {
    Self::Reference(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_references_walks_nested_values() {
    let group = ResourceId::new("aws:ec2/SecurityGroup", "web");
    let tg = ResourceId::new("aws:lb/TargetGroup", "app");
    let value = Value::Map(BTreeMap::from([
      (
        "security_groups".to_string(),
        Value::List(vec![Value::reference(group.clone(), "id")]),
      ),
      (
        "default_actions".to_string(),
        Value::List(vec![Value::Map(BTreeMap::from([
          ("type".to_string(), Value::from("forward")),
          ("target_group_arn".to_string(), Value::reference(tg.clone(), "arn")),
        ]))]),
      ),
    ]));

    let refs: Vec<&ResourceId> = value.references().into_iter().map(|r| &r.resource).collect();
    assert_eq!(refs, vec![&tg, &group]);
    assert!(!value.is_literal());
  }

  #[test]
  fn test_value_from_json() {
    let value: Value = serde_json::from_value(json!({
      "concat": [
        { "literal": "http://" },
        { "reference": { "resource": "aws:s3/Bucket::site", "output": "website_endpoint" } }
      ]
    }))
    .unwrap();

    assert_eq!(
      value,
      Value::Concat(vec![
        Value::from("http://"),
        Value::reference(ResourceId::new("aws:s3/Bucket", "site"), "website_endpoint"),
      ])
    );
  }

  #[test]
  fn test_literal_structures_are_literal() {
    let value = Value::List(vec![Value::from("a"), Value::from(1_i64)]);
    assert!(value.is_literal());
    assert!(!Value::config("vpc_id").is_literal());
  }
}
