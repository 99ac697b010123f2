use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::PropertyMap;

const SEPARATOR: &str = "::";

/// Identity of a resource: its type plus its logical name.
///
/// Rendered as `"<type>::<name>"`, e.g. `"aws:s3/Bucket::site"`. Parsing splits
/// at the last `::`, so a type may contain the separator but a name may not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
  pub resource_type: String,
  pub name: String,
}

impl ResourceId {
  pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      resource_type: resource_type.into(),
      name: name.into(),
    }
  }

  /// Default provider tag for this resource: the package prefix of its type.
  ///
  /// `aws:s3/Bucket` belongs to `aws`. A type without a prefix is its own tag.
  pub fn default_provider(&self) -> &str {
    self
      .resource_type
      .split_once(':')
      .map(|(package, _)| package)
      .unwrap_or(&self.resource_type)
  }
}

impl fmt::Display for ResourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.resource_type, SEPARATOR, self.name)
  }
}

/// A string could not be parsed as a [`ResourceId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource id '{0}': expected '<type>::<name>'")]
pub struct ResourceIdError(pub String);

impl FromStr for ResourceId {
  type Err = ResourceIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.rsplit_once(SEPARATOR) {
      Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
        Ok(Self::new(resource_type, name))
      }
      _ => Err(ResourceIdError(s.to_string())),
    }
  }
}

impl TryFrom<String> for ResourceId {
  type Error = ResourceIdError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<ResourceId> for String {
  fn from(id: ResourceId) -> Self {
    id.to_string()
  }
}

/// Per-resource options that shape planning but are not sent to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceOptions {
  /// Explicit dependencies in addition to those implied by references.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<ResourceId>,
  /// Properties whose change forces a replacement instead of an update.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub replace_on_changes: Vec<String>,
  /// Refuse to delete or replace this resource.
  #[serde(default)]
  pub protect: bool,
}

/// A single resource declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
  pub name: String,
  #[serde(rename = "type")]
  pub resource_type: String,
  /// Provider tag override. Defaults to the type's package prefix.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider: Option<String>,
  #[serde(default)]
  pub properties: PropertyMap,
  #[serde(default)]
  pub options: ResourceOptions,
}

impl ResourceDef {
  pub fn id(&self) -> ResourceId {
    ResourceId::new(&self.resource_type, &self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resource_id_round_trips_through_string() {
    let id: ResourceId = "aws:s3/Bucket::site".parse().unwrap();
    assert_eq!(id.resource_type, "aws:s3/Bucket");
    assert_eq!(id.name, "site");
    assert_eq!(id.to_string(), "aws:s3/Bucket::site");
  }

  #[test]
  fn test_resource_id_rejects_missing_name() {
    assert!("aws:s3/Bucket".parse::<ResourceId>().is_err());
    assert!("::site".parse::<ResourceId>().is_err());
  }

  #[test]
  fn test_resource_id_type_may_contain_separator() {
    let id = ResourceId::new("k8s::apps/v1::Deployment", "web");
    let parsed: ResourceId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
  }

  #[test]
  fn test_default_provider_is_package_prefix() {
    assert_eq!(ResourceId::new("aws:ec2/Instance", "web").default_provider(), "aws");
    assert_eq!(ResourceId::new("bucket", "b").default_provider(), "bucket");
  }

  #[test]
  fn test_resource_def_from_json() {
    let def: ResourceDef = serde_json::from_value(serde_json::json!({
      "name": "svc",
      "type": "aws:ecs/Service",
      "properties": { "desired_count": { "literal": 1 } },
      "options": { "depends_on": ["aws:lb/Listener::web"] }
    }))
    .unwrap();

    assert_eq!(def.id().to_string(), "aws:ecs/Service::svc");
    assert_eq!(
      def.options.depends_on,
      vec![ResourceId::new("aws:lb/Listener", "web")]
    );
    assert!(!def.options.protect);
  }
}
