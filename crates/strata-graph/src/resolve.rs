//! Evaluation of property values.
//!
//! Configuration lookups are bound once, when the graph is finalized.
//! References are evaluated later, against the outputs of resources that have
//! already been applied.

use std::collections::HashMap;

use serde_json::Map;
use strata_config::{PropertyMap, ResourceId, StackConfig, Value};

use crate::error::{GraphError, ResolveError};

/// Output values of a single resource.
pub type Outputs = Map<String, serde_json::Value>;

/// Source of resource outputs during evaluation.
pub trait OutputLookup {
  fn outputs_of(&self, id: &ResourceId) -> Option<&Outputs>;
}

impl OutputLookup for HashMap<ResourceId, Outputs> {
  fn outputs_of(&self, id: &ResourceId) -> Option<&Outputs> {
    self.get(id)
  }
}

/// Replace every `Value::Config` with the configured literal.
pub(crate) fn bind_config(
  value: &Value,
  config: &StackConfig,
  used_by: &str,
) -> Result<Value, GraphError> {
  let bound = match value {
    Value::Config(lookup) => match (config.get(&lookup.key), &lookup.default) {
      (Some(v), _) => Value::Literal(v.clone()),
      (None, Some(default)) => Value::Literal(default.clone()),
      (None, None) => {
        return Err(GraphError::MissingConfig {
          key: lookup.key.clone(),
          used_by: used_by.to_string(),
        });
      }
    },
    Value::Concat(parts) => Value::Concat(
      parts
        .iter()
        .map(|p| bind_config(p, config, used_by))
        .collect::<Result<_, _>>()?,
    ),
    Value::List(items) => Value::List(
      items
        .iter()
        .map(|p| bind_config(p, config, used_by))
        .collect::<Result<_, _>>()?,
    ),
    Value::Map(entries) => Value::Map(
      entries
        .iter()
        .map(|(k, v)| Ok((k.clone(), bind_config(v, config, used_by)?)))
        .collect::<Result<_, GraphError>>()?,
    ),
    Value::Literal(_) | Value::Reference(_) => value.clone(),
  };
  Ok(bound)
}

/// Follow a dot-separated path into a resource's outputs.
pub fn lookup_path<'a>(outputs: &'a Outputs, path: &str) -> Option<&'a serde_json::Value> {
  let mut segments = path.split('.');
  let mut current = outputs.get(segments.next()?)?;

  for segment in segments {
    current = match current {
      serde_json::Value::Object(map) => map.get(segment)?,
      serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
      _ => return None,
    };
  }
  Some(current)
}

/// Evaluate a value to plain JSON.
pub fn resolve_value(
  value: &Value,
  lookup: &impl OutputLookup,
) -> Result<serde_json::Value, ResolveError> {
  match value {
    Value::Literal(v) => Ok(v.clone()),
    Value::Reference(r) => {
      let outputs = lookup
        .outputs_of(&r.resource)
        .ok_or_else(|| ResolveError::Unavailable {
          resource: r.resource.clone(),
        })?;
      lookup_path(outputs, &r.output)
        .cloned()
        .ok_or_else(|| ResolveError::MissingOutput {
          resource: r.resource.clone(),
          output: r.output.clone(),
        })
    }
    Value::Config(lookup) => Err(ResolveError::UnboundConfig {
      key: lookup.key.clone(),
    }),
    Value::Concat(parts) => {
      let mut rendered = String::new();
      for part in parts {
        render_into(&mut rendered, &resolve_value(part, lookup)?);
      }
      Ok(serde_json::Value::String(rendered))
    }
    Value::List(items) => items
      .iter()
      .map(|item| resolve_value(item, lookup))
      .collect::<Result<Vec<_>, _>>()
      .map(serde_json::Value::Array),
    Value::Map(entries) => entries
      .iter()
      .map(|(k, v)| Ok((k.clone(), resolve_value(v, lookup)?)))
      .collect::<Result<Map<_, _>, _>>()
      .map(serde_json::Value::Object),
  }
}

/// Evaluate a whole property bag into the inputs sent to a provider.
pub fn resolve_properties(
  properties: &PropertyMap,
  lookup: &impl OutputLookup,
) -> Result<Outputs, ResolveError> {
  properties
    .iter()
    .map(|(k, v)| Ok((k.clone(), resolve_value(v, lookup)?)))
    .collect()
}

fn render_into(buf: &mut String, value: &serde_json::Value) {
  match value {
    serde_json::Value::String(s) => buf.push_str(s),
    serde_json::Value::Null => {}
    other => buf.push_str(&other.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn outputs(value: serde_json::Value) -> Outputs {
    match value {
      serde_json::Value::Object(map) => map,
      _ => panic!("outputs must be an object"),
    }
  }

  #[test]
  fn test_lookup_path_descends_objects_and_arrays() {
    let out = outputs(json!({ "subnets": { "ids": ["subnet-a", "subnet-b"] } }));
    assert_eq!(lookup_path(&out, "subnets.ids.1"), Some(&json!("subnet-b")));
    assert_eq!(lookup_path(&out, "subnets.ids.7"), None);
    assert_eq!(lookup_path(&out, "missing"), None);
  }

  #[test]
  fn test_resolve_concat_and_nested_references() {
    let bucket = ResourceId::new("aws:s3/Bucket", "site");
    let mut known = HashMap::new();
    known.insert(
      bucket.clone(),
      outputs(json!({ "bucket": "site-1a2b", "website_endpoint": "site.s3-website", "port": 80 })),
    );

    let url = Value::Concat(vec![
      Value::from("http://"),
      Value::reference(bucket.clone(), "website_endpoint"),
      Value::from(":"),
      Value::reference(bucket.clone(), "port"),
    ]);
    assert_eq!(resolve_value(&url, &known).unwrap(), json!("http://site.s3-website:80"));

    let list = Value::List(vec![Value::reference(bucket.clone(), "bucket")]);
    assert_eq!(resolve_value(&list, &known).unwrap(), json!(["site-1a2b"]));
  }

  #[test]
  fn test_resolve_reports_unavailable_and_missing() {
    let bucket = ResourceId::new("aws:s3/Bucket", "site");
    let mut known: HashMap<ResourceId, Outputs> = HashMap::new();

    let value = Value::reference(bucket.clone(), "arn");
    assert_eq!(
      resolve_value(&value, &known),
      Err(ResolveError::Unavailable {
        resource: bucket.clone()
      })
    );

    known.insert(bucket.clone(), Outputs::new());
    assert!(matches!(
      resolve_value(&value, &known),
      Err(ResolveError::MissingOutput { output, .. }) if output == "arn"
    ));
  }
}
