use strata_config::ResourceId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("duplicate resource: {id}")]
  DuplicateName { id: ResourceId },

  #[error("duplicate stack output: {name}")]
  DuplicateOutput { name: String },

  /// `from` is a resource id or `output:<name>` for stack exports.
  #[error("{from} references undeclared resource {to}")]
  UnknownReference { from: String, to: ResourceId },

  #[error("dependency cycle between: {}", display_ids(.nodes))]
  Cycle { nodes: Vec<ResourceId> },

  #[error("missing required configuration value '{key}' (used by {used_by})")]
  MissingConfig { key: String, used_by: String },
}

fn display_ids(ids: &[ResourceId]) -> String {
  ids
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

/// A value could not be evaluated against the outputs known so far.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// The referenced resource has no outputs (not applied, failed, or skipped).
  #[error("outputs of {resource} are not available")]
  Unavailable { resource: ResourceId },

  #[error("{resource} has no output '{output}'")]
  MissingOutput { resource: ResourceId, output: String },

  /// A config lookup reached evaluation without being bound at load time.
  #[error("configuration value '{key}' was not bound")]
  UnboundConfig { key: String },
}
