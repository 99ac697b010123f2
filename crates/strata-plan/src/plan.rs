use std::fmt;

use serde::Serialize;
use strata_config::ResourceId;
use strata_graph::ResourceNode;
use strata_state::StateRecord;

/// What the executor will do to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  Create,
  Update,
  /// Delete the existing resource, then create a new one.
  Replace,
  Delete,
  NoOp,
}

impl Operation {
  /// Whether the operation calls a mutating provider method.
  pub fn is_change(self) -> bool {
    !matches!(self, Self::NoOp)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Replace => "replace",
      Self::Delete => "delete",
      Self::NoOp => "no-op",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
  pub id: ResourceId,
  pub operation: Operation,
  /// Human-readable explanation of the operation.
  pub reason: String,
  /// Property keys whose desired value differs from state.
  pub changed: Vec<String>,
  /// Desired node. `None` for deletes.
  pub node: Option<ResourceNode>,
  /// Record from prior state. `None` for creates.
  pub prior: Option<StateRecord>,
  /// Entries in this plan that must reach a terminal outcome first.
  pub depends_on: Vec<ResourceId>,
}

impl PlanEntry {
  /// Provider tag used for the operation. For a replace this is the new tag.
  pub fn provider(&self) -> &str {
    match (&self.node, &self.prior) {
      (Some(node), _) => &node.provider,
      (None, Some(prior)) => &prior.provider,
      (None, None) => "",
    }
  }
}

/// Count of entries per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
  pub create: usize,
  pub update: usize,
  pub replace: usize,
  pub delete: usize,
  pub no_op: usize,
}

impl PlanSummary {
  pub fn changes(&self) -> usize {
    self.create + self.update + self.replace + self.delete
  }
}

impl fmt::Display for PlanSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
      self.create, self.update, self.replace, self.delete, self.no_op
    )
  }
}

/// Ordered list of entries.
///
/// Every entry appears after all of its `depends_on`: graph nodes in
/// topological order first, then deletes with dependents before dependencies.
/// A delete of a record that depended on a replaced node moves ahead of the
/// replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
  entries: Vec<PlanEntry>,
}

impl Plan {
  pub(crate) fn new(entries: Vec<PlanEntry>) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &[PlanEntry] {
    &self.entries
  }

  pub fn get(&self, id: &ResourceId) -> Option<&PlanEntry> {
    self.entries.iter().find(|e| &e.id == id)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn summary(&self) -> PlanSummary {
    let mut summary = PlanSummary::default();
    for entry in &self.entries {
      match entry.operation {
        Operation::Create => summary.create += 1,
        Operation::Update => summary.update += 1,
        Operation::Replace => summary.replace += 1,
        Operation::Delete => summary.delete += 1,
        Operation::NoOp => summary.no_op += 1,
      }
    }
    summary
  }

  pub fn has_changes(&self) -> bool {
    self.entries.iter().any(|e| e.operation.is_change())
  }

  /// `(id, operation)` pairs in plan order.
  pub fn operations(&self) -> Vec<(&ResourceId, Operation)> {
    self
      .entries
      .iter()
      .map(|e| (&e.id, e.operation))
      .collect()
  }
}

impl IntoIterator for Plan {
  type Item = PlanEntry;
  type IntoIter = std::vec::IntoIter<PlanEntry>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}
