use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use strata_config::{ResourceId, Value};

use crate::node::ResourceNode;

/// A finalized, acyclic resource graph.
///
/// Nodes are stored in topological order (dependencies before dependents,
/// ties broken by declaration order).
#[derive(Debug, Clone, Default)]
pub struct Graph {
  nodes: Vec<ResourceNode>,
  /// Position of each node in `nodes`.
  index: HashMap<ResourceId, usize>,
  /// node -> nodes it depends on.
  upstream: HashMap<ResourceId, Vec<ResourceId>>,
  /// node -> nodes that depend on it.
  downstream: HashMap<ResourceId, Vec<ResourceId>>,
  outputs: BTreeMap<String, Value>,
}

impl Graph {
  /// Assemble a graph from nodes already in topological order.
  pub(crate) fn from_ordered(
    nodes: Vec<ResourceNode>,
    upstream: HashMap<ResourceId, Vec<ResourceId>>,
    outputs: BTreeMap<String, Value>,
  ) -> Self {
    let index: HashMap<ResourceId, usize> = nodes
      .iter()
      .enumerate()
      .map(|(i, node)| (node.id.clone(), i))
      .collect();

    let mut downstream: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();
    for node in &nodes {
      downstream.entry(node.id.clone()).or_default();
    }
    // Walk in topological order so downstream lists are ordered too.
    for node in &nodes {
      for dep in upstream.get(&node.id).map(|v| v.as_slice()).unwrap_or(&[]) {
        downstream
          .entry(dep.clone())
          .or_default()
          .push(node.id.clone());
      }
    }

    Self {
      nodes,
      index,
      upstream,
      downstream,
      outputs,
    }
  }

  /// An empty graph. Planning against it deletes everything in state.
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Nodes in topological order.
  pub fn nodes_in_order(&self) -> &[ResourceNode] {
    &self.nodes
  }

  pub fn get(&self, id: &ResourceId) -> Option<&ResourceNode> {
    self.index.get(id).map(|&i| &self.nodes[i])
  }

  pub fn contains(&self, id: &ResourceId) -> bool {
    self.index.contains_key(id)
  }

  /// Position of a node in the topological order.
  pub fn position(&self, id: &ResourceId) -> Option<usize> {
    self.index.get(id).copied()
  }

  /// Nodes that `id` depends on.
  pub fn upstream(&self, id: &ResourceId) -> &[ResourceId] {
    self
      .upstream
      .get(id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Nodes that depend directly on `id`.
  pub fn downstream(&self, id: &ResourceId) -> &[ResourceId] {
    self
      .downstream
      .get(id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Every node with a dependency path to `id`, excluding `id` itself.
  pub fn transitive_dependents(&self, id: &ResourceId) -> HashSet<ResourceId> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&ResourceId> = self.downstream(id).iter().collect();

    while let Some(next) = queue.pop_front() {
      if seen.insert(next.clone()) {
        queue.extend(self.downstream(next));
      }
    }
    seen
  }

  /// Exported stack outputs.
  pub fn outputs(&self) -> &BTreeMap<String, Value> {
    &self.outputs
  }
}
