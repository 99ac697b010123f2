//! Two-phase graph construction.
//!
//! [`GraphBuilder::declare`] only collects declarations. Nothing is evaluated
//! and references may point at resources declared later. [`GraphBuilder::finalize`]
//! then binds configuration lookups, walks every property bag for references
//! to materialize edges, rejects cycles and computes a stable topological order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use strata_config::{ResourceId, StackConfig, StackDef, Value};
use tracing::debug;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::ResourceNode;
use crate::resolve::bind_config;

/// Handle to a declared resource, used to reference its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle {
  id: ResourceId,
}

impl NodeHandle {
  pub fn id(&self) -> &ResourceId {
    &self.id
  }

  /// A lazy reference to one of this resource's outputs.
  pub fn output(&self, path: impl Into<String>) -> Value {
    Value::reference(self.id.clone(), path)
  }
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
  nodes: Vec<ResourceNode>,
  declared: HashMap<ResourceId, usize>,
  outputs: BTreeMap<String, Value>,
  config: StackConfig,
}

impl GraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// A builder whose `Value::Config` lookups are bound against `config`.
  pub fn with_config(config: StackConfig) -> Self {
    Self {
      config,
      ..Self::default()
    }
  }

  /// Load every resource and output of a stack declaration.
  pub fn from_stack(def: StackDef, config: StackConfig) -> Result<Self, GraphError> {
    let mut builder = Self::with_config(config);
    for resource in def.resources {
      builder.declare(resource.into())?;
    }
    for (name, value) in def.outputs {
      builder.export(name, value)?;
    }
    Ok(builder)
  }

  /// Declare a resource. Fails if a resource with the same type and name exists.
  pub fn declare(&mut self, node: ResourceNode) -> Result<NodeHandle, GraphError> {
    if self.declared.contains_key(&node.id) {
      return Err(GraphError::DuplicateName { id: node.id });
    }

    let handle = NodeHandle {
      id: node.id.clone(),
    };
    self.declared.insert(node.id.clone(), self.nodes.len());
    self.nodes.push(node);
    Ok(handle)
  }

  /// Export a named stack output.
  pub fn export(&mut self, name: impl Into<String>, value: Value) -> Result<(), GraphError> {
    let name = name.into();
    if self.outputs.contains_key(&name) {
      return Err(GraphError::DuplicateOutput { name });
    }
    self.outputs.insert(name, value);
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Resolve configuration, materialize edges and order the graph.
  pub fn finalize(self) -> Result<Graph, GraphError> {
    let GraphBuilder {
      nodes,
      declared,
      outputs,
      config,
    } = self;

    // Bind configuration lookups
    let mut nodes = nodes
      .into_iter()
      .map(|mut node| {
        let used_by = node.id.to_string();
        for value in node.properties.values_mut() {
          *value = bind_config(value, &config, &used_by)?;
        }
        Ok(node)
      })
      .collect::<Result<Vec<_>, GraphError>>()?;

    let outputs = outputs
      .into_iter()
      .map(|(name, value)| {
        let bound = bind_config(&value, &config, &format!("output:{}", name))?;
        Ok((name, bound))
      })
      .collect::<Result<BTreeMap<_, _>, GraphError>>()?;

    // Materialize edges from references and explicit dependencies
    let mut upstream: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();
    for node in &nodes {
      let deps = node.dependencies();
      for dep in &deps {
        if !declared.contains_key(dep) {
          return Err(GraphError::UnknownReference {
            from: node.id.to_string(),
            to: dep.clone(),
          });
        }
      }
      upstream.insert(node.id.clone(), deps);
    }

    for (name, value) in &outputs {
      for reference in value.references() {
        if !declared.contains_key(&reference.resource) {
          return Err(GraphError::UnknownReference {
            from: format!("output:{}", name),
            to: reference.resource.clone(),
          });
        }
      }
    }

    let order = topological_order(&nodes, &declared, &upstream)?;

    debug!(resources = nodes.len(), outputs = outputs.len(), "graph_finalized");

    // Reorder nodes without cloning
    let mut slots: Vec<Option<ResourceNode>> = nodes.drain(..).map(Some).collect();
    let ordered = order
      .into_iter()
      .filter_map(|i| slots[i].take())
      .collect();

    Ok(Graph::from_ordered(ordered, upstream, outputs))
  }
}

/// Kahn's algorithm, always releasing the earliest-declared ready node first.
fn topological_order(
  nodes: &[ResourceNode],
  declared: &HashMap<ResourceId, usize>,
  upstream: &HashMap<ResourceId, Vec<ResourceId>>,
) -> Result<Vec<usize>, GraphError> {
  let mut in_degree: Vec<usize> = vec![0; nodes.len()];
  let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

  for (i, node) in nodes.iter().enumerate() {
    for dep in upstream.get(&node.id).map(|v| v.as_slice()).unwrap_or(&[]) {
      let d = declared[dep];
      in_degree[i] += 1;
      dependents[d].push(i);
    }
  }

  let mut ready: BinaryHeap<Reverse<usize>> = in_degree
    .iter()
    .enumerate()
    .filter(|(_, degree)| **degree == 0)
    .map(|(i, _)| Reverse(i))
    .collect();

  let mut order = Vec::with_capacity(nodes.len());
  while let Some(Reverse(i)) = ready.pop() {
    order.push(i);
    for &dependent in &dependents[i] {
      in_degree[dependent] -= 1;
      if in_degree[dependent] == 0 {
        ready.push(Reverse(dependent));
      }
    }
  }

  if order.len() < nodes.len() {
    let stuck = in_degree
      .iter()
      .enumerate()
      .filter(|(_, degree)| **degree > 0)
      .map(|(i, _)| nodes[i].id.clone())
      .collect();
    return Err(GraphError::Cycle { nodes: stuck });
  }

  Ok(order)
}
