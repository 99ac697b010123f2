use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use strata_config::{PropertyMap, ResourceId, Value};
use strata_graph::{Graph, ResourceNode};
use strata_provider::ProviderRegistry;
use strata_state::{PriorState, StateRecord};
use tracing::{debug, instrument, warn};

use crate::error::PlanError;
use crate::plan::{Operation, Plan, PlanEntry};

/// Computes the operations that bring prior state in line with a graph.
///
/// Planning is pure: the same graph and prior state always produce the same
/// plan, and no provider is called except to ask which properties force
/// replacement.
pub struct Planner<'a> {
  providers: &'a ProviderRegistry,
}

impl<'a> Planner<'a> {
  pub fn new(providers: &'a ProviderRegistry) -> Self {
    Self { providers }
  }

  #[instrument(skip_all, fields(nodes = graph.len(), records = prior.len()))]
  pub fn plan(&self, graph: &Graph, prior: &PriorState) -> Result<Plan, PlanError> {
    let mut entries = Vec::with_capacity(graph.len() + prior.len());
    // Nodes whose outputs may differ after this plan runs.
    let mut changed_nodes: HashSet<ResourceId> = HashSet::new();

    for node in graph.nodes_in_order() {
      let entry = self.plan_node(graph, node, prior.get(&node.id), &changed_nodes)?;
      if entry.operation.is_change() {
        changed_nodes.insert(entry.id.clone());
      }
      debug!(node_id = %entry.id, operation = %entry.operation, reason = %entry.reason, "planned");
      entries.push(entry);
    }

    for entry in self.plan_deletes(graph, prior)? {
      debug!(node_id = %entry.id, operation = %entry.operation, "planned");
      entries.push(entry);
    }

    wait_for_doomed_dependents(&mut entries);
    Ok(Plan::new(dependency_order(entries)))
  }

  fn plan_node(
    &self,
    graph: &Graph,
    node: &ResourceNode,
    prior: Option<&StateRecord>,
    changed_nodes: &HashSet<ResourceId>,
  ) -> Result<PlanEntry, PlanError> {
    let provider = self
      .providers
      .get(&node.provider)
      .ok_or_else(|| PlanError::UnknownProvider {
        id: node.id.clone(),
        provider: node.provider.clone(),
      })?;

    let entry = |operation, reason: String, changed| PlanEntry {
      id: node.id.clone(),
      operation,
      reason,
      changed,
      node: Some(node.clone()),
      prior: prior.cloned(),
      depends_on: graph.upstream(&node.id).to_vec(),
    };

    let Some(prior) = prior else {
      return Ok(entry(Operation::Create, "not in state".to_string(), Vec::new()));
    };

    if prior.provider != node.provider {
      self.check_provider(&node.id, &prior.provider)?;
      check_protected(&node.id, node.options.protect, Operation::Replace)?;
      let reason = format!("provider changed from {} to {}", prior.provider, node.provider);
      return Ok(entry(Operation::Replace, reason, Vec::new()));
    }

    let changed = diff_properties(&node.properties, &prior.properties, changed_nodes);
    if changed.is_empty() {
      return Ok(entry(Operation::NoOp, "unchanged".to_string(), changed));
    }

    let mut forcing: Vec<String> = provider.replace_on_changes(&node.id.resource_type);
    forcing.extend(node.options.replace_on_changes.iter().cloned());
    let replaced: Vec<&String> = changed.iter().filter(|k| forcing.contains(k)).collect();

    if replaced.is_empty() {
      let reason = format!("changed: {}", join(&changed));
      return Ok(entry(Operation::Update, reason, changed));
    }

    check_protected(&node.id, node.options.protect, Operation::Replace)?;
    let reason = format!("replacement forced by: {}", join(replaced));
    Ok(entry(Operation::Replace, reason, changed))
  }

  /// Deletes for records no longer declared, dependents before dependencies.
  fn plan_deletes(&self, graph: &Graph, prior: &PriorState) -> Result<Vec<PlanEntry>, PlanError> {
    let doomed: BTreeSet<&ResourceId> = prior.ids().filter(|id| !graph.contains(id)).collect();
    if doomed.is_empty() {
      return Ok(Vec::new());
    }

    // dependency -> recorded dependents (among every record in state)
    let mut dependents: HashMap<&ResourceId, Vec<&ResourceId>> = HashMap::new();
    for (id, record) in prior.iter() {
      for dep in &record.dependencies {
        dependents.entry(dep).or_default().push(id);
      }
    }

    let mut entries = Vec::with_capacity(doomed.len());
    for id in delete_order(&doomed, prior) {
      let Some(record) = prior.get(id) else {
        continue;
      };
      self.check_provider(id, &record.provider)?;
      check_protected(id, record.protect, Operation::Delete)?;

      // Dependents that are also deleted must go first. Dependents still in
      // the graph must first be updated to stop using this resource.
      let mut depends_on: Vec<ResourceId> = dependents
        .get(id)
        .map(|ds| ds.iter().map(|d| (*d).clone()).collect())
        .unwrap_or_default();
      depends_on.sort();
      depends_on.dedup();

      entries.push(PlanEntry {
        id: id.clone(),
        operation: Operation::Delete,
        reason: "no longer declared".to_string(),
        changed: Vec::new(),
        node: None,
        prior: Some(record.clone()),
        depends_on,
      });
    }
    Ok(entries)
  }

  fn check_provider(&self, id: &ResourceId, provider: &str) -> Result<(), PlanError> {
    if self.providers.contains(provider) {
      Ok(())
    } else {
      Err(PlanError::UnknownProvider {
        id: id.clone(),
        provider: provider.to_string(),
      })
    }
  }
}

/// A replace deletes the old resource before creating the new one, so records
/// being deleted that still depend on it must go first.
///
/// An edge that would close a cycle is left out. That only happens when a
/// still-declared resource moved its dependency from the deleted record to
/// the replaced one.
fn wait_for_doomed_dependents(entries: &mut [PlanEntry]) {
  let position: HashMap<ResourceId, usize> = entries
    .iter()
    .enumerate()
    .map(|(i, e)| (e.id.clone(), i))
    .collect();

  let mut candidates: Vec<(usize, usize)> = Vec::new();
  for (doomed, entry) in entries.iter().enumerate() {
    if entry.operation != Operation::Delete {
      continue;
    }
    let Some(record) = &entry.prior else {
      continue;
    };
    for dep in &record.dependencies {
      match position.get(dep) {
        Some(&replaced) if entries[replaced].operation == Operation::Replace => {
          candidates.push((replaced, doomed));
        }
        _ => {}
      }
    }
  }

  for (replaced, doomed) in candidates {
    let doomed_id = entries[doomed].id.clone();
    if entries[replaced].depends_on.contains(&doomed_id) {
      continue;
    }
    if reaches(entries, &position, doomed, replaced) {
      warn!(
        node_id = %entries[replaced].id,
        dependent = %doomed_id,
        "replace_order_conflict"
      );
      continue;
    }
    entries[replaced].depends_on.push(doomed_id);
  }
}

/// Whether `to` is reachable from `from` by following `depends_on`.
fn reaches(
  entries: &[PlanEntry],
  position: &HashMap<ResourceId, usize>,
  from: usize,
  to: usize,
) -> bool {
  let mut seen = vec![false; entries.len()];
  let mut stack = vec![from];
  while let Some(i) = stack.pop() {
    if i == to {
      return true;
    }
    if std::mem::replace(&mut seen[i], true) {
      continue;
    }
    stack.extend(entries[i].depends_on.iter().filter_map(|d| position.get(d).copied()));
  }
  false
}

/// Reorder so every entry follows its `depends_on`, keeping the current
/// position as the tie-breaker. An already ordered list is left as is.
fn dependency_order(entries: Vec<PlanEntry>) -> Vec<PlanEntry> {
  let position: HashMap<&ResourceId, usize> = entries
    .iter()
    .enumerate()
    .map(|(i, e)| (&e.id, i))
    .collect();

  let mut waiting = vec![0; entries.len()];
  let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
  for (i, entry) in entries.iter().enumerate() {
    for dep in &entry.depends_on {
      if let Some(&j) = position.get(dep) {
        waiting[i] += 1;
        dependents[j].push(i);
      }
    }
  }

  let mut ready: BinaryHeap<Reverse<usize>> = (0..entries.len())
    .filter(|&i| waiting[i] == 0)
    .map(Reverse)
    .collect();
  let mut order = Vec::with_capacity(entries.len());
  while let Some(Reverse(i)) = ready.pop() {
    order.push(i);
    for &dependent in &dependents[i] {
      waiting[dependent] -= 1;
      if waiting[dependent] == 0 {
        ready.push(Reverse(dependent));
      }
    }
  }
  if order.len() < entries.len() {
    return entries;
  }

  let mut slots: Vec<Option<PlanEntry>> = entries.into_iter().map(Some).collect();
  order.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Declared nodes are checked against their current declaration, so dropping
/// `protect` and replacing can happen in one run. Deletes use the recorded flag.
fn check_protected(id: &ResourceId, protect: bool, operation: Operation) -> Result<(), PlanError> {
  if protect {
    return Err(PlanError::ProtectedResource {
      id: id.clone(),
      operation,
    });
  }
  Ok(())
}

/// Property keys whose desired value differs from the recorded one.
///
/// A reference compares equal only when the referenced resource is not
/// itself changing in this plan.
fn diff_properties(
  desired: &PropertyMap,
  recorded: &PropertyMap,
  changed_nodes: &HashSet<ResourceId>,
) -> Vec<String> {
  let keys: BTreeSet<&String> = desired.keys().chain(recorded.keys()).collect();
  keys
    .into_iter()
    .filter(|key| match (desired.get(*key), recorded.get(*key)) {
      (Some(want), Some(have)) => !value_unchanged(want, have, changed_nodes),
      _ => true,
    })
    .cloned()
    .collect()
}

fn value_unchanged(want: &Value, have: &Value, changed_nodes: &HashSet<ResourceId>) -> bool {
  want == have
    && want
      .references()
      .into_iter()
      .all(|r| !changed_nodes.contains(&r.resource))
}

/// Order `doomed` so that every record comes before the records it depended
/// on. Ties are broken by resource id.
fn delete_order<'a>(
  doomed: &BTreeSet<&'a ResourceId>,
  prior: &'a PriorState,
) -> Vec<&'a ResourceId> {
  // Count, for each doomed record, how many doomed records depend on it.
  let mut pending: HashMap<&ResourceId, usize> = doomed.iter().map(|id| (*id, 0)).collect();
  for id in doomed {
    for dep in deps_within(id, doomed, prior) {
      if let Some(count) = pending.get_mut(dep) {
        *count += 1;
      }
    }
  }

  let mut ready: BinaryHeap<Reverse<&ResourceId>> = pending
    .iter()
    .filter(|(_, count)| **count == 0)
    .map(|(id, _)| Reverse(*id))
    .collect();
  let mut order = Vec::with_capacity(doomed.len());

  while let Some(Reverse(id)) = ready.pop() {
    order.push(id);
    for dep in deps_within(id, doomed, prior) {
      if let Some(count) = pending.get_mut(dep) {
        *count -= 1;
        if *count == 0 {
          ready.push(Reverse(dep));
        }
      }
    }
  }

  // Recorded dependencies can only form a cycle if state was edited by hand.
  // Delete whatever remains in id order rather than refusing.
  if order.len() < doomed.len() {
    let placed: HashSet<&ResourceId> = order.iter().copied().collect();
    order.extend(doomed.iter().copied().filter(|id| !placed.contains(id)));
  }
  order
}

fn deps_within<'a>(
  id: &ResourceId,
  doomed: &BTreeSet<&'a ResourceId>,
  prior: &'a PriorState,
) -> Vec<&'a ResourceId> {
  let mut deps: Vec<&ResourceId> = prior
    .get(id)
    .map(|r| r.dependencies.iter().filter(|d| doomed.contains(d)).collect())
    .unwrap_or_default();
  deps.sort();
  deps.dedup();
  deps
}

fn join<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> String {
  items
    .into_iter()
    .map(|s| s.as_ref().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}
