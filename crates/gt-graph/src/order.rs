//! Connectivity tables and call order.
//!
//! Nodes are scheduled layer by layer: every node whose providers have all
//! been scheduled joins the next layer. Within a layer nodes keep their
//! declaration order, so the result is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use gt_core::NodeId;

use crate::error::{NetworkError, NetworkResult};

/// Node -> set of related nodes.
pub type DependencyTable = BTreeMap<NodeId, BTreeSet<NodeId>>;

/// The two views of the same dependency relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Node -> providers that must run before it.
    pub requires: DependencyTable,
    /// Node -> consumers waiting on it.
    pub produces: DependencyTable,
}

impl Dependencies {
    /// Register `node` with no relations yet.
    pub fn add_node(&mut self, node: NodeId) {
        self.requires.entry(node).or_default();
        self.produces.entry(node).or_default();
    }

    /// Record that `consumer` must run after `provider`.
    pub fn add_edge(&mut self, provider: NodeId, consumer: NodeId) {
        self.add_node(provider);
        self.add_node(consumer);
        if let Some(r) = self.requires.get_mut(&consumer) {
            r.insert(provider);
        }
        if let Some(p) = self.produces.get_mut(&provider) {
            p.insert(consumer);
        }
    }

    /// Layered topological order of every node, or the nodes of a cycle.
    pub fn call_order(&self) -> NetworkResult<Vec<NodeId>> {
        call_order(&self.requires, &self.produces)
    }
}

/// Compute a call order consistent with `requires`, using `produces` to
/// release consumers as their providers are scheduled.
pub fn call_order(
    requires: &DependencyTable,
    produces: &DependencyTable,
) -> NetworkResult<Vec<NodeId>> {
    let mut pending = requires.clone();
    let mut order = Vec::with_capacity(pending.len());

    let mut front = ready(&pending);
    if front.is_empty() && !pending.is_empty() {
        return Err(NetworkError::NoStartNodes {
            cycle: cyclic_core(&pending),
        });
    }

    while !front.is_empty() {
        for node in &front {
            pending.remove(node);
        }
        for node in &front {
            let Some(consumers) = produces.get(node) else {
                continue;
            };
            for consumer in consumers {
                if let Some(r) = pending.get_mut(consumer) {
                    r.remove(node);
                }
            }
        }
        order.extend_from_slice(&front);
        front = ready(&pending);
    }

    if pending.is_empty() {
        Ok(order)
    } else {
        Err(NetworkError::Cycle {
            nodes: cyclic_core(&pending),
        })
    }
}

fn ready(pending: &DependencyTable) -> Vec<NodeId> {
    pending
        .iter()
        .filter(|(_, providers)| providers.is_empty())
        .map(|(&node, _)| node)
        .collect()
}

/// Unresolved nodes that lie on a cycle.
///
/// Nodes downstream of a cycle, or on a path between two cycles, are
/// unresolved as well but depend on nothing that depends back on them.
fn cyclic_core(pending: &DependencyTable) -> Vec<NodeId> {
    pending
        .keys()
        .copied()
        .filter(|&node| reaches_itself(pending, node))
        .collect()
}

/// Whether following providers from `start` leads back to `start`.
fn reaches_itself(pending: &DependencyTable, start: NodeId) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<NodeId> = pending.get(&start).into_iter().flatten().copied().collect();
    while let Some(node) = stack.pop() {
        if node == start {
            return true;
        }
        if seen.insert(node) {
            if let Some(providers) = pending.get(&node) {
                stack.extend(providers.iter().copied());
            }
        }
    }
    false
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Random DAG over `n` nodes with shuffled declaration positions.
    fn dag() -> impl Strategy<Value = (Vec<u32>, Vec<(usize, usize)>)> {
        (1usize..12).prop_flat_map(|n| {
            let perm = Just((0..n as u32).collect::<Vec<_>>()).prop_shuffle();
            let edges = prop::collection::vec(any::<bool>(), n * n).prop_map(move |bits| {
                let mut edges = Vec::new();
                for i in 0..n {
                    for j in (i + 1)..n {
                        if bits[i * n + j] {
                            edges.push((i, j));
                        }
                    }
                }
                edges
            });
            (perm, edges)
        })
    }

    proptest! {
        #[test]
        fn order_respects_every_dependency((perm, edges) in dag()) {
            let id = |i: usize| NodeId::from_index(perm[i]);
            let mut d = Dependencies::default();
            for i in 0..perm.len() {
                d.add_node(id(i));
            }
            for &(p, c) in &edges {
                d.add_edge(id(p), id(c));
            }

            let order = d.call_order().unwrap();
            prop_assert_eq!(order.len(), perm.len());
            let pos = |n: NodeId| order.iter().position(|&o| o == n).unwrap();
            for &(p, c) in &edges {
                prop_assert!(pos(id(p)) < pos(id(c)));
            }
        }
    }
}
