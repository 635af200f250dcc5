//! Network: node collection plus the fixed-point relaxation engine.
//!
//! A solve validates the wiring, orders the nodes once, then repeats full
//! passes over the call order until no port value moves by more than the
//! requested precision. A full pass (rather than an incremental one) is
//! needed because cycle breakers feed results of one pass into nodes that
//! ran earlier in it.

use gt_core::{CoreError, NodeId, PortId, ensure_finite};

use crate::error::{NetworkError, NetworkResult};
use crate::node::{Node, PortIo, PortView};
use crate::order::Dependencies;
use crate::port::{Port, PortArena, PortTag};
use crate::state::PortState;
use crate::validate::validate_network;

/// Consecutive residual increases that trigger the divergence warning.
const DIVERGENCE_WINDOW: usize = 5;

/// Parameters of a relaxation solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RelaxConfig {
    /// Relaxation coefficient. Any finite value is accepted.
    ///
    /// Not applied: each pass replaces port values outright.
    /// Per-loop blending is available through `CycleBreaker::with_relaxation`.
    pub relax_coef: f64,
    /// Maximum number of full passes.
    pub max_iterations: usize,
    /// Largest port residual accepted as converged.
    pub precision: f64,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            relax_coef: 1.0,
            max_iterations: 100,
            precision: 1e-6,
        }
    }
}

impl RelaxConfig {
    pub fn new(relax_coef: f64, max_iterations: usize, precision: f64) -> Self {
        Self {
            relax_coef,
            max_iterations,
            precision,
        }
    }

    pub fn validate(&self) -> NetworkResult<()> {
        ensure_finite(self.relax_coef, "relax_coef")?;
        if self.precision.is_nan() || self.precision < 0.0 {
            return Err(CoreError::OutOfRange {
                what: "precision",
                value: self.precision,
                range: "[0, inf)",
            }
            .into());
        }
        Ok(())
    }
}

/// Outcome of [`Network::solve`].
///
/// An exhausted budget is `converged == false`, not an error: the network is
/// left at the last state reached and the caller decides what to do.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub converged: bool,
    /// Passes performed.
    pub iterations: usize,
    /// Residual of the last pass (`inf` if none ran).
    pub residual: f64,
    /// Residual after each pass.
    pub history: Vec<f64>,
    /// Residual grew for several passes in a row at some point.
    pub diverging: bool,
}

pub(crate) struct NodeEntry {
    pub(crate) node: Box<dyn Node>,
    pub(crate) ports: Vec<(PortTag, PortId)>,
}

/// Owned collection of nodes and their linked ports.
#[derive(Default)]
pub struct Network {
    nodes: Vec<NodeEntry>,
    ports: PortArena,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, allocating one port per declared tag.
    pub fn add_node(&mut self, node: impl Node + 'static) -> NetworkResult<NodeId> {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn Node>) -> NetworkResult<NodeId> {
        let id = NodeId::try_from_usize(self.nodes.len())?;
        let tags = node.port_tags();
        let mut ports = Vec::with_capacity(tags.len());
        for (i, &tag) in tags.iter().enumerate() {
            if tags[..i].contains(&tag) {
                return Err(NetworkError::DuplicatePort { node: id, tag });
            }
            ports.push((tag, self.ports.push(id, tag)?));
        }
        self.nodes.push(NodeEntry { node, ports });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handle of port `tag` on `node`.
    pub fn port(&self, node: NodeId, tag: PortTag) -> NetworkResult<PortId> {
        self.entry(node)?
            .ports
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, id)| *id)
            .ok_or(NetworkError::UnknownPort { node, tag })
    }

    pub fn port_info(&self, id: PortId) -> Option<&Port> {
        (id.index() < self.ports.len()).then(|| self.ports.get(id))
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Link two ports of different nodes. Re-linking replaces earlier links.
    pub fn link(&mut self, from: (NodeId, PortTag), to: (NodeId, PortTag)) -> NetworkResult<()> {
        let a = self.port(from.0, from.1)?;
        let b = self.port(to.0, to.1)?;
        self.ports.link(a, b)
    }

    pub fn state(&self, node: NodeId, tag: PortTag) -> NetworkResult<Option<&PortState>> {
        let id = self.port(node, tag)?;
        Ok(self.ports.get(id).state())
    }

    /// Seed a port (and its linked peer) with a value.
    pub fn set_state(&mut self, node: NodeId, tag: PortTag, state: PortState) -> NetworkResult<()> {
        let id = self.port(node, tag)?;
        self.ports.set(id, state);
        Ok(())
    }

    /// Components of a vector port.
    pub fn vector(&self, node: NodeId, tag: PortTag) -> NetworkResult<Vec<f64>> {
        match self.state(node, tag)? {
            Some(PortState::Vector(v)) => Ok(v.clone()),
            Some(other) => Err(NetworkError::NotVector {
                node,
                tag,
                found: other.kind(),
            }),
            None => Err(NetworkError::EmptyPort { node, tag }),
        }
    }

    /// Requires/produces tables derived from port roles and links.
    ///
    /// Node `n` requires node `m` when one of `n`'s required ports is linked
    /// to a port that `m` updates.
    pub fn dependencies(&self) -> NetworkResult<Dependencies> {
        let mut deps = Dependencies::default();
        for (i, entry) in self.nodes.iter().enumerate() {
            let node = NodeId::try_from_usize(i)?;
            deps.add_node(node);
            for &tag in entry.node.updated_ports() {
                self.port(node, tag)?;
            }
            for &tag in entry.node.required_ports() {
                let port = self.ports.get(self.port(node, tag)?);
                let Some(peer) = port.peer() else {
                    continue;
                };
                let peer = self.ports.get(peer);
                let provider = self.entry(peer.node)?;
                if provider.node.updated_ports().contains(&peer.tag) {
                    deps.add_edge(peer.node, node);
                }
            }
        }
        Ok(deps)
    }

    /// Validate the wiring and compute the call order a solve would use.
    pub fn call_order(&mut self) -> NetworkResult<Vec<NodeId>> {
        validate_network(&self.nodes, &self.ports)?;
        self.resolve_ports();
        self.dependencies()?.call_order()
    }

    /// Relax the network to a fixed point.
    pub fn solve(&mut self, config: &RelaxConfig) -> NetworkResult<SolveReport> {
        config.validate()?;
        let order = self.call_order()?;
        tracing::debug!(nodes = order.len(), "call order computed");

        let mut before = self.ports.snapshot();
        let mut history = Vec::with_capacity(config.max_iterations.min(1024));
        let mut diverging = false;

        for iteration in 1..=config.max_iterations {
            self.run_pass(&order)?;
            let after = self.ports.snapshot();
            let residual = self.residual(&before, &after)?;
            history.push(residual);
            tracing::debug!(iteration, residual, "relaxation pass");

            if residual <= config.precision {
                tracing::info!(iterations = iteration, residual, "network converged");
                return Ok(SolveReport {
                    converged: true,
                    iterations: iteration,
                    residual,
                    history,
                    diverging,
                });
            }

            if !diverging && rising(&history) {
                diverging = true;
                tracing::warn!(
                    iteration,
                    residual,
                    "relaxation residual has grown for {DIVERGENCE_WINDOW} passes"
                );
            }
            before = after;
        }

        let residual = history.last().copied().unwrap_or(f64::INFINITY);
        tracing::warn!(
            max_iterations = config.max_iterations,
            residual,
            "relaxation budget exhausted"
        );
        Ok(SolveReport {
            converged: false,
            iterations: config.max_iterations,
            residual,
            history,
            diverging,
        })
    }

    fn entry(&self, id: NodeId) -> NetworkResult<&NodeEntry> {
        self.nodes
            .get(id.index())
            .ok_or(NetworkError::UnknownNode { node: id })
    }

    fn resolve_ports(&mut self) {
        for entry in self.nodes.iter_mut() {
            let view = PortView::new(&self.ports, &entry.ports);
            entry.node.resolve_ports(&view);
        }
    }

    fn run_pass(&mut self, order: &[NodeId]) -> NetworkResult<()> {
        for &id in order {
            let NodeEntry { node, ports } = self
                .nodes
                .get_mut(id.index())
                .ok_or(NetworkError::UnknownNode { node: id })?;
            let mut io = PortIo::new(&mut self.ports, &ports[..]);
            node.process(&mut io)
                .map_err(|source| NetworkError::Process {
                    node: id,
                    name: node.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Max residual over ports that hold a value in both snapshots.
    fn residual(
        &self,
        before: &[Option<PortState>],
        after: &[Option<PortState>],
    ) -> NetworkResult<f64> {
        if before.len() != after.len() {
            return Err(NetworkError::SnapshotMismatch {
                before: before.len(),
                after: after.len(),
            });
        }
        let mut max = 0.0_f64;
        for (port, (b, a)) in self.ports.iter().zip(before.iter().zip(after)) {
            let (Some(b), Some(a)) = (b, a) else {
                continue;
            };
            let r = b.max_residual(a).map_err(|source| NetworkError::Residual {
                node: port.node,
                tag: port.tag,
                source,
            })?;
            max = max.max(r);
        }
        Ok(max)
    }
}

fn rising(history: &[f64]) -> bool {
    history.len() > DIVERGENCE_WINDOW
        && history[history.len() - DIVERGENCE_WINDOW - 1..]
            .windows(2)
            .all(|w| w[1] > w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Constant, Formula};

    #[test]
    fn config_validation() {
        assert!(RelaxConfig::default().validate().is_ok());
        assert!(RelaxConfig::new(1.5, 10, 1e-6).validate().is_ok());
        assert!(RelaxConfig::new(-0.2, 10, 1e-6).validate().is_ok());
        assert!(RelaxConfig::new(f64::INFINITY, 10, 1e-6).validate().is_err());
        assert!(RelaxConfig::new(0.5, 10, -1.0).validate().is_err());
        assert!(RelaxConfig::new(0.5, 10, f64::NAN).validate().is_err());
    }

    #[test]
    fn duplicate_port_tags_are_rejected() {
        let mut net = Network::new();
        let node = Formula::new("dup", &["x"], &["x"], |s| Ok(s.to_vec()));
        assert!(matches!(
            net.add_node(node),
            Err(NetworkError::DuplicatePort { tag: "x", .. })
        ));
    }

    #[test]
    fn ports_are_allocated_per_tag() {
        let mut net = Network::new();
        let a = net
            .add_node(Constant::new("a", PortState::Scalar(1.0)))
            .unwrap();
        let p = net.port(a, "out").unwrap();
        let info = net.port_info(p).unwrap();
        assert_eq!(info.node, a);
        assert_eq!(info.tag, "out");
        assert!(net.port(a, "in").is_err());
        assert_eq!(net.ports().count(), 1);
    }

    #[test]
    fn rising_needs_a_full_window() {
        assert!(!rising(&[1.0, 2.0, 3.0]));
        assert!(rising(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert!(!rising(&[1.0, 2.0, 3.0, 2.5, 5.0, 6.0]));
    }
}
