//! Node contract.
//!
//! A node is a computational unit that owns a fixed set of named ports. On
//! every relaxation pass the network calls [`Node::process`], which reads the
//! node's required ports and writes its updated ports through a [`PortIo`].

use gt_core::PortId;

use crate::error::{NodeError, NodeResult};
use crate::port::{PortArena, PortTag};
use crate::state::PortState;

/// Trait implemented by every unit that can be placed in a network.
pub trait Node {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    /// All ports this node owns. Each must be linked before solving.
    fn port_tags(&self) -> &[PortTag];

    /// Ports read by `process`. Their producers are scheduled first.
    fn required_ports(&self) -> &[PortTag];

    /// Ports written by `process`.
    fn updated_ports(&self) -> &[PortTag];

    /// Hook for nodes whose port roles depend on which links already carry
    /// values. Called at the start of every solve, before ordering.
    fn resolve_ports(&mut self, _view: &PortView<'_>) {}

    /// Whether the node's configuration is complete.
    fn context_defined(&self) -> bool {
        true
    }

    /// Read required ports, write updated ports.
    ///
    /// Returns an error only for domain-invalid inputs.
    fn process(&mut self, io: &mut PortIo<'_>) -> NodeResult<()>;
}

fn lookup(ports: &[(PortTag, PortId)], tag: PortTag) -> NodeResult<PortId> {
    ports
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, id)| *id)
        .ok_or(NodeError::UnknownPort { tag })
}

/// Read-only view of one node's ports.
pub struct PortView<'a> {
    arena: &'a PortArena,
    ports: &'a [(PortTag, PortId)],
}

impl<'a> PortView<'a> {
    pub(crate) fn new(arena: &'a PortArena, ports: &'a [(PortTag, PortId)]) -> Self {
        Self { arena, ports }
    }

    /// Current value of `tag`, `None` if unset or undeclared.
    pub fn get(&self, tag: PortTag) -> Option<&'a PortState> {
        let id = lookup(self.ports, tag).ok()?;
        self.arena.get(id).state()
    }

    pub fn has_value(&self, tag: PortTag) -> bool {
        self.get(tag).is_some()
    }
}

/// Read/write access to one node's ports during `process`.
pub struct PortIo<'a> {
    arena: &'a mut PortArena,
    ports: &'a [(PortTag, PortId)],
}

impl<'a> PortIo<'a> {
    pub(crate) fn new(arena: &'a mut PortArena, ports: &'a [(PortTag, PortId)]) -> Self {
        Self { arena, ports }
    }

    /// Value of a port that must carry one.
    pub fn get(&self, tag: PortTag) -> NodeResult<&PortState> {
        let id = lookup(self.ports, tag)?;
        self.arena
            .get(id)
            .state()
            .ok_or(NodeError::MissingInput { tag })
    }

    /// Value of a port that may be empty.
    pub fn try_get(&self, tag: PortTag) -> NodeResult<Option<&PortState>> {
        let id = lookup(self.ports, tag)?;
        Ok(self.arena.get(id).state())
    }

    /// Scalar-like value of a required port, in SI base units.
    pub fn scalar(&self, tag: PortTag) -> NodeResult<f64> {
        Ok(self.get(tag)?.as_scalar()?)
    }

    /// Replace the value of `tag` (and of its linked peer).
    pub fn set(&mut self, tag: PortTag, state: PortState) -> NodeResult<()> {
        let id = lookup(self.ports, tag)?;
        self.arena.set(id, state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_core::NodeId;

    #[test]
    fn io_reads_and_writes_declared_ports() {
        let mut arena = PortArena::default();
        let node = NodeId::from_index(0);
        let other = NodeId::from_index(1);
        let out = arena.push(node, "out").unwrap();
        let peer = arena.push(other, "in").unwrap();
        arena.link(out, peer).unwrap();
        let table = [("out", out)];

        let mut io = PortIo::new(&mut arena, &table);
        assert_eq!(io.get("out"), Err(NodeError::MissingInput { tag: "out" }));
        assert_eq!(io.try_get("out"), Ok(None));
        io.set("out", PortState::Scalar(2.5)).unwrap();
        assert_eq!(io.scalar("out"), Ok(2.5));
        assert_eq!(
            io.set("nope", PortState::Scalar(0.0)),
            Err(NodeError::UnknownPort { tag: "nope" })
        );

        assert_eq!(arena.get(peer).state(), Some(&PortState::Scalar(2.5)));
        let view = PortView::new(&arena, &table);
        assert!(view.has_value("out"));
        assert!(!view.has_value("nope"));
    }
}
