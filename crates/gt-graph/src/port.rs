//! Port arena and linking.
//!
//! Ports are owned by the network and addressed by [`PortId`]. A link is a
//! symmetric pair of peer handles, so the graph of ports may contain cycles
//! without any ownership cycle. Writing a state to a port also writes it to
//! the linked peer: both ends of a link always carry the same value.

use gt_core::{NodeId, PortId};

use crate::error::{NetworkError, NetworkResult};
use crate::state::PortState;

/// Name of a port, unique within its node.
pub type PortTag = &'static str;

/// One attachment point of a node.
#[derive(Debug, Clone)]
pub struct Port {
    pub id: PortId,
    pub node: NodeId,
    pub tag: PortTag,
    pub(crate) peer: Option<PortId>,
    pub(crate) state: Option<PortState>,
}

impl Port {
    /// The port this one is linked to, if any.
    pub fn peer(&self) -> Option<PortId> {
        self.peer
    }

    /// Current value, if anything has been written yet.
    pub fn state(&self) -> Option<&PortState> {
        self.state.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PortArena {
    ports: Vec<Port>,
}

impl PortArena {
    pub(crate) fn push(&mut self, node: NodeId, tag: PortTag) -> NetworkResult<PortId> {
        let id = PortId::try_from_usize(self.ports.len())?;
        self.ports.push(Port {
            id,
            node,
            tag,
            peer: None,
            state: None,
        });
        Ok(id)
    }

    pub(crate) fn get(&self, id: PortId) -> &Port {
        &self.ports[id.index()]
    }

    pub(crate) fn len(&self) -> usize {
        self.ports.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Link `a` and `b`, detaching whatever either was linked to before.
    pub(crate) fn link(&mut self, a: PortId, b: PortId) -> NetworkResult<()> {
        let (pa, pb) = (self.get(a), self.get(b));
        if pa.node == pb.node {
            return Err(NetworkError::SelfLink {
                node: pa.node,
                tag: pb.tag,
            });
        }
        for id in [a, b] {
            if let Some(old) = self.ports[id.index()].peer.take() {
                self.ports[old.index()].peer = None;
            }
        }
        self.ports[a.index()].peer = Some(b);
        self.ports[b.index()].peer = Some(a);
        Ok(())
    }

    /// Replace the value at `id` and at its peer.
    pub(crate) fn set(&mut self, id: PortId, state: PortState) {
        if let Some(peer) = self.ports[id.index()].peer {
            self.ports[peer.index()].state = Some(state.clone());
        }
        self.ports[id.index()].state = Some(state);
    }

    /// Clone every port value, indexed by port handle.
    pub(crate) fn snapshot(&self) -> Vec<Option<PortState>> {
        self.ports.iter().map(|p| p.state.clone()).collect()
    }
}
