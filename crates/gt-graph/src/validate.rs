//! Pre-solve validation.

use gt_core::NodeId;

use crate::error::{NetworkError, NetworkResult};
use crate::network::NodeEntry;
use crate::port::PortArena;

/// Every port must be linked and every node's context defined.
///
/// Ports are checked for the whole network first, so a wiring mistake is
/// reported before any configuration gap.
pub(crate) fn validate_network(nodes: &[NodeEntry], ports: &PortArena) -> NetworkResult<()> {
    for (i, entry) in nodes.iter().enumerate() {
        for &(tag, port) in &entry.ports {
            if ports.get(port).peer().is_none() {
                return Err(NetworkError::FreePort {
                    node: NodeId::try_from_usize(i)?,
                    name: entry.node.name().to_string(),
                    tag,
                });
            }
        }
    }

    for (i, entry) in nodes.iter().enumerate() {
        if !entry.node.context_defined() {
            return Err(NetworkError::ContextUndefined {
                node: NodeId::try_from_usize(i)?,
                name: entry.node.name().to_string(),
            });
        }
    }

    Ok(())
}
