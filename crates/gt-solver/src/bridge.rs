//! Turning "relax the network, read the residual port" into a function.
//!
//! The outer Newton loop only sees a residual vector. Producing it means
//! running the inner relaxation to convergence with whatever values the
//! variators currently hold, then reading the vector assembled on one
//! distinguished port.

use gt_core::NodeId;
use gt_graph::{Network, PortTag, RelaxConfig};
use nalgebra::DVector;

use crate::error::{SolverError, SolverResult};

/// Source of the residual vector for a [`VariatorSolver`](crate::VariatorSolver).
///
/// Implemented by [`NetworkCall`] and by any `FnMut() -> SolverResult<DVector<f64>>`.
pub trait SystemCall {
    fn call(&mut self) -> SolverResult<DVector<f64>>;
}

impl<F> SystemCall for F
where
    F: FnMut() -> SolverResult<DVector<f64>>,
{
    fn call(&mut self) -> SolverResult<DVector<f64>> {
        self()
    }
}

/// Owned network plus the port its residuals are read from.
pub struct NetworkCall {
    network: Network,
    node: NodeId,
    tag: PortTag,
    config: RelaxConfig,
}

impl NetworkCall {
    /// Fails early if the configuration is invalid or the port does not
    /// exist.
    pub fn new(
        network: Network,
        node: NodeId,
        tag: PortTag,
        config: RelaxConfig,
    ) -> SolverResult<Self> {
        config.validate()?;
        network.port(node, tag)?;
        Ok(Self {
            network,
            node,
            tag,
            config,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }
}

impl SystemCall for NetworkCall {
    fn call(&mut self) -> SolverResult<DVector<f64>> {
        relax_and_read(&mut self.network, self.node, self.tag, &self.config)
    }
}

/// Borrowing counterpart of [`NetworkCall`].
pub fn system_call<'a>(
    network: &'a mut Network,
    node: NodeId,
    tag: PortTag,
    config: RelaxConfig,
) -> impl FnMut() -> SolverResult<DVector<f64>> + 'a {
    move || relax_and_read(network, node, tag, &config)
}

fn relax_and_read(
    network: &mut Network,
    node: NodeId,
    tag: PortTag,
    config: &RelaxConfig,
) -> SolverResult<DVector<f64>> {
    let report = network.solve(config)?;
    if !report.converged {
        return Err(SolverError::RelaxationNotConverged {
            iterations: report.iterations,
            residual: report.residual,
        });
    }
    Ok(DVector::from_vec(network.vector(node, tag)?))
}
