//! Error types for the outer solve layer.

use gt_core::CoreError;
use gt_graph::NetworkError;
use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Finite-difference step has {found} entries, system order is {expected}")]
    StepMismatch { expected: usize, found: usize },

    #[error("Vector has {found} entries, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Singular Jacobian at Newton iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error("Newton did not converge in {iterations} iterations (residual norm {residual_norm:e})")]
    NotConverged {
        iterations: usize,
        residual_norm: f64,
    },

    #[error("Network relaxation did not converge in {iterations} passes (residual {residual:e})")]
    RelaxationNotConverged { iterations: usize, residual: f64 },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
