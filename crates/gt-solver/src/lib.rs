//! gt-solver: outer Newton-Raphson layer over relaxed networks.
//!
//! Provides:
//! - `EquationSystem`, the square "vector in, residuals out" contract
//! - Forward-difference Jacobian with a fixed step per unknown
//! - `NewtonSolver` and its `NewtonConfig`
//! - `Variator`, a getter/setter binding to an external scalar
//! - The system-call bridge from a `Network` to a residual vector
//! - `VariatorSolver`, which drives variators until the bridge reads zero

pub mod bridge;
pub mod error;
pub mod jacobian;
pub mod newton;
pub mod system;
pub mod variator;
pub mod variator_solver;

pub use bridge::{NetworkCall, SystemCall, system_call};
pub use error::{SolverError, SolverResult};
pub use jacobian::forward_difference_jacobian;
pub use newton::{NewtonConfig, NewtonReport, NewtonSolver};
pub use system::{EquationSystem, FnSystem};
pub use variator::Variator;
pub use variator_solver::VariatorSolver;
