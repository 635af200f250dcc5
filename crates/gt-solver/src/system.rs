//! The "vector in, residual vector out" abstraction.

use nalgebra::DVector;

use crate::error::SolverResult;

/// A square nonlinear system `f(x) = 0`.
///
/// `residuals` takes `&mut self` because evaluating a residual may drive
/// side effects, such as relaxing a whole network.
pub trait EquationSystem {
    /// Number of unknowns, which is also the number of residuals.
    fn order(&self) -> usize;

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;
}

/// Closure-backed [`EquationSystem`].
pub struct FnSystem<F> {
    order: usize,
    f: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    pub fn new(order: usize, f: F) -> Self {
        Self { order, f }
    }
}

impl<F> EquationSystem for FnSystem<F>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    fn order(&self) -> usize {
        self.order
    }

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        (self.f)(x)
    }
}
