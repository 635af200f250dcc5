//! Newton over relaxation.
//!
//! The unknowns are variators. Each residual evaluation writes the trial
//! values into the variators and runs a full inner relaxation through a
//! [`SystemCall`], so every Newton step costs `order + 1` network solves.

use nalgebra::DVector;

use crate::bridge::SystemCall;
use crate::error::{SolverError, SolverResult};
use crate::newton::{NewtonConfig, NewtonReport, NewtonSolver};
use crate::system::EquationSystem;
use crate::variator::Variator;

pub struct VariatorSolver<C> {
    variators: Vec<Variator>,
    call: C,
    newton: NewtonSolver,
}

impl<C: SystemCall> VariatorSolver<C> {
    pub fn new(variators: Vec<Variator>, call: C, newton: NewtonSolver) -> Self {
        Self {
            variators,
            call,
            newton,
        }
    }

    /// Uniform difference step from `config` for every variator.
    pub fn with_config(
        variators: Vec<Variator>,
        call: C,
        config: &NewtonConfig,
    ) -> SolverResult<Self> {
        let newton = config.solver(variators.len())?;
        Ok(Self::new(variators, call, newton))
    }

    pub fn variators(&self) -> &[Variator] {
        &self.variators
    }

    pub fn into_call(self) -> C {
        self.call
    }

    /// Current variator values, used as the Newton seed.
    pub fn init(&self) -> DVector<f64> {
        DVector::from_iterator(self.variators.len(), self.variators.iter().map(|v| v.get()))
    }

    fn apply(&mut self, x: &DVector<f64>) {
        for (var, &value) in self.variators.iter_mut().zip(x.iter()) {
            var.set(value);
        }
    }

    /// Drive the residuals to zero from the current variator values.
    ///
    /// On success the root is left in the variators. On failure they hold
    /// the last trial point.
    pub fn solve(&mut self, precision: f64, iteration_limit: usize) -> SolverResult<NewtonReport> {
        let newton = self.newton.clone();
        let x0 = self.init();
        tracing::debug!(order = x0.len(), "variator solve started");
        let report = newton.solve(self, x0, precision, iteration_limit)?;
        self.apply(&report.x);
        Ok(report)
    }

    pub fn solve_with(&mut self, config: &NewtonConfig) -> SolverResult<NewtonReport> {
        config.validate()?;
        self.solve(config.precision, config.iteration_limit)
    }
}

impl<C: SystemCall> EquationSystem for VariatorSolver<C> {
    fn order(&self) -> usize {
        self.variators.len()
    }

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        if x.len() != self.variators.len() {
            return Err(SolverError::DimensionMismatch {
                expected: self.variators.len(),
                found: x.len(),
            });
        }
        self.apply(x);
        let y = self.call.call()?;
        if y.len() != self.variators.len() {
            return Err(SolverError::DimensionMismatch {
                expected: self.variators.len(),
                found: y.len(),
            });
        }
        Ok(y)
    }
}
