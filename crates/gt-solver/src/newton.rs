//! Newton-Raphson with a numerically estimated Jacobian.
//!
//! Each iteration builds the Jacobian by forward differences with a fixed,
//! caller-supplied step per unknown, solves `J dx = -y` directly and takes
//! the full step. There is no line search or step control: an
//! ill-conditioned system can diverge, which surfaces as
//! [`SolverError::NotConverged`] once the iteration limit is spent.

use gt_core::{CoreError, ensure_finite};
use nalgebra::DVector;

use crate::error::{SolverError, SolverResult};
use crate::jacobian::forward_difference_jacobian;
use crate::system::EquationSystem;

/// Settings for an outer Newton solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct NewtonConfig {
    /// Residual 2-norm accepted as a root.
    pub precision: f64,
    /// Maximum number of Newton steps.
    pub iteration_limit: usize,
    /// Finite-difference step applied to every unknown.
    pub step: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            precision: 1e-8,
            iteration_limit: 50,
            step: 1e-6,
        }
    }
}

impl NewtonConfig {
    pub fn validate(&self) -> SolverResult<()> {
        if self.precision.is_nan() || self.precision < 0.0 {
            return Err(CoreError::OutOfRange {
                what: "precision",
                value: self.precision,
                range: "[0, inf)",
            }
            .into());
        }
        check_step(self.step)
    }

    /// Solver using `step` for each of `order` unknowns.
    pub fn solver(&self, order: usize) -> SolverResult<NewtonSolver> {
        self.validate()?;
        NewtonSolver::new(vec![self.step; order])
    }
}

fn check_step(h: f64) -> SolverResult<()> {
    ensure_finite(h, "step")?;
    if h <= 0.0 {
        return Err(CoreError::OutOfRange {
            what: "step",
            value: h,
            range: "(0, inf)",
        }
        .into());
    }
    Ok(())
}

/// A root found by [`NewtonSolver::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonReport {
    pub x: DVector<f64>,
    pub residual_norm: f64,
    /// Newton steps taken.
    pub iterations: usize,
}

/// Newton-Raphson solver holding the per-dimension difference steps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonSolver {
    steps: Vec<f64>,
}

impl NewtonSolver {
    /// Every step must be finite and strictly positive.
    pub fn new(steps: Vec<f64>) -> SolverResult<Self> {
        for &h in &steps {
            check_step(h)?;
        }
        Ok(Self { steps })
    }

    /// Find `x` with `|f(x)|_2 <= precision`, starting from `x0`.
    ///
    /// The seed itself is never accepted: at least one step is taken, and
    /// running out of iterations is an error.
    pub fn solve<S>(
        &self,
        system: &mut S,
        x0: DVector<f64>,
        precision: f64,
        iteration_limit: usize,
    ) -> SolverResult<NewtonReport>
    where
        S: EquationSystem + ?Sized,
    {
        let n = system.order();
        if self.steps.len() != n {
            return Err(SolverError::StepMismatch {
                expected: n,
                found: self.steps.len(),
            });
        }
        check_len(n, x0.len())?;

        let mut x = x0;
        let mut y = system.residuals(&x)?;
        check_len(n, y.len())?;

        for iteration in 1..=iteration_limit {
            let jac = forward_difference_jacobian(system, &x, &y, &self.steps)?;
            let dx = jac
                .lu()
                .solve(&(-&y))
                .ok_or(SolverError::SingularJacobian { iteration })?;

            let x_new = &x + dx;
            let y_new = system.residuals(&x_new)?;
            check_len(n, y_new.len())?;
            let norm = y_new.norm();
            tracing::debug!(iteration, residual_norm = norm, "newton step");

            if norm <= precision {
                tracing::info!(iterations = iteration, residual_norm = norm, "newton converged");
                return Ok(NewtonReport {
                    x: x_new,
                    residual_norm: norm,
                    iterations: iteration,
                });
            }
            x = x_new;
            y = y_new;
        }

        let residual_norm = y.norm();
        tracing::warn!(iteration_limit, residual_norm, "newton iteration limit reached");
        Err(SolverError::NotConverged {
            iterations: iteration_limit,
            residual_norm,
        })
    }

    /// [`solve`](Self::solve) with precision and limit from `config`.
    pub fn solve_with<S>(
        &self,
        system: &mut S,
        x0: DVector<f64>,
        config: &NewtonConfig,
    ) -> SolverResult<NewtonReport>
    where
        S: EquationSystem + ?Sized,
    {
        config.validate()?;
        self.solve(system, x0, config.precision, config.iteration_limit)
    }
}

fn check_len(expected: usize, found: usize) -> SolverResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(SolverError::DimensionMismatch { expected, found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::FnSystem;

    fn v(x: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(x)
    }

    #[test]
    fn shifted_identity() {
        let mut sys = FnSystem::new(1, |x: &DVector<f64>| Ok(v(&[x[0] - 1.0])));
        let newton = NewtonSolver::new(vec![1e-4]).unwrap();
        let report = newton.solve(&mut sys, v(&[0.0]), 1e-9, 100).unwrap();
        assert!((report.x[0] - 1.0).abs() < 1e-5);
        assert!(report.iterations < 5);
    }

    #[test]
    fn linear_pair() {
        let mut sys = FnSystem::new(2, |x: &DVector<f64>| {
            Ok(v(&[x[0] + x[1] - 3.0, x[0] - x[1] - 1.0]))
        });
        let newton = NewtonSolver::new(vec![1e-6, 1e-6]).unwrap();
        let report = newton.solve(&mut sys, v(&[0.0, 0.0]), 1e-9, 20).unwrap();
        assert!((report.x[0] - 2.0).abs() < 1e-6);
        assert!((report.x[1] - 1.0).abs() < 1e-6);
        assert!(report.residual_norm <= 1e-9);
    }

    #[test]
    fn quadratic_positive_root() {
        let mut sys = FnSystem::new(1, |x: &DVector<f64>| Ok(v(&[x[0] * x[0] - 4.0])));
        let report = NewtonConfig::default()
            .solver(1)
            .unwrap()
            .solve_with(&mut sys, v(&[3.0]), &NewtonConfig::default())
            .unwrap();
        assert!((report.x[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn seed_is_not_accepted_without_a_step() {
        let mut calls = 0;
        let mut sys = FnSystem::new(1, |x: &DVector<f64>| {
            calls += 1;
            Ok(v(&[x[0] - 1.0]))
        });
        let newton = NewtonSolver::new(vec![0.5]).unwrap();
        let report = newton.solve(&mut sys, v(&[1.0]), 1e-12, 10).unwrap();
        assert_eq!(report.iterations, 1);
        // seed, one Jacobian column, one step
        drop(sys);
        assert_eq!(calls, 3);
    }

    #[test]
    fn step_count_must_match_order() {
        let mut sys = FnSystem::new(2, |x: &DVector<f64>| Ok(x.clone()));
        let newton = NewtonSolver::new(vec![1e-6]).unwrap();
        assert_eq!(
            newton.solve(&mut sys, v(&[0.0, 0.0]), 1e-9, 10).unwrap_err(),
            SolverError::StepMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn residual_length_is_checked() {
        let mut sys = FnSystem::new(2, |_: &DVector<f64>| Ok(v(&[1.0])));
        let newton = NewtonSolver::new(vec![1e-6, 1e-6]).unwrap();
        assert_eq!(
            newton.solve(&mut sys, v(&[0.0, 0.0]), 1e-9, 10).unwrap_err(),
            SolverError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn singular_jacobian_is_reported() {
        let mut sys = FnSystem::new(2, |x: &DVector<f64>| {
            Ok(v(&[x[0] + x[1], x[0] + x[1] - 1.0]))
        });
        let newton = NewtonSolver::new(vec![0.5, 0.5]).unwrap();
        assert_eq!(
            newton.solve(&mut sys, v(&[0.0, 0.0]), 1e-9, 10).unwrap_err(),
            SolverError::SingularJacobian { iteration: 1 }
        );
    }

    #[test]
    fn exhausted_limit_is_an_error() {
        let mut sys = FnSystem::new(1, |x: &DVector<f64>| Ok(v(&[x[0] * x[0] + 1.0])));
        let newton = NewtonSolver::new(vec![1e-3]).unwrap();
        match newton.solve(&mut sys, v(&[3.0]), 1e-9, 5).unwrap_err() {
            SolverError::NotConverged {
                iterations,
                residual_norm,
            } => {
                assert_eq!(iterations, 5);
                assert!(residual_norm >= 1.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn residual_failure_propagates() {
        let mut sys = FnSystem::new(1, |_: &DVector<f64>| {
            Err(SolverError::DimensionMismatch {
                expected: 1,
                found: 0,
            })
        });
        let newton = NewtonSolver::new(vec![1e-6]).unwrap();
        assert!(newton.solve(&mut sys, v(&[0.0]), 1e-9, 10).is_err());
    }

    #[test]
    fn config_rejects_bad_values() {
        let bad_step = NewtonConfig {
            step: 0.0,
            ..NewtonConfig::default()
        };
        assert!(matches!(
            bad_step.validate(),
            Err(SolverError::Core(CoreError::OutOfRange { what: "step", .. }))
        ));
        let bad_precision = NewtonConfig {
            precision: -1.0,
            ..NewtonConfig::default()
        };
        assert!(bad_precision.validate().is_err());
        assert!(NewtonSolver::new(vec![f64::NAN]).is_err());
        assert!(NewtonConfig::default().validate().is_ok());
    }
}
