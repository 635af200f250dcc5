//! Forward finite-difference Jacobian.

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::system::EquationSystem;

/// Estimate the Jacobian of `system` at `x`.
///
/// `y` must be the residual already evaluated at `x`. Column `i` is
/// `(f(x + h_i e_i) - y) / h_i` with the fixed per-dimension step `h_i`, so
/// the cost is one residual evaluation per unknown.
pub fn forward_difference_jacobian<S>(
    system: &mut S,
    x: &DVector<f64>,
    y: &DVector<f64>,
    steps: &[f64],
) -> SolverResult<DMatrix<f64>>
where
    S: EquationSystem + ?Sized,
{
    let n = x.len();
    if steps.len() != n {
        return Err(SolverError::StepMismatch {
            expected: n,
            found: steps.len(),
        });
    }

    let mut jac = DMatrix::zeros(y.len(), n);
    let mut probe = x.clone();
    for (i, &h) in steps.iter().enumerate() {
        probe[i] = x[i] + h;
        let y_h = system.residuals(&probe)?;
        probe[i] = x[i];
        if y_h.len() != y.len() {
            return Err(SolverError::DimensionMismatch {
                expected: y.len(),
                found: y_h.len(),
            });
        }
        jac.set_column(i, &((y_h - y) / h));
    }
    Ok(jac)
}
