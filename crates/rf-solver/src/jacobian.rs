//! Finite difference Jacobian for models that only provide a residual.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use rf_core::{ensure_finite, ensure_positive};

/// Forward-difference Jacobian of `f` at `x`.
///
/// `f_x` is the residual already evaluated at `x`. Column `j` perturbs
/// `x[j]` by `rel_step * max(|x[j]|, 1)`.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    mut f: F,
    rel_step: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    ensure_positive(rel_step, "finite difference step")?;
    let n = x.len();
    let m = f_x.len();
    let mut jac = DMatrix::zeros(m, n);
    let mut shifted = x.clone();

    for j in 0..n {
        let h = ensure_finite(rel_step * x[j].abs().max(1.0), "finite difference step")?;
        shifted[j] = x[j] + h;
        let f_shifted = f(&shifted)?;
        shifted[j] = x[j];
        if f_shifted.len() != m {
            return Err(SolverError::Dimension {
                what: format!("residual length changed from {m} to {}", f_shifted.len()),
            });
        }
        let column = (f_shifted - f_x) / h;
        jac.set_column(j, &column);
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_step() {
        let x = DVector::from_vec(vec![1.0]);
        let err = finite_difference_jacobian(&x, &x.clone(), |p| Ok(p.clone()), 0.0).unwrap_err();
        assert!(matches!(err, SolverError::Core(_)));
    }

    #[test]
    fn linear_map() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![2.0 * x[0] - x[1], 3.0 * x[1]]))
        };
        let x = DVector::from_vec(vec![3.0, -1.0]);
        let f_x = f(&x).unwrap();
        let jac = finite_difference_jacobian(&x, &f_x, f, 1e-7).unwrap();

        let expected = DMatrix::from_row_slice(2, 2, &[2.0, -1.0, 0.0, 3.0]);
        assert!((jac - expected).amax() < 1e-6);
    }

    #[test]
    fn quadratic() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0]))
        };
        let x = DVector::from_element(1, 3.0);
        let f_x = f(&x).unwrap();
        let jac = finite_difference_jacobian(&x, &f_x, f, 1e-7).unwrap();
        assert!((jac[(0, 0)] - 6.0).abs() < 1e-5);
    }

    #[test]
    fn residual_error_propagates() {
        let f = |_: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Err(SolverError::Assembly { what: "boom".into() })
        };
        let x = DVector::from_element(2, 1.0);
        let f_x = DVector::zeros(2);
        assert!(finite_difference_jacobian(&x, &f_x, f, 1e-7).is_err());
    }
}
