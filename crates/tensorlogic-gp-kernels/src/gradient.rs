//! Numerical gradient checks for kernel hyperparameters.
//!
//! Analytic gradients are returned by [`Kernel::evaluate_with_gradient`] as an
//! `(n, n, n_dims)` tensor taken w.r.t. the log-domain theta. This module
//! provides the tools to validate them:
//!
//! - [`finite_difference_gradient`]: central differences on theta
//! - [`max_abs_difference`]: elementwise comparison of matrices or tensors
//! - [`is_symmetric`]: symmetry check for self-similarity matrices
//!
//! ## Example
//!
//! ```rust
//! use scirs2_core::ndarray::array;
//! use tensorlogic_gp_kernels::gradient::{finite_difference_gradient, max_abs_difference};
//! use tensorlogic_gp_kernels::{Kernel, RbfKernel};
//!
//! let kernel = RbfKernel::new(0.5).unwrap();
//! let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
//!
//! let (_, analytic) = kernel.evaluate_with_gradient((&x).into()).unwrap();
//! let numeric = finite_difference_gradient(&kernel, (&x).into(), 1e-6).unwrap();
//! assert!(max_abs_difference(&analytic, &numeric) < 1e-6);
//! ```

use scirs2_core::ndarray::{Array, Array2, Array3, Axis, Dimension};

use crate::error::{KernelError, Result};
use crate::types::{no_free_parameters, GradientTensor, Kernel, KernelInput};

/// Approximate the theta-gradient of the self-similarity matrix.
///
/// Each free log-parameter is perturbed by `±epsilon` on a clone of the
/// kernel; the original kernel is left untouched. The result has the same
/// layout as the analytic gradient, `(n, n, n_dims)`.
pub fn finite_difference_gradient(
    kernel: &dyn Kernel,
    x: KernelInput<'_>,
    epsilon: f64,
) -> Result<GradientTensor> {
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(KernelError::invalid_parameter(
            "epsilon",
            epsilon,
            "step size must be positive and finite",
        ));
    }

    let theta = kernel.theta();
    if theta.is_empty() {
        return Err(no_free_parameters(kernel.name()));
    }

    let n = x.n_samples();
    let mut gradient = Array3::zeros((n, n, theta.len()));
    let mut shifted = theta.to_vec();

    for i in 0..theta.len() {
        shifted[i] = theta[i] + epsilon;
        let k_plus = kernel.clone_with_theta(&shifted)?.evaluate(x, None)?;
        shifted[i] = theta[i] - epsilon;
        let k_minus = kernel.clone_with_theta(&shifted)?.evaluate(x, None)?;
        shifted[i] = theta[i];

        let slice = (k_plus - k_minus) / (2.0 * epsilon);
        gradient.index_axis_mut(Axis(2), i).assign(&slice);
    }

    tracing::trace!(
        kernel = kernel.name(),
        n_dims = theta.len(),
        "computed finite-difference gradient"
    );
    Ok(gradient)
}

/// Largest absolute elementwise difference between two arrays.
///
/// Returns infinity when the shapes differ and NaN when any difference is NaN,
/// so a `< tol` comparison fails in both cases.
pub fn max_abs_difference<D: Dimension>(a: &Array<f64, D>, b: &Array<f64, D>) -> f64 {
    if a.shape() != b.shape() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, |acc, d| if d.is_nan() || d > acc { d } else { acc })
}

/// Check if a matrix is square and symmetric within tolerance.
pub fn is_symmetric(matrix: &Array2<f64>, tolerance: f64) -> bool {
    let (n, m) = matrix.dim();
    if n != m {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[[i, j]] - matrix[[j, i]]).abs() > tolerance {
                return false;
            }
        }
    }
    true
}
