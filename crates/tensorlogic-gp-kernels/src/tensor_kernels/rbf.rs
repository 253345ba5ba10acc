//! Squared-exponential (RBF) kernel with log-parameterized lengthscales.

use std::fmt;

use scirs2_core::ndarray::{Array1, Array2, Array3, ArrayView2};

use crate::config::{KernelConfig, LengthscaleConfig};
use crate::error::{KernelError, Result};
use crate::hyperparameter::{format_values, Hyperparameter};
use crate::types::{no_free_parameters, GradientTensor, GramMatrix, Kernel, KernelInput};

/// RBF (Gaussian / squared-exponential) kernel.
///
/// K(x, y) = exp(-0.5 * Σ_d (x_d - y_d)² / l_d²)
///
/// With a single lengthscale every feature shares `l`; the anisotropic form
/// keeps one lengthscale per feature. Gradients are taken w.r.t. `ln(l_d)`:
///
/// ∂K/∂ln(l_d) = K * (x_d - y_d)² / l_d²
///
/// # Example
/// ```rust
/// use scirs2_core::ndarray::array;
/// use tensorlogic_gp_kernels::{Kernel, RbfKernel};
///
/// let kernel = RbfKernel::new(1.0).unwrap();
/// let x = array![[0.0, 0.0], [1.0, 0.0]];
/// let k = kernel.evaluate((&x).into(), None).unwrap();
/// assert!((k[[0, 0]] - 1.0).abs() < 1e-12);
/// assert!((k[[0, 1]] - (-0.5_f64).exp()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RbfKernel {
    lengthscale: Hyperparameter,
}

impl RbfKernel {
    /// Create an isotropic RBF kernel.
    pub fn new(lengthscale: f64) -> Result<Self> {
        Ok(Self {
            lengthscale: Hyperparameter::new("lengthscale", lengthscale)?,
        })
    }

    /// Create an RBF kernel with one lengthscale per input feature.
    pub fn anisotropic(lengthscales: &[f64]) -> Result<Self> {
        Ok(Self {
            lengthscale: Hyperparameter::vector("lengthscale", lengthscales)?,
        })
    }

    /// Exclude the lengthscale from theta and gradients.
    pub fn with_fixed_lengthscale(mut self, fixed: bool) -> Self {
        self.lengthscale = self.lengthscale.with_fixed(fixed);
        self
    }

    /// Lengthscale (first entry for anisotropic kernels).
    pub fn lengthscale(&self) -> f64 {
        self.lengthscale.value()
    }

    /// All lengthscales.
    pub fn lengthscales(&self) -> Vec<f64> {
        self.lengthscale.values()
    }

    /// Whether each feature has its own lengthscale.
    pub fn is_anisotropic(&self) -> bool {
        !self.lengthscale.is_scalar()
    }

    fn check_features(&self, n_features: usize) -> Result<()> {
        if self.is_anisotropic() && n_features != self.lengthscale.n_elements() {
            return Err(KernelError::shape_mismatch(
                vec![self.lengthscale.n_elements()],
                vec![n_features],
                "RBF kernel features vs. lengthscales",
            ));
        }
        Ok(())
    }

    /// Divide every feature by its lengthscale.
    fn scaled(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_features(x.ncols())?;
        let ls = Array1::from(self.lengthscale.values());
        Ok(&x / &ls)
    }
}

/// Pairwise squared Euclidean distances between the rows of `a` and `b`.
pub(crate) fn squared_distances(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
        a.row(i)
            .iter()
            .zip(b.row(j).iter())
            .map(|(p, q)| (p - q) * (p - q))
            .sum::<f64>()
    })
}

impl Kernel for RbfKernel {
    fn name(&self) -> &str {
        "RBF"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        let x = x.as_dense(self.name())?;
        let xs = self.scaled(x)?;

        let sq_dists = match y {
            None => squared_distances(xs.view(), xs.view()),
            Some(y) => {
                let y = y.as_dense(self.name())?;
                if y.ncols() != x.ncols() {
                    return Err(KernelError::shape_mismatch(
                        vec![x.ncols()],
                        vec![y.ncols()],
                        "RBF kernel cross-evaluation features",
                    ));
                }
                let ys = self.scaled(y)?;
                squared_distances(xs.view(), ys.view())
            }
        };

        tracing::debug!(
            n_x = sq_dists.nrows(),
            n_y = sq_dists.ncols(),
            "evaluated RBF kernel"
        );
        Ok(sq_dists.mapv_into(|d| (-0.5 * d).exp()))
    }

    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        if self.lengthscale.is_fixed() {
            return Err(no_free_parameters(self.name()));
        }
        let x = x.as_dense(self.name())?;
        let xs = self.scaled(x)?;
        let n = xs.nrows();

        let sq_dists = squared_distances(xs.view(), xs.view());
        let k = sq_dists.mapv(|d| (-0.5 * d).exp());

        let gradient = if self.is_anisotropic() {
            let d = xs.ncols();
            Array3::from_shape_fn((n, n, d), |(i, j, f)| {
                let diff = xs[[i, f]] - xs[[j, f]];
                k[[i, j]] * diff * diff
            })
        } else {
            Array3::from_shape_fn((n, n, 1), |(i, j, _)| k[[i, j]] * sq_dists[[i, j]])
        };

        tracing::debug!(n, n_dims = gradient.dim().2, "evaluated RBF gradient");
        Ok((k, gradient))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        let x = x.as_dense(self.name())?;
        self.check_features(x.ncols())?;
        Ok(Array1::ones(x.nrows()))
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![self.lengthscale.clone()]
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        vec![&mut self.lengthscale]
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn config(&self) -> KernelConfig {
        let lengthscale = if self.is_anisotropic() {
            LengthscaleConfig::PerFeature(self.lengthscales())
        } else {
            LengthscaleConfig::Shared(self.lengthscale())
        };
        KernelConfig::Rbf {
            lengthscale,
            fixed: self.lengthscale.is_fixed(),
        }
    }
}

impl fmt::Display for RbfKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RBF(lengthscale={})", format_values(&self.lengthscale))
    }
}
