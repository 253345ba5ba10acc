//! Core types for kernel operations.
//!
//! Shape conventions used throughout the crate:
//!
//! | value            | type          | shape                         |
//! |------------------|---------------|-------------------------------|
//! | dense input      | `ArrayView2`  | `(n_samples, n_features)`     |
//! | Gram matrix      | `Array2<f64>` | `(n_x, n_y)`                  |
//! | gradient tensor  | `Array3<f64>` | `(n_x, n_x, n_dims)`          |
//! | theta            | `Array1<f64>` | `(n_dims,)`                   |
//!
//! The hyperparameter axis of a gradient tensor is always last and follows
//! the order of [`Kernel::theta`].

use std::fmt;

use scirs2_core::ndarray::{Array1, Array2, Array3, ArrayView2};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::hyperparameter::Hyperparameter;
use crate::string_transform::{EncodedBatch, NGramBatch};

/// Gram matrix of pairwise kernel evaluations, shape `(n_x, n_y)`.
pub type GramMatrix = Array2<f64>;

/// Derivative of a Gram matrix w.r.t. log-hyperparameters, shape `(n, n, n_dims)`.
pub type GradientTensor = Array3<f64>;

/// One batch of kernel inputs.
///
/// Numeric kernels read `Dense`; string kernels read `Strings` (encoded by
/// [`AsciiBytesTransformer`](crate::AsciiBytesTransformer)) or `NGrams`
/// (windowed by [`NGramTransformer`](crate::NGramTransformer)). Kernels that
/// only need the sample count, such as [`ConstantKernel`](crate::ConstantKernel),
/// accept every kind.
#[derive(Debug, Clone, Copy)]
pub enum KernelInput<'a> {
    /// Real-valued feature matrix, one row per sample
    Dense(ArrayView2<'a, f64>),
    /// Padded byte-encoded strings, one row per string
    Strings(&'a EncodedBatch),
    /// Pre-extracted n-gram windows, one entry per string
    NGrams(&'a NGramBatch),
}

impl<'a> KernelInput<'a> {
    /// Number of samples (rows / strings) in the batch.
    pub fn n_samples(&self) -> usize {
        match self {
            KernelInput::Dense(x) => x.nrows(),
            KernelInput::Strings(batch) => batch.n_strings(),
            KernelInput::NGrams(batch) => batch.n_strings(),
        }
    }

    /// Human-readable name of the input kind.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelInput::Dense(_) => "dense",
            KernelInput::Strings(_) => "strings",
            KernelInput::NGrams(_) => "n-grams",
        }
    }

    /// Borrow the dense feature matrix, or fail for string inputs.
    pub fn as_dense(&self, kernel: &str) -> Result<ArrayView2<'a, f64>> {
        match self {
            KernelInput::Dense(x) => Ok(*x),
            other => Err(KernelError::UnsupportedOperation(format!(
                "{} kernel requires dense input, got {}",
                kernel,
                other.kind()
            ))),
        }
    }
}

impl<'a> From<ArrayView2<'a, f64>> for KernelInput<'a> {
    fn from(x: ArrayView2<'a, f64>) -> Self {
        KernelInput::Dense(x)
    }
}

impl<'a> From<&'a Array2<f64>> for KernelInput<'a> {
    fn from(x: &'a Array2<f64>) -> Self {
        KernelInput::Dense(x.view())
    }
}

impl<'a> From<&'a EncodedBatch> for KernelInput<'a> {
    fn from(batch: &'a EncodedBatch) -> Self {
        KernelInput::Strings(batch)
    }
}

impl<'a> From<&'a NGramBatch> for KernelInput<'a> {
    fn from(batch: &'a NGramBatch) -> Self {
        KernelInput::NGrams(batch)
    }
}

/// Capability set shared by every kernel.
///
/// Kernels read their current hyperparameter state at call time; nothing is
/// cached between calls. To evaluate at several parameter settings from
/// different threads, use [`clone_with_theta`](Kernel::clone_with_theta)
/// rather than mutating a shared instance.
pub trait Kernel: fmt::Debug + fmt::Display + Send + Sync {
    /// Get kernel name for identification.
    fn name(&self) -> &str;

    /// Compute the Gram matrix.
    ///
    /// With `y = None` the result is the symmetric `(n, n)` self-similarity
    /// of `x`; otherwise the `(n_x, n_y)` cross-similarity.
    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix>;

    /// Compute the self-similarity Gram matrix and its gradient w.r.t. theta.
    ///
    /// Fails with [`KernelError::UnsupportedOperation`] when the kernel has
    /// no free hyperparameters.
    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)>;

    /// Diagonal of `evaluate(x, None)`, shape `(n,)`.
    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        Ok(self.evaluate(x, None)?.diag().to_owned())
    }

    /// All hyperparameters, fixed ones included, named by tree position
    /// (`k1__lengthscale`, `kernel__value`, ...).
    fn hyperparameters(&self) -> Vec<Hyperparameter>;

    /// Mutable access to all hyperparameters in [`hyperparameters`](Kernel::hyperparameters) order.
    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter>;

    /// Concatenated log-domain values of the non-fixed hyperparameters.
    fn theta(&self) -> Array1<f64> {
        self.hyperparameters()
            .iter()
            .filter(|p| !p.is_fixed())
            .flat_map(|p| p.theta().to_vec())
            .collect()
    }

    /// Number of free log-domain parameters (length of theta).
    fn n_dims(&self) -> usize {
        self.hyperparameters()
            .iter()
            .filter(|p| !p.is_fixed())
            .map(|p| p.n_elements())
            .sum()
    }

    /// Replace theta in place. Either every parameter is updated or none is.
    fn set_theta(&mut self, theta: &[f64]) -> Result<()> {
        let name = self.name().to_string();
        let params: Vec<&mut Hyperparameter> = self
            .hyperparameters_mut()
            .into_iter()
            .filter(|p| !p.is_fixed())
            .collect();

        let expected: usize = params.iter().map(|p| p.n_elements()).sum();
        if theta.len() != expected {
            return Err(KernelError::shape_mismatch(
                vec![expected],
                vec![theta.len()],
                format!("theta of {} kernel", name),
            ));
        }
        if let Some(bad) = theta.iter().find(|t| !t.is_finite()) {
            return Err(KernelError::invalid_parameter(
                "theta",
                bad,
                "log-domain values must be finite",
            ));
        }

        let mut offset = 0;
        for param in params {
            let len = param.n_elements();
            param.set_theta(&theta[offset..offset + len])?;
            offset += len;
        }
        Ok(())
    }

    /// Clone into a box.
    fn clone_box(&self) -> Box<dyn Kernel>;

    /// Independent copy with theta replaced; `self` is left untouched.
    fn clone_with_theta(&self, theta: &[f64]) -> Result<Box<dyn Kernel>> {
        let mut kernel = self.clone_box();
        kernel.set_theta(theta)?;
        Ok(kernel)
    }

    /// Whether the kernel depends only on `x - y`.
    fn is_stationary(&self) -> bool {
        true
    }

    /// Check if kernel is positive semi-definite.
    fn is_psd(&self) -> bool {
        true
    }

    /// Serializable description of this kernel with its current values.
    fn config(&self) -> KernelConfig;
}

impl Clone for Box<dyn Kernel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Gradient of `kernel`, or an empty `(n, n, 0)` block when it has no free
/// parameters. Composite kernels use this so that non-differentiable
/// children contribute values but no gradient columns.
pub(crate) fn gradient_or_empty(
    kernel: &dyn Kernel,
    x: KernelInput<'_>,
) -> Result<(GramMatrix, GradientTensor)> {
    if kernel.n_dims() == 0 {
        let k = kernel.evaluate(x, None)?;
        let (n, m) = k.dim();
        Ok((k, Array3::zeros((n, m, 0))))
    } else {
        kernel.evaluate_with_gradient(x)
    }
}

/// Cross-mode inputs must be of the same kind, even for kernels that only count samples.
pub(crate) fn check_same_kind(kernel: &str, x: KernelInput<'_>, y: KernelInput<'_>) -> Result<()> {
    if x.kind() != y.kind() {
        return Err(KernelError::InvalidInput(format!(
            "{} kernel cannot compare {} input with {} input",
            kernel,
            x.kind(),
            y.kind()
        )));
    }
    Ok(())
}

pub(crate) fn no_free_parameters(kernel: &str) -> KernelError {
    KernelError::UnsupportedOperation(format!(
        "{} kernel has no free hyperparameters to differentiate",
        kernel
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string_transform::AsciiBytesTransformer;
    use scirs2_core::ndarray::array;

    #[test]
    fn test_input_n_samples() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        assert_eq!(KernelInput::from(&x).n_samples(), 3);

        let strings = AsciiBytesTransformer::new().transform(&["ab", "c"]).unwrap();
        let input = KernelInput::from(&strings);
        assert_eq!(input.n_samples(), 2);
        assert_eq!(input.kind(), "strings");
    }

    #[test]
    fn test_as_dense_rejects_strings() {
        let strings = AsciiBytesTransformer::new().transform(&["ab"]).unwrap();
        let err = KernelInput::from(&strings).as_dense("RBF").unwrap_err();
        assert!(matches!(err, KernelError::UnsupportedOperation(_)));
        assert!(err.to_string().contains("RBF"));
    }
}
