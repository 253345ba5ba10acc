//! Input-agnostic building blocks: constant and white-noise kernels.
//!
//! Both kernels only look at how many samples they are given, so they accept
//! dense, string and n-gram inputs alike and can be combined with any other
//! kernel. In cross mode both sides must still be the same kind of input.

use std::fmt;

use scirs2_core::ndarray::{Array1, Array2, Array3};

use crate::config::KernelConfig;
use crate::error::Result;
use crate::hyperparameter::{format_values, Hyperparameter};
use crate::types::{
    check_same_kind, no_free_parameters, GradientTensor, GramMatrix, Kernel, KernelInput,
};

/// Constant kernel: K(x, y) = c
///
/// Scales other kernels in products and shifts them in sums. The gradient
/// w.r.t. `ln(c)` is `c` at every entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantKernel {
    value: Hyperparameter,
}

impl ConstantKernel {
    /// Create a new constant kernel (`value > 0`).
    pub fn new(value: f64) -> Result<Self> {
        Ok(Self {
            value: Hyperparameter::new("value", value)?,
        })
    }

    /// Exclude the constant from theta and gradients.
    pub fn with_fixed_value(mut self, fixed: bool) -> Self {
        self.value = self.value.with_fixed(fixed);
        self
    }

    /// Get the constant.
    pub fn value(&self) -> f64 {
        self.value.value()
    }
}

impl Kernel for ConstantKernel {
    fn name(&self) -> &str {
        "Constant"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        let n = x.n_samples();
        let m = match y {
            Some(y) => {
                check_same_kind(self.name(), x, y)?;
                y.n_samples()
            }
            None => n,
        };
        Ok(Array2::from_elem((n, m), self.value()))
    }

    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        if self.value.is_fixed() {
            return Err(no_free_parameters(self.name()));
        }
        let n = x.n_samples();
        let c = self.value();
        Ok((
            Array2::from_elem((n, n), c),
            Array3::from_elem((n, n, 1), c),
        ))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.n_samples(), self.value()))
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![self.value.clone()]
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        vec![&mut self.value]
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn config(&self) -> KernelConfig {
        KernelConfig::Constant {
            value: self.value(),
            fixed: self.value.is_fixed(),
        }
    }
}

impl fmt::Display for ConstantKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constant(value={})", format_values(&self.value))
    }
}

/// White-noise kernel: K(x, x) = σ² I, zero between distinct batches.
///
/// Models i.i.d. observation noise in Gaussian processes. Samples are
/// identified by index, so only the self-similarity matrix carries noise;
/// cross evaluation yields zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteKernel {
    noise_level: Hyperparameter,
}

impl WhiteKernel {
    /// Create a new white-noise kernel (`noise_level > 0`).
    pub fn new(noise_level: f64) -> Result<Self> {
        Ok(Self {
            noise_level: Hyperparameter::new("noise_level", noise_level)?,
        })
    }

    /// Exclude the noise level from theta and gradients.
    pub fn with_fixed_noise_level(mut self, fixed: bool) -> Self {
        self.noise_level = self.noise_level.with_fixed(fixed);
        self
    }

    /// Get the noise variance.
    pub fn noise_level(&self) -> f64 {
        self.noise_level.value()
    }
}

impl Kernel for WhiteKernel {
    fn name(&self) -> &str {
        "White"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        let n = x.n_samples();
        match y {
            None => Ok(Array2::eye(n) * self.noise_level()),
            Some(y) => {
                check_same_kind(self.name(), x, y)?;
                Ok(Array2::zeros((n, y.n_samples())))
            }
        }
    }

    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        if self.noise_level.is_fixed() {
            return Err(no_free_parameters(self.name()));
        }
        let n = x.n_samples();
        let noise = self.noise_level();
        let k: Array2<f64> = Array2::eye(n) * noise;
        let gradient = Array3::from_shape_fn((n, n, 1), |(i, j, _)| k[[i, j]]);
        Ok((k, gradient))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.n_samples(), self.noise_level()))
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        vec![self.noise_level.clone()]
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        vec![&mut self.noise_level]
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn config(&self) -> KernelConfig {
        KernelConfig::White {
            noise_level: self.noise_level(),
            fixed: self.noise_level.is_fixed(),
        }
    }
}

impl fmt::Display for WhiteKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "White(noise_level={})", format_values(&self.noise_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use crate::gradient::{finite_difference_gradient, max_abs_difference};
    use crate::string_transform::AsciiBytesTransformer;
    use approx::assert_abs_diff_eq;

    fn sample_data() -> Array2<f64> {
        Array2::from_shape_fn((4, 6), |(i, j)| ((i + 2 * j) as f64).cos())
    }

    #[test]
    fn test_constant_value() {
        let kernel = ConstantKernel::new(5.0).unwrap();
        let x = sample_data();
        let k = kernel.evaluate((&x).into(), None).unwrap();
        assert_eq!(k.dim(), (4, 4));
        assert!(k.iter().all(|&v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_constant_cross_shape() {
        let kernel = ConstantKernel::new(2.0).unwrap();
        let x = sample_data();
        let y: Array2<f64> = Array2::zeros((7, 6));
        let k = kernel.evaluate((&x).into(), Some((&y).into())).unwrap();
        assert_eq!(k.dim(), (4, 7));
    }

    #[test]
    fn test_constant_gradient() {
        let kernel = ConstantKernel::new(5.0).unwrap();
        let x = sample_data();
        let (k, grad) = kernel.evaluate_with_gradient((&x).into()).unwrap();
        assert_eq!(grad.dim(), (4, 4, 1));
        assert!(grad.iter().all(|&v| (v - 5.0).abs() < 1e-12));
        assert!(k.iter().all(|&v| (v - 5.0).abs() < 1e-12));

        let approx = finite_difference_gradient(&kernel, (&x).into(), 1e-6).unwrap();
        assert!(max_abs_difference(&grad, &approx) < 1e-6);
    }

    #[test]
    fn test_constant_accepts_strings() {
        let strings = AsciiBytesTransformer::new()
            .transform(["abc", "de", "f"])
            .unwrap();
        let kernel = ConstantKernel::new(1.5).unwrap();
        let k = kernel.evaluate((&strings).into(), None).unwrap();
        assert_eq!(k.dim(), (3, 3));
    }

    #[test]
    fn test_cross_mode_rejects_mixed_inputs() {
        let x = sample_data();
        let strings = AsciiBytesTransformer::new()
            .transform(["abc", "de", "f"])
            .unwrap();
        let kernels: Vec<Box<dyn Kernel>> = vec![
            Box::new(ConstantKernel::new(1.5).unwrap()),
            Box::new(WhiteKernel::new(0.5).unwrap()),
        ];

        for kernel in &kernels {
            assert!(matches!(
                kernel.evaluate((&x).into(), Some((&strings).into())),
                Err(KernelError::InvalidInput(_))
            ));
            assert!(matches!(
                kernel.evaluate((&strings).into(), Some((&x).into())),
                Err(KernelError::InvalidInput(_))
            ));
            let k = kernel
                .evaluate((&strings).into(), Some((&strings).into()))
                .unwrap();
            assert_eq!(k.dim(), (3, 3));
        }
    }

    #[test]
    fn test_constant_invalid() {
        assert!(ConstantKernel::new(0.0).is_err());
        assert!(ConstantKernel::new(-1.0).is_err());
    }

    #[test]
    fn test_constant_fixed() {
        let kernel = ConstantKernel::new(3.0).unwrap().with_fixed_value(true);
        let x = sample_data();
        assert_eq!(kernel.n_dims(), 0);
        assert!(matches!(
            kernel.evaluate_with_gradient((&x).into()),
            Err(KernelError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_white_self_and_cross() {
        let kernel = WhiteKernel::new(0.1).unwrap();
        let x = sample_data();
        let k = kernel.evaluate((&x).into(), None).unwrap();
        assert_abs_diff_eq!(k[[0, 0]], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(k[[0, 1]], 0.0, epsilon = 1e-12);

        let k = kernel.evaluate((&x).into(), Some((&x).into())).unwrap();
        assert!(k.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_white_gradient() {
        let kernel = WhiteKernel::new(0.5).unwrap();
        let x = sample_data();
        let (_, grad) = kernel.evaluate_with_gradient((&x).into()).unwrap();
        assert_abs_diff_eq!(grad[[2, 2, 0]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[[2, 1, 0]], 0.0, epsilon = 1e-12);

        let approx = finite_difference_gradient(&kernel, (&x).into(), 1e-6).unwrap();
        assert!(max_abs_difference(&grad, &approx) < 1e-6);
    }

    #[test]
    fn test_white_diag() {
        let kernel = WhiteKernel::new(0.25).unwrap();
        let x = sample_data();
        let diag = kernel.diag((&x).into()).unwrap();
        assert!(diag.iter().all(|&v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_display() {
        assert_eq!(ConstantKernel::new(2.0).unwrap().to_string(), "Constant(value=2)");
        assert_eq!(
            WhiteKernel::new(0.5).unwrap().to_string(),
            "White(noise_level=0.5)"
        );
    }
}
