//! Composite kernels built from other kernels.
//!
//! This module provides the kernel algebra:
//! - Sum: `K1 + K2`
//! - Product: `K1 * K2` (elementwise)
//! - Exponentiation: `K ** p` for a fixed real exponent
//!
//! Composites own their children and are built without evaluating anything.
//! Gradients follow linearity, the product rule and the power rule; the
//! hyperparameter axis lists the left child's parameters before the right's.
//!
//! # Example
//!
//! ```rust
//! use scirs2_core::ndarray::Array2;
//! use tensorlogic_gp_kernels::{ConstantKernel, Kernel, KernelExt, RbfKernel};
//!
//! let kernel = ConstantKernel::new(2.0).unwrap() * RbfKernel::new(1.0).unwrap().pow(2.0).unwrap()
//!     + RbfKernel::new(10.0).unwrap();
//! assert_eq!(kernel.n_dims(), 3);
//!
//! let x = Array2::from_shape_fn((4, 2), |(i, j)| (i + j) as f64);
//! let (k, grad) = kernel.evaluate_with_gradient((&x).into()).unwrap();
//! assert_eq!(k.dim(), (4, 4));
//! assert_eq!(grad.dim(), (4, 4, 3));
//! ```

use std::fmt;
use std::ops::{Add, Mul};

use scirs2_core::ndarray::{concatenate, Array1, Array2, Array3, Axis, Zip};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::hyperparameter::{format_value, Hyperparameter};
use crate::string_kernel::{DistanceSpectrumKernel, SpectrumKernel};
use crate::tensor_kernels::RbfKernel;
use crate::types::{
    gradient_or_empty, no_free_parameters, GradientTensor, GramMatrix, Kernel, KernelInput,
};
use crate::utility_kernels::{ConstantKernel, WhiteKernel};

fn check_same_shape(a: &Array2<f64>, b: &Array2<f64>, context: &str) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(KernelError::shape_mismatch(
            vec![a.nrows(), a.ncols()],
            vec![b.nrows(), b.ncols()],
            context,
        ));
    }
    Ok(())
}

fn prefixed(kernel: &dyn Kernel, prefix: &str) -> Vec<Hyperparameter> {
    kernel
        .hyperparameters()
        .iter()
        .map(|p| p.prefixed(prefix))
        .collect()
}

/// Wrap composite children in parentheses when printing.
fn fmt_operand(kernel: &dyn Kernel) -> String {
    match kernel.name() {
        "Sum" | "Product" | "Exponentiation" => format!("({})", kernel),
        _ => kernel.to_string(),
    }
}

/// Sum of two kernels: K(x,y) = K1(x,y) + K2(x,y)
#[derive(Debug, Clone)]
pub struct SumKernel {
    k1: Box<dyn Kernel>,
    k2: Box<dyn Kernel>,
}

impl SumKernel {
    /// Create a new sum kernel
    pub fn new<K1, K2>(k1: K1, k2: K2) -> Self
    where
        K1: Kernel + 'static,
        K2: Kernel + 'static,
    {
        Self::from_boxed(Box::new(k1), Box::new(k2))
    }

    /// Create a sum of already-boxed kernels
    pub fn from_boxed(k1: Box<dyn Kernel>, k2: Box<dyn Kernel>) -> Self {
        Self { k1, k2 }
    }

    /// Left operand
    pub fn k1(&self) -> &dyn Kernel {
        self.k1.as_ref()
    }

    /// Right operand
    pub fn k2(&self) -> &dyn Kernel {
        self.k2.as_ref()
    }
}

impl Kernel for SumKernel {
    fn name(&self) -> &str {
        "Sum"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        let a = self.k1.evaluate(x, y)?;
        let b = self.k2.evaluate(x, y)?;
        check_same_shape(&a, &b, "sum kernel operands")?;
        Ok(a + b)
    }

    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        if self.n_dims() == 0 {
            return Err(no_free_parameters(self.name()));
        }
        let (a, grad_a) = gradient_or_empty(self.k1.as_ref(), x)?;
        let (b, grad_b) = gradient_or_empty(self.k2.as_ref(), x)?;
        check_same_shape(&a, &b, "sum kernel operands")?;

        let gradient = concatenate(Axis(2), &[grad_a.view(), grad_b.view()]).map_err(|e| {
            KernelError::shape_mismatch(
                vec![grad_a.dim().0, grad_a.dim().1],
                vec![grad_b.dim().0, grad_b.dim().1],
                format!("sum kernel gradient: {}", e),
            )
        })?;
        tracing::debug!(n_dims = gradient.dim().2, "evaluated sum kernel gradient");
        Ok((a + b, gradient))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        Ok(self.k1.diag(x)? + self.k2.diag(x)?)
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        let mut params = prefixed(self.k1.as_ref(), "k1");
        params.extend(prefixed(self.k2.as_ref(), "k2"));
        params
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        let mut params = self.k1.hyperparameters_mut();
        params.extend(self.k2.hyperparameters_mut());
        params
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn is_stationary(&self) -> bool {
        self.k1.is_stationary() && self.k2.is_stationary()
    }

    fn is_psd(&self) -> bool {
        // Sum of PSD kernels is PSD
        self.k1.is_psd() && self.k2.is_psd()
    }

    fn config(&self) -> KernelConfig {
        KernelConfig::Sum {
            k1: Box::new(self.k1.config()),
            k2: Box::new(self.k2.config()),
        }
    }
}

impl fmt::Display for SumKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.k1, self.k2)
    }
}

/// Elementwise product of two kernels: K(x,y) = K1(x,y) * K2(x,y)
///
/// The resulting kernel corresponds to the tensor product of feature spaces.
#[derive(Debug, Clone)]
pub struct ProductKernel {
    k1: Box<dyn Kernel>,
    k2: Box<dyn Kernel>,
}

impl ProductKernel {
    /// Create a new product kernel
    pub fn new<K1, K2>(k1: K1, k2: K2) -> Self
    where
        K1: Kernel + 'static,
        K2: Kernel + 'static,
    {
        Self::from_boxed(Box::new(k1), Box::new(k2))
    }

    /// Create a product of already-boxed kernels
    pub fn from_boxed(k1: Box<dyn Kernel>, k2: Box<dyn Kernel>) -> Self {
        Self { k1, k2 }
    }

    /// Left operand
    pub fn k1(&self) -> &dyn Kernel {
        self.k1.as_ref()
    }

    /// Right operand
    pub fn k2(&self) -> &dyn Kernel {
        self.k2.as_ref()
    }
}

impl Kernel for ProductKernel {
    fn name(&self) -> &str {
        "Product"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        let a = self.k1.evaluate(x, y)?;
        let b = self.k2.evaluate(x, y)?;
        check_same_shape(&a, &b, "product kernel operands")?;
        Ok(a * b)
    }

    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        if self.n_dims() == 0 {
            return Err(no_free_parameters(self.name()));
        }
        let (a, grad_a) = gradient_or_empty(self.k1.as_ref(), x)?;
        let (b, grad_b) = gradient_or_empty(self.k2.as_ref(), x)?;
        check_same_shape(&a, &b, "product kernel operands")?;

        // Product rule: d(AB) = dA * B + A * dB
        let block_a: Array3<f64> = &grad_a * &b.view().insert_axis(Axis(2));
        let block_b: Array3<f64> = &grad_b * &a.view().insert_axis(Axis(2));
        let gradient = concatenate(Axis(2), &[block_a.view(), block_b.view()]).map_err(|e| {
            KernelError::shape_mismatch(
                vec![a.nrows(), a.ncols()],
                vec![b.nrows(), b.ncols()],
                format!("product kernel gradient: {}", e),
            )
        })?;
        tracing::debug!(n_dims = gradient.dim().2, "evaluated product kernel gradient");
        Ok((a * b, gradient))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        Ok(self.k1.diag(x)? * self.k2.diag(x)?)
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        let mut params = prefixed(self.k1.as_ref(), "k1");
        params.extend(prefixed(self.k2.as_ref(), "k2"));
        params
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        let mut params = self.k1.hyperparameters_mut();
        params.extend(self.k2.hyperparameters_mut());
        params
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn is_stationary(&self) -> bool {
        self.k1.is_stationary() && self.k2.is_stationary()
    }

    fn is_psd(&self) -> bool {
        // Schur product theorem
        self.k1.is_psd() && self.k2.is_psd()
    }

    fn config(&self) -> KernelConfig {
        KernelConfig::Product {
            k1: Box::new(self.k1.config()),
            k2: Box::new(self.k2.config()),
        }
    }
}

impl fmt::Display for ProductKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} * {}",
            fmt_operand(self.k1.as_ref()),
            fmt_operand(self.k2.as_ref())
        )
    }
}

/// Kernel raised to a fixed power: K(x,y) = K1(x,y)^p
///
/// The exponent is not a hyperparameter; theta is the child's theta.
#[derive(Debug, Clone)]
pub struct ExponentiationKernel {
    kernel: Box<dyn Kernel>,
    exponent: f64,
}

impl ExponentiationKernel {
    /// Raise `kernel` to the power `exponent` (must be finite).
    pub fn new<K: Kernel + 'static>(kernel: K, exponent: f64) -> Result<Self> {
        Self::from_boxed(Box::new(kernel), exponent)
    }

    /// Raise an already-boxed kernel to a power.
    pub fn from_boxed(kernel: Box<dyn Kernel>, exponent: f64) -> Result<Self> {
        if !exponent.is_finite() {
            return Err(KernelError::invalid_parameter(
                "exponent",
                exponent,
                "exponent must be finite",
            ));
        }
        Ok(Self { kernel, exponent })
    }

    /// Base kernel
    pub fn kernel(&self) -> &dyn Kernel {
        self.kernel.as_ref()
    }

    /// Fixed exponent
    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    fn warn_non_finite(&self, k: &Array2<f64>) {
        if k.iter().any(|v| !v.is_finite()) {
            tracing::warn!(
                exponent = self.exponent,
                base = self.kernel.name(),
                "exponentiation produced non-finite kernel entries"
            );
        }
    }
}

impl Kernel for ExponentiationKernel {
    fn name(&self) -> &str {
        "Exponentiation"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        let p = self.exponent;
        let k = self.kernel.evaluate(x, y)?.mapv_into(|v| v.powf(p));
        self.warn_non_finite(&k);
        Ok(k)
    }

    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        if self.n_dims() == 0 {
            return Err(no_free_parameters(self.name()));
        }
        let p = self.exponent;
        let (base, grad_base) = self.kernel.evaluate_with_gradient(x)?;

        // Power rule: d(K^p) = p K^(p-1) dK
        let scale = base.mapv(|v| p * v.powf(p - 1.0));
        let mut gradient: Array3<f64> = &grad_base * &scale.view().insert_axis(Axis(2));
        // Entries the base does not move stay at zero even where K^(p-1) is infinite
        Zip::from(&mut gradient).and(&grad_base).for_each(|g, &d| {
            if d == 0.0 {
                *g = 0.0;
            }
        });
        let k = base.mapv_into(|v| v.powf(p));
        self.warn_non_finite(&k);
        Ok((k, gradient))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        let p = self.exponent;
        Ok(self.kernel.diag(x)?.mapv_into(|v| v.powf(p)))
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        prefixed(self.kernel.as_ref(), "kernel")
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        self.kernel.hyperparameters_mut()
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn is_stationary(&self) -> bool {
        self.kernel.is_stationary()
    }

    fn is_psd(&self) -> bool {
        // Non-negative integer powers are repeated Schur products
        self.kernel.is_psd() && self.exponent >= 0.0 && self.exponent.fract() == 0.0
    }

    fn config(&self) -> KernelConfig {
        KernelConfig::Exponentiation {
            base_kernel: Box::new(self.kernel.config()),
            exponent: self.exponent,
        }
    }
}

impl fmt::Display for ExponentiationKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ** {}",
            fmt_operand(self.kernel.as_ref()),
            format_value(self.exponent)
        )
    }
}

/// Method-style composition available on every concrete kernel.
pub trait KernelExt: Kernel + Sized + 'static {
    /// `self ** exponent`
    fn pow(self, exponent: f64) -> Result<ExponentiationKernel> {
        ExponentiationKernel::new(self, exponent)
    }

    /// Erase the concrete type.
    fn boxed(self) -> Box<dyn Kernel> {
        Box::new(self)
    }
}

impl<K: Kernel + 'static> KernelExt for K {}

/// `+` and `*` between any two concrete kernels.
macro_rules! impl_kernel_algebra {
    ($($kernel:ty),* $(,)?) => {
        $(
            impl<K: Kernel + 'static> Add<K> for $kernel {
                type Output = SumKernel;

                fn add(self, rhs: K) -> SumKernel {
                    SumKernel::new(self, rhs)
                }
            }

            impl<K: Kernel + 'static> Mul<K> for $kernel {
                type Output = ProductKernel;

                fn mul(self, rhs: K) -> ProductKernel {
                    ProductKernel::new(self, rhs)
                }
            }
        )*
    };
}

impl_kernel_algebra!(
    RbfKernel,
    ConstantKernel,
    WhiteKernel,
    SumKernel,
    ProductKernel,
    ExponentiationKernel,
    SpectrumKernel,
    DistanceSpectrumKernel,
);
