//! Log-parameterized kernel hyperparameters.
//!
//! Every tunable kernel parameter is positive (lengthscales, constants, noise
//! levels), so it is stored as its natural logarithm. Two views exist:
//!
//! - **value**: the constrained parameter, always `> 0`
//! - **theta**: `ln(value)`, unconstrained and always finite
//!
//! Optimizers and gradient tensors work in theta; constructors and accessors
//! that mention "value" work in the constrained domain.

use crate::error::{KernelError, Result};

/// A named scalar or per-feature vector hyperparameter stored in log-space.
///
/// Only the validating constructors create one; kernel trees are persisted
/// through [`KernelConfig`](crate::KernelConfig), which rebuilds through them.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameter {
    name: String,
    theta: Vec<f64>,
    fixed: bool,
}

impl Hyperparameter {
    /// Create a scalar hyperparameter from its constrained value.
    ///
    /// # Example
    /// ```rust
    /// use tensorlogic_gp_kernels::Hyperparameter;
    ///
    /// let p = Hyperparameter::new("lengthscale", 2.0).unwrap();
    /// assert!((p.theta()[0] - 2.0_f64.ln()).abs() < 1e-12);
    /// assert!(Hyperparameter::new("lengthscale", 0.0).is_err());
    /// ```
    pub fn new(name: impl Into<String>, value: f64) -> Result<Self> {
        Self::vector(name, &[value])
    }

    /// Create a vector hyperparameter (e.g. one lengthscale per feature).
    pub fn vector(name: impl Into<String>, values: &[f64]) -> Result<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(KernelError::invalid_parameter(
                name,
                "[]",
                "must have at least one element",
            ));
        }

        let mut theta = Vec::with_capacity(values.len());
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() || v <= 0.0 {
                let parameter = if values.len() == 1 {
                    name.clone()
                } else {
                    format!("{}[{}]", name, i)
                };
                return Err(KernelError::invalid_parameter(
                    parameter,
                    v,
                    "must be positive and finite",
                ));
            }
            theta.push(v.ln());
        }

        Ok(Self {
            name,
            theta,
            fixed: false,
        })
    }

    /// Mark the hyperparameter as fixed (excluded from theta and gradients).
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the parameter is excluded from optimization.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Number of scalar entries.
    pub fn n_elements(&self) -> usize {
        self.theta.len()
    }

    /// Whether this is a single shared value rather than a per-feature vector.
    pub fn is_scalar(&self) -> bool {
        self.theta.len() == 1
    }

    /// Log-domain representation.
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    /// Constrained value of the first (for scalars: only) entry.
    pub fn value(&self) -> f64 {
        self.theta[0].exp()
    }

    /// Constrained values of every entry.
    pub fn values(&self) -> Vec<f64> {
        self.theta.iter().map(|t| t.exp()).collect()
    }

    /// Replace the log-domain representation.
    ///
    /// Length must match [`n_elements`](Self::n_elements) and every entry
    /// must be finite. Fixed parameters accept updates too; it is the kernel
    /// that skips them when distributing a theta vector.
    pub fn set_theta(&mut self, theta: &[f64]) -> Result<()> {
        if theta.len() != self.theta.len() {
            return Err(KernelError::shape_mismatch(
                vec![self.theta.len()],
                vec![theta.len()],
                format!("theta of hyperparameter '{}'", self.name),
            ));
        }
        if let Some(bad) = theta.iter().find(|t| !t.is_finite()) {
            return Err(KernelError::invalid_parameter(
                self.name.clone(),
                bad,
                "log-domain value must be finite",
            ));
        }
        self.theta.copy_from_slice(theta);
        Ok(())
    }

    /// Copy of this parameter with `prefix__` prepended to its name.
    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        Self {
            name: format!("{}__{}", prefix, self.name),
            ..self.clone()
        }
    }
}

/// Compact rendering of a value for kernel `Display` output.
pub(crate) fn format_value(v: f64) -> String {
    let s = format!("{:.6}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// `5` for scalars, `[1, 2.5]` for vectors.
pub(crate) fn format_values(param: &Hyperparameter) -> String {
    if param.is_scalar() {
        format_value(param.value())
    } else {
        let parts: Vec<String> = param.values().into_iter().map(format_value).collect();
        format!("[{}]", parts.join(", "))
    }
}
