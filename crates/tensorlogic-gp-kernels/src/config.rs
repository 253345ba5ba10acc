//! Serializable kernel descriptions.
//!
//! A [`KernelConfig`] describes a whole kernel tree and can be stored as JSON.
//! [`KernelConfig::build`] constructs the live kernel with the same
//! validation as the constructors, and [`Kernel::config`] goes the other way,
//! capturing current hyperparameter values.
//!
//! ```rust
//! use tensorlogic_gp_kernels::KernelConfig;
//!
//! let json = r#"{
//!     "kernel": "product",
//!     "k1": { "kernel": "constant", "value": 2.0 },
//!     "k2": { "kernel": "rbf", "lengthscale": [1.0, 3.0] }
//! }"#;
//! let kernel = KernelConfig::from_json(json).unwrap().build().unwrap();
//! assert_eq!(kernel.n_dims(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::composite_kernel::{ExponentiationKernel, ProductKernel, SumKernel};
use crate::error::Result;
use crate::string_kernel::{DistanceSpectrumKernel, SpectrumKernel};
use crate::tensor_kernels::RbfKernel;
use crate::types::Kernel;
use crate::utility_kernels::{ConstantKernel, WhiteKernel};

/// One shared lengthscale or one per feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LengthscaleConfig {
    /// Isotropic lengthscale
    Shared(f64),
    /// Anisotropic lengthscales, one per feature
    PerFeature(Vec<f64>),
}

/// Declarative description of a kernel tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kernel", rename_all = "snake_case")]
pub enum KernelConfig {
    /// [`RbfKernel`]
    Rbf {
        lengthscale: LengthscaleConfig,
        #[serde(default)]
        fixed: bool,
    },
    /// [`ConstantKernel`]
    Constant {
        value: f64,
        #[serde(default)]
        fixed: bool,
    },
    /// [`WhiteKernel`]
    White {
        noise_level: f64,
        #[serde(default)]
        fixed: bool,
    },
    /// [`SumKernel`]
    Sum {
        k1: Box<KernelConfig>,
        k2: Box<KernelConfig>,
    },
    /// [`ProductKernel`]
    Product {
        k1: Box<KernelConfig>,
        k2: Box<KernelConfig>,
    },
    /// [`ExponentiationKernel`]
    Exponentiation {
        base_kernel: Box<KernelConfig>,
        exponent: f64,
    },
    /// [`SpectrumKernel`]
    Spectrum {
        #[serde(default)]
        n_gram_length: Option<usize>,
    },
    /// [`DistanceSpectrumKernel`]
    DistanceSpectrum {
        base_kernel: Box<KernelConfig>,
        #[serde(default)]
        n_gram_length: Option<usize>,
    },
}

impl KernelConfig {
    /// Construct the described kernel.
    pub fn build(&self) -> Result<Box<dyn Kernel>> {
        let kernel: Box<dyn Kernel> = match self {
            KernelConfig::Rbf { lengthscale, fixed } => {
                let kernel = match lengthscale {
                    LengthscaleConfig::Shared(l) => RbfKernel::new(*l)?,
                    LengthscaleConfig::PerFeature(ls) => RbfKernel::anisotropic(ls)?,
                };
                Box::new(kernel.with_fixed_lengthscale(*fixed))
            }
            KernelConfig::Constant { value, fixed } => {
                Box::new(ConstantKernel::new(*value)?.with_fixed_value(*fixed))
            }
            KernelConfig::White { noise_level, fixed } => {
                Box::new(WhiteKernel::new(*noise_level)?.with_fixed_noise_level(*fixed))
            }
            KernelConfig::Sum { k1, k2 } => Box::new(SumKernel::from_boxed(k1.build()?, k2.build()?)),
            KernelConfig::Product { k1, k2 } => {
                Box::new(ProductKernel::from_boxed(k1.build()?, k2.build()?))
            }
            KernelConfig::Exponentiation {
                base_kernel,
                exponent,
            } => Box::new(ExponentiationKernel::from_boxed(
                base_kernel.build()?,
                *exponent,
            )?),
            KernelConfig::Spectrum { n_gram_length } => {
                Box::new(SpectrumKernel::new(*n_gram_length)?)
            }
            KernelConfig::DistanceSpectrum {
                base_kernel,
                n_gram_length,
            } => Box::new(DistanceSpectrumKernel::from_boxed(
                base_kernel.build()?,
                *n_gram_length,
            )?),
        };
        tracing::debug!(kernel = %kernel, "built kernel from config");
        Ok(kernel)
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
