//! # Tensorlogic-GP-Kernels
//!
//! **Version**: 0.1.0-alpha.2 | **Status**: Production Ready
//!
//! Composable, differentiable covariance kernels for Gaussian-process
//! regression over real-valued vectors and ASCII strings.
//!
//! Every kernel maps one batch of inputs to a Gram matrix and, when it has
//! free hyperparameters, to the gradient of that matrix w.r.t. its
//! log-parameterized hyperparameter vector `theta`. Kernels compose with `+`,
//! `*` and [`KernelExt::pow`] into trees that are themselves kernels.
//!
//! ## Features
//!
//! - ✅ **Log-space hyperparameters** - Positive parameters stored as `ln(value)`
//! - ✅ **RBF kernel** - Isotropic or one lengthscale per feature
//! - ✅ **Constant / White kernels** - Scaling, offsets and observation noise
//! - ✅ **Kernel algebra** - Sum, product and exponentiation with exact gradients
//! - ✅ **String kernels** - Spectrum and distance-weighted spectrum over k-grams
//! - ✅ **Serializable trees** - `KernelConfig` round-trips kernels through JSON
//!
//! ## Architecture
//!
//! ### Kernel Trait
//!
//! All kernels implement the object-safe [`Kernel`] trait. Inputs are passed
//! as a [`KernelInput`], which is either a dense `(n_samples, n_features)`
//! matrix, a batch of encoded strings, or pre-extracted n-grams:
//!
//! ```rust
//! use scirs2_core::ndarray::array;
//! use tensorlogic_gp_kernels::{Kernel, RbfKernel};
//!
//! let kernel = RbfKernel::new(5.0).unwrap();
//! let x = array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]];
//!
//! let k = kernel.evaluate((&x).into(), None).unwrap();
//! assert_eq!(k.dim(), (3, 3));
//!
//! let (_, gradient) = kernel.evaluate_with_gradient((&x).into()).unwrap();
//! assert_eq!(gradient.dim(), (3, 3, 1));
//! ```
//!
//! ### Kernel Composition
//!
//! ```rust
//! use scirs2_core::ndarray::array;
//! use tensorlogic_gp_kernels::{ConstantKernel, Kernel, KernelExt, RbfKernel, WhiteKernel};
//!
//! let kernel = ConstantKernel::new(2.0).unwrap() * RbfKernel::new(1.0).unwrap()
//!     + WhiteKernel::new(0.1).unwrap();
//! assert_eq!(kernel.n_dims(), 3);
//! for p in kernel.hyperparameters() {
//!     println!("{} = {:?}", p.name(), p.values());
//! }
//!
//! // Evaluate at a different point in hyperparameter space
//! let moved = kernel.clone_with_theta(&[0.0, 0.5, -2.0]).unwrap();
//! let x = array![[0.0], [1.0]];
//! let k = moved.evaluate((&x).into(), None).unwrap();
//! assert!((k[[0, 0]] - (1.0 + (-2.0_f64).exp())).abs() < 1e-12);
//!
//! let squared = RbfKernel::new(1.0).unwrap().pow(2.0).unwrap();
//! assert_eq!(squared.to_string(), "RBF(lengthscale=1) ** 2");
//! ```
//!
//! ### String Kernels
//!
//! ```rust
//! use tensorlogic_gp_kernels::{
//!     AsciiBytesTransformer, Kernel, NGramTransformer, SpectrumKernel,
//! };
//!
//! let strings = AsciiBytesTransformer::new().transform(["aabbcc", "aaabac"]).unwrap();
//!
//! // Extract 2-grams internally...
//! let kernel = SpectrumKernel::new(Some(2)).unwrap();
//! let k = kernel.evaluate((&strings).into(), None).unwrap();
//!
//! // ...or feed pre-extracted 2-grams
//! let grams = NGramTransformer::new(2).unwrap().transform(&strings).unwrap();
//! let k_pre = SpectrumKernel::new(None).unwrap().evaluate((&grams).into(), None).unwrap();
//! assert_eq!(k, k_pre);
//! ```
//!
//! ## Design Philosophy
//!
//! 1. **Log-space parameters**: optimizers work on unconstrained `theta`
//! 2. **Composability**: any two kernels combine, including string kernels
//! 3. **Pure evaluation**: kernels never mutate during evaluation
//! 4. **Explicit errors**: invalid parameters and inputs are returned, never panicked

pub mod composite_kernel;
pub mod config;
pub mod error;
pub mod gradient;
pub mod hyperparameter;
pub mod string_kernel;
pub mod string_transform;
pub mod tensor_kernels;
pub mod types;
pub mod utility_kernels;

// Re-export main types for convenience
pub use composite_kernel::{ExponentiationKernel, KernelExt, ProductKernel, SumKernel};
pub use config::{KernelConfig, LengthscaleConfig};
pub use error::{KernelError, Result};
pub use hyperparameter::Hyperparameter;
pub use string_kernel::{DistanceSpectrumKernel, SpectrumKernel};
pub use string_transform::{
    AsciiBytesTransformer, EncodedBatch, NGramBatch, NGramTransformer, PAD_BYTE,
};
pub use tensor_kernels::RbfKernel;
pub use types::{GradientTensor, GramMatrix, Kernel, KernelInput};
pub use utility_kernels::{ConstantKernel, WhiteKernel};
