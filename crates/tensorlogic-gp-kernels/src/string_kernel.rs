//! String kernels over k-gram spectra.
//!
//! Both kernels work in one of two modes:
//! - `n_gram_length = Some(k)`: accept encoded strings from
//!   [`AsciiBytesTransformer`](crate::AsciiBytesTransformer) and extract
//!   k-grams internally (pre-extracted k-grams are accepted too);
//! - `n_gram_length = None`: accept only pre-extracted
//!   [`NGramBatch`](crate::NGramBatch) input.
//!
//! The k-gram vocabulary is implicit; only grams present in the compared
//! strings are ever looked at.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use scirs2_core::ndarray::{s, Array1, Array2, Array3, Axis};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::hyperparameter::Hyperparameter;
use crate::string_transform::{NGramBatch, NGramTransformer};
use crate::types::{no_free_parameters, GradientTensor, GramMatrix, Kernel, KernelInput};

fn validate_n_gram_length(n_gram_length: Option<usize>) -> Result<()> {
    if n_gram_length == Some(0) {
        return Err(KernelError::invalid_parameter(
            "n_gram_length",
            0,
            "n-gram length must be positive",
        ));
    }
    Ok(())
}

/// Turn a kernel input into k-grams according to the kernel's mode.
fn resolve_ngrams<'a>(
    kernel: &str,
    n_gram_length: Option<usize>,
    input: KernelInput<'a>,
) -> Result<Cow<'a, NGramBatch>> {
    match (input, n_gram_length) {
        (KernelInput::NGrams(batch), None) => Ok(Cow::Borrowed(batch)),
        (KernelInput::NGrams(batch), Some(k)) if batch.n_gram_length() == k => {
            Ok(Cow::Borrowed(batch))
        }
        (KernelInput::NGrams(batch), Some(k)) => Err(KernelError::InvalidInput(format!(
            "{} kernel expects {}-grams, got {}-grams",
            kernel,
            k,
            batch.n_gram_length()
        ))),
        (KernelInput::Strings(batch), Some(k)) => {
            Ok(Cow::Owned(NGramTransformer::new(k)?.transform(batch)?))
        }
        (other, _) => Err(KernelError::UnsupportedOperation(format!(
            "{} kernel with n_gram_length={:?} cannot read {} input",
            kernel,
            n_gram_length,
            other.kind()
        ))),
    }
}

/// Resolve both operands and make sure their window lengths agree.
fn resolve_pair<'a, 'b>(
    kernel: &str,
    n_gram_length: Option<usize>,
    x: KernelInput<'a>,
    y: KernelInput<'b>,
) -> Result<(Cow<'a, NGramBatch>, Cow<'b, NGramBatch>)> {
    let gx = resolve_ngrams(kernel, n_gram_length, x)?;
    let gy = resolve_ngrams(kernel, n_gram_length, y)?;
    if gx.n_gram_length() != gy.n_gram_length() {
        return Err(KernelError::InvalidInput(format!(
            "{} kernel compares {}-grams with {}-grams",
            kernel,
            gx.n_gram_length(),
            gy.n_gram_length()
        )));
    }
    Ok((gx, gy))
}

fn fmt_n_gram_length(n_gram_length: Option<usize>) -> String {
    n_gram_length.map_or_else(|| "None".to_string(), |k| k.to_string())
}

/// Spectrum kernel: inner product of k-gram count vectors.
///
/// K(s, t) = Σ_g count_s(g) · count_t(g)
///
/// Equivalently, the number of matching k-gram pairs between `s` and `t`,
/// regardless of where they occur. The kernel has no hyperparameters.
///
/// # Example
///
/// ```rust
/// use tensorlogic_gp_kernels::{AsciiBytesTransformer, Kernel, SpectrumKernel};
///
/// let strings = AsciiBytesTransformer::new().transform(["aabbcc", "aaabac"]).unwrap();
/// let kernel = SpectrumKernel::new(Some(2)).unwrap();
/// let k = kernel.evaluate((&strings).into(), None).unwrap();
/// assert_eq!(k[[0, 0]], 5.0);
/// assert_eq!(k[[0, 1]], 3.0);
/// assert_eq!(k[[1, 1]], 7.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumKernel {
    n_gram_length: Option<usize>,
}

impl SpectrumKernel {
    /// Create a spectrum kernel (`None` expects pre-extracted n-grams).
    pub fn new(n_gram_length: Option<usize>) -> Result<Self> {
        validate_n_gram_length(n_gram_length)?;
        Ok(Self { n_gram_length })
    }

    /// Window length used for internal extraction.
    pub fn n_gram_length(&self) -> Option<usize> {
        self.n_gram_length
    }
}

fn shared_count(a: &HashMap<&[u8], usize>, b: &HashMap<&[u8], usize>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(gram, &ca)| large.get(gram).map(|&cb| (ca * cb) as f64))
        .sum()
}

impl Kernel for SpectrumKernel {
    fn name(&self) -> &str {
        "Spectrum"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        match y {
            None => {
                let grams = resolve_ngrams(self.name(), self.n_gram_length, x)?;
                let n = grams.n_strings();
                tracing::debug!(kernel = self.name(), n_samples = n, "evaluating self-similarity");

                let counts: Vec<_> = (0..n).map(|i| grams.counts(i)).collect();
                let mut k: GramMatrix = Array2::zeros((n, n));
                for i in 0..n {
                    for j in i..n {
                        let v = shared_count(&counts[i], &counts[j]);
                        k[[i, j]] = v;
                        k[[j, i]] = v;
                    }
                }
                Ok(k)
            }
            Some(y) => {
                let (gx, gy) = resolve_pair(self.name(), self.n_gram_length, x, y)?;
                let (n, m) = (gx.n_strings(), gy.n_strings());
                tracing::debug!(kernel = self.name(), n, m, "evaluating cross-similarity");

                let counts_y: Vec<_> = (0..m).map(|j| gy.counts(j)).collect();
                let mut k: GramMatrix = Array2::zeros((n, m));
                for i in 0..n {
                    let counts_x = gx.counts(i);
                    for (j, cy) in counts_y.iter().enumerate() {
                        k[[i, j]] = shared_count(&counts_x, cy);
                    }
                }
                Ok(k)
            }
        }
    }

    fn evaluate_with_gradient(&self, _x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        Err(no_free_parameters(self.name()))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        let grams = resolve_ngrams(self.name(), self.n_gram_length, x)?;
        Ok(Array1::from_shape_fn(grams.n_strings(), |i| {
            grams.counts(i).values().map(|&c| (c * c) as f64).sum::<f64>()
        }))
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        Vec::new()
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn is_stationary(&self) -> bool {
        false
    }

    fn config(&self) -> KernelConfig {
        KernelConfig::Spectrum {
            n_gram_length: self.n_gram_length,
        }
    }
}

impl fmt::Display for SpectrumKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Spectrum(n_gram_length={})",
            fmt_n_gram_length(self.n_gram_length)
        )
    }
}

/// Spectrum kernel weighted by where matching k-grams occur.
///
/// Every pair of equal k-grams `(p, q)`, with `p` a window position in `s`
/// and `q` one in `t`, contributes the base kernel evaluated on the two
/// positions:
///
/// K(s, t) = Σ_p Σ_q [s_p == t_q] · base([p], [q])
///
/// A base kernel that is identically 1 (e.g. `ConstantKernel::new(1.0)`)
/// reduces this to [`SpectrumKernel`]; a stationary base such as RBF rewards
/// matches that occur at similar offsets. The base kernel's hyperparameters
/// are exposed as `base_kernel__*` and are differentiable.
///
/// # Example
///
/// ```rust
/// use tensorlogic_gp_kernels::{
///     AsciiBytesTransformer, DistanceSpectrumKernel, Kernel, RbfKernel,
/// };
///
/// let strings = AsciiBytesTransformer::new().transform(["aabbcc", "aaabac"]).unwrap();
/// let kernel = DistanceSpectrumKernel::new(RbfKernel::new(1.0).unwrap(), Some(2)).unwrap();
/// let k = kernel.evaluate((&strings).into(), None).unwrap();
/// let expected = 1.0 + 2.0 * (-0.5_f64).exp();
/// assert!((k[[0, 1]] - expected).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct DistanceSpectrumKernel {
    base_kernel: Box<dyn Kernel>,
    n_gram_length: Option<usize>,
}

type Positions<'a> = HashMap<&'a [u8], Vec<usize>>;

/// Window positions as a one-feature dense matrix.
fn position_column(positions: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((positions.len(), 1), |(r, _)| positions[r] as f64)
}

impl DistanceSpectrumKernel {
    /// Create a distance-weighted spectrum kernel over `base_kernel`.
    pub fn new<K: Kernel + 'static>(base_kernel: K, n_gram_length: Option<usize>) -> Result<Self> {
        Self::from_boxed(Box::new(base_kernel), n_gram_length)
    }

    /// Same as [`new`](Self::new) for an already-boxed base kernel.
    pub fn from_boxed(base_kernel: Box<dyn Kernel>, n_gram_length: Option<usize>) -> Result<Self> {
        validate_n_gram_length(n_gram_length)?;
        Ok(Self {
            base_kernel,
            n_gram_length,
        })
    }

    /// Kernel applied to window positions.
    pub fn base_kernel(&self) -> &dyn Kernel {
        self.base_kernel.as_ref()
    }

    /// Window length used for internal extraction.
    pub fn n_gram_length(&self) -> Option<usize> {
        self.n_gram_length
    }

    fn pair_value(&self, a: &Positions<'_>, b: &Positions<'_>) -> Result<f64> {
        let mut total = 0.0;
        for (gram, pa) in a {
            if let Some(pb) = b.get(gram) {
                let xa = position_column(pa);
                let xb = position_column(pb);
                total += self
                    .base_kernel
                    .evaluate((&xa).into(), Some((&xb).into()))?
                    .sum();
            }
        }
        Ok(total)
    }

    /// Value and theta-gradient of one entry.
    ///
    /// The base gradient is only defined in self mode, so both position sets
    /// are stacked and the off-diagonal block is summed.
    fn pair_value_and_gradient(
        &self,
        a: &Positions<'_>,
        b: &Positions<'_>,
        n_dims: usize,
    ) -> Result<(f64, Array1<f64>)> {
        let mut value = 0.0;
        let mut gradient = Array1::zeros(n_dims);
        for (gram, pa) in a {
            if let Some(pb) = b.get(gram) {
                let la = pa.len();
                let stacked: Vec<usize> = pa.iter().chain(pb.iter()).copied().collect();
                let positions = position_column(&stacked);
                let (k, g) = self.base_kernel.evaluate_with_gradient((&positions).into())?;

                value += k.slice(s![..la, la..]).sum();
                gradient += &g
                    .slice(s![..la, la.., ..])
                    .sum_axis(Axis(0))
                    .sum_axis(Axis(0));
            }
        }
        Ok((value, gradient))
    }
}

impl Kernel for DistanceSpectrumKernel {
    fn name(&self) -> &str {
        "DistanceSpectrum"
    }

    fn evaluate(&self, x: KernelInput<'_>, y: Option<KernelInput<'_>>) -> Result<GramMatrix> {
        match y {
            None => {
                let grams = resolve_ngrams(self.name(), self.n_gram_length, x)?;
                let n = grams.n_strings();
                tracing::debug!(
                    kernel = self.name(),
                    base = self.base_kernel.name(),
                    n_samples = n,
                    "evaluating self-similarity"
                );

                let positions: Vec<_> = (0..n).map(|i| grams.positions(i)).collect();
                let mut k: GramMatrix = Array2::zeros((n, n));
                for i in 0..n {
                    for j in i..n {
                        let v = self.pair_value(&positions[i], &positions[j])?;
                        k[[i, j]] = v;
                        k[[j, i]] = v;
                    }
                    tracing::trace!(row = i, "distance spectrum row done");
                }
                Ok(k)
            }
            Some(y) => {
                let (gx, gy) = resolve_pair(self.name(), self.n_gram_length, x, y)?;
                let (n, m) = (gx.n_strings(), gy.n_strings());
                tracing::debug!(
                    kernel = self.name(),
                    base = self.base_kernel.name(),
                    n,
                    m,
                    "evaluating cross-similarity"
                );

                let positions_y: Vec<_> = (0..m).map(|j| gy.positions(j)).collect();
                let mut k: GramMatrix = Array2::zeros((n, m));
                for i in 0..n {
                    let positions_x = gx.positions(i);
                    for (j, py) in positions_y.iter().enumerate() {
                        k[[i, j]] = self.pair_value(&positions_x, py)?;
                    }
                    tracing::trace!(row = i, "distance spectrum row done");
                }
                Ok(k)
            }
        }
    }

    fn evaluate_with_gradient(&self, x: KernelInput<'_>) -> Result<(GramMatrix, GradientTensor)> {
        let n_dims = self.n_dims();
        if n_dims == 0 {
            return Err(no_free_parameters(self.name()));
        }
        let grams = resolve_ngrams(self.name(), self.n_gram_length, x)?;
        let n = grams.n_strings();
        tracing::debug!(
            kernel = self.name(),
            base = self.base_kernel.name(),
            n_samples = n,
            n_dims,
            "evaluating gradient"
        );

        let positions: Vec<_> = (0..n).map(|i| grams.positions(i)).collect();
        let mut k: GramMatrix = Array2::zeros((n, n));
        let mut gradient: GradientTensor = Array3::zeros((n, n, n_dims));
        for i in 0..n {
            for j in i..n {
                let (v, g) = self.pair_value_and_gradient(&positions[i], &positions[j], n_dims)?;
                k[[i, j]] = v;
                k[[j, i]] = v;
                gradient.slice_mut(s![i, j, ..]).assign(&g);
                gradient.slice_mut(s![j, i, ..]).assign(&g);
            }
        }
        Ok((k, gradient))
    }

    fn diag(&self, x: KernelInput<'_>) -> Result<Array1<f64>> {
        let grams = resolve_ngrams(self.name(), self.n_gram_length, x)?;
        let mut diag: Array1<f64> = Array1::zeros(grams.n_strings());
        for (i, d) in diag.iter_mut().enumerate() {
            let positions = grams.positions(i);
            *d = self.pair_value(&positions, &positions)?;
        }
        Ok(diag)
    }

    fn hyperparameters(&self) -> Vec<Hyperparameter> {
        self.base_kernel
            .hyperparameters()
            .iter()
            .map(|p| p.prefixed("base_kernel"))
            .collect()
    }

    fn hyperparameters_mut(&mut self) -> Vec<&mut Hyperparameter> {
        self.base_kernel.hyperparameters_mut()
    }

    fn clone_box(&self) -> Box<dyn Kernel> {
        Box::new(self.clone())
    }

    fn is_stationary(&self) -> bool {
        false
    }

    fn is_psd(&self) -> bool {
        self.base_kernel.is_psd()
    }

    fn config(&self) -> KernelConfig {
        KernelConfig::DistanceSpectrum {
            base_kernel: Box::new(self.base_kernel.config()),
            n_gram_length: self.n_gram_length,
        }
    }
}

impl fmt::Display for DistanceSpectrumKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DistanceSpectrum(base_kernel={}, n_gram_length={})",
            self.base_kernel,
            fmt_n_gram_length(self.n_gram_length)
        )
    }
}
