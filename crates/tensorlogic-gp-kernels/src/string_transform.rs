//! String preprocessing for the structured string kernels.
//!
//! Two transformers turn raw text into kernel inputs:
//!
//! - [`AsciiBytesTransformer`] encodes a batch of ASCII strings into one
//!   rectangular byte matrix, right-padded with [`PAD_BYTE`]
//! - [`NGramTransformer`] slides a window of length k over every encoded
//!   string and yields the ordered list of k-byte windows
//!
//! ```rust
//! use tensorlogic_gp_kernels::{AsciiBytesTransformer, NGramTransformer};
//!
//! let ascii = AsciiBytesTransformer::new();
//! let encoded = ascii.transform(&["abc", "d"]).unwrap();
//! assert_eq!(encoded.width(), 3);
//! assert_eq!(ascii.inverse_transform(&encoded).unwrap(), vec!["abc", "d"]);
//!
//! let ngrams = NGramTransformer::new(2).unwrap().transform(&encoded).unwrap();
//! assert_eq!(ngrams.ngrams(0), &[b"ab".to_vec(), b"bc".to_vec()]);
//! assert_eq!(ngrams.ngrams(1), &[b"d".to_vec()]);
//! ```

use std::collections::HashMap;

use scirs2_core::ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Padding byte for strings shorter than the widest string in a batch.
///
/// Lies outside the ASCII range, so padding can never be confused with
/// string content and decoding is unambiguous.
pub const PAD_BYTE: u8 = 0xFF;

/// A batch of strings encoded as a `(n_strings, width)` byte matrix.
///
/// Row `i` holds the bytes of string `i` followed by [`PAD_BYTE`] up to
/// `width`, the length of the longest string in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    data: Array2<u8>,
}

impl EncodedBatch {
    /// Wrap an existing byte matrix.
    ///
    /// Rows must be ASCII bytes followed only by [`PAD_BYTE`]; this is
    /// checked by [`AsciiBytesTransformer::inverse_transform`].
    pub fn from_array(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// Underlying byte matrix.
    pub fn as_array(&self) -> &Array2<u8> {
        &self.data
    }

    /// Number of strings.
    pub fn n_strings(&self) -> usize {
        self.data.nrows()
    }

    /// Padded row width.
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Bytes of string `i` with padding stripped.
    pub fn string_bytes(&self, i: usize) -> Vec<u8> {
        self.data
            .row(i)
            .iter()
            .copied()
            .take_while(|&b| b != PAD_BYTE)
            .collect()
    }
}

/// Reversible encoding of ASCII strings into padded byte rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AsciiBytesTransformer {
    /// Truncate strings longer than this many bytes
    pub max_length: Option<usize>,
}

impl AsciiBytesTransformer {
    /// Create a transformer that keeps strings at full length.
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate every string to at most `max_length` bytes.
    ///
    /// Truncated strings do not survive the inverse transform unchanged.
    pub fn with_max_length(mut self, max_length: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(KernelError::invalid_parameter(
                "max_length",
                max_length,
                "max_length must be positive",
            ));
        }
        self.max_length = Some(max_length);
        Ok(self)
    }

    /// Encode strings into a padded byte matrix.
    ///
    /// Fails with [`KernelError::InvalidInput`] for non-ASCII strings.
    pub fn transform<I, S>(&self, strings: I) -> Result<EncodedBatch>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rows: Vec<Vec<u8>> = Vec::new();
        for (i, s) in strings.into_iter().enumerate() {
            let s = s.as_ref();
            if !s.is_ascii() {
                return Err(KernelError::InvalidInput(format!(
                    "string {} ({:?}) contains non-ASCII characters",
                    i, s
                )));
            }
            let mut bytes = s.as_bytes().to_vec();
            if let Some(max) = self.max_length {
                bytes.truncate(max);
            }
            rows.push(bytes);
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut data = Array2::from_elem((rows.len(), width), PAD_BYTE);
        for (i, bytes) in rows.iter().enumerate() {
            for (j, &b) in bytes.iter().enumerate() {
                data[[i, j]] = b;
            }
        }

        tracing::debug!(n_strings = rows.len(), width, "encoded ASCII batch");
        Ok(EncodedBatch { data })
    }

    /// Decode a batch back into strings, stripping padding.
    pub fn inverse_transform(&self, batch: &EncodedBatch) -> Result<Vec<String>> {
        let mut strings = Vec::with_capacity(batch.n_strings());
        for (i, row) in batch.as_array().rows().into_iter().enumerate() {
            let bytes = batch.string_bytes(i);
            if row.iter().skip(bytes.len()).any(|&b| b != PAD_BYTE) {
                return Err(KernelError::InvalidInput(format!(
                    "row {} has content after padding",
                    i
                )));
            }
            if let Some(bad) = bytes.iter().find(|b| !b.is_ascii()) {
                return Err(KernelError::InvalidInput(format!(
                    "row {} contains non-ASCII byte {:#04x}",
                    i, bad
                )));
            }
            let s = String::from_utf8(bytes)
                .map_err(|e| KernelError::InvalidInput(format!("row {}: {}", i, e)))?;
            strings.push(s);
        }
        Ok(strings)
    }
}

/// Per-string ordered lists of contiguous byte windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NGramBatch {
    n_gram_length: usize,
    grams: Vec<Vec<Vec<u8>>>,
}

impl NGramBatch {
    /// Build a batch from already-windowed strings.
    pub fn new(n_gram_length: usize, grams: Vec<Vec<Vec<u8>>>) -> Result<Self> {
        if n_gram_length == 0 {
            return Err(KernelError::invalid_parameter(
                "n_gram_length",
                n_gram_length,
                "n-gram length must be positive",
            ));
        }
        for (i, row) in grams.iter().enumerate() {
            if let Some(g) = row.iter().find(|g| g.is_empty() || g.len() > n_gram_length) {
                return Err(KernelError::shape_mismatch(
                    vec![n_gram_length],
                    vec![g.len()],
                    format!("n-gram of string {}", i),
                ));
            }
        }
        Ok(Self {
            n_gram_length,
            grams,
        })
    }

    /// Window length k.
    pub fn n_gram_length(&self) -> usize {
        self.n_gram_length
    }

    /// Number of strings.
    pub fn n_strings(&self) -> usize {
        self.grams.len()
    }

    /// Windows of string `i` in position order.
    pub fn ngrams(&self, i: usize) -> &[Vec<u8>] {
        &self.grams[i]
    }

    /// Iterate over the window lists of all strings.
    pub fn iter(&self) -> impl Iterator<Item = &[Vec<u8>]> {
        self.grams.iter().map(Vec::as_slice)
    }

    /// Multiset view of string `i`: n-gram -> occurrence count.
    pub(crate) fn counts(&self, i: usize) -> HashMap<&[u8], usize> {
        let mut counts = HashMap::new();
        for g in &self.grams[i] {
            *counts.entry(g.as_slice()).or_insert(0) += 1;
        }
        counts
    }

    /// Positional view of string `i`: n-gram -> window positions.
    pub(crate) fn positions(&self, i: usize) -> HashMap<&[u8], Vec<usize>> {
        let mut positions: HashMap<&[u8], Vec<usize>> = HashMap::new();
        for (p, g) in self.grams[i].iter().enumerate() {
            positions.entry(g.as_slice()).or_default().push(p);
        }
        positions
    }
}

/// Sliding-window n-gram extractor over encoded strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NGramTransformer {
    /// Window length k
    pub n_gram_length: usize,
}

impl NGramTransformer {
    /// Create an extractor for windows of length `n_gram_length`.
    pub fn new(n_gram_length: usize) -> Result<Self> {
        if n_gram_length == 0 {
            return Err(KernelError::invalid_parameter(
                "n_gram_length",
                n_gram_length,
                "n-gram length must be positive",
            ));
        }
        Ok(Self { n_gram_length })
    }

    /// Extract the `len - k + 1` windows of every string.
    ///
    /// A string shorter than k yields itself as its only window; an empty
    /// string yields no windows.
    pub fn transform(&self, batch: &EncodedBatch) -> Result<NGramBatch> {
        let k = self.n_gram_length;
        let grams = (0..batch.n_strings())
            .map(|i| {
                let bytes = batch.string_bytes(i);
                if bytes.is_empty() {
                    Vec::new()
                } else if bytes.len() < k {
                    vec![bytes]
                } else {
                    bytes.windows(k).map(<[u8]>::to_vec).collect()
                }
            })
            .collect();

        tracing::trace!(n_strings = batch.n_strings(), k, "extracted n-grams");
        NGramBatch::new(k, grams)
    }
}
