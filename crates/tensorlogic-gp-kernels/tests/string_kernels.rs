//! Integration tests for string transforms and spectrum kernels.

use approx::assert_abs_diff_eq;
use scirs2_core::ndarray::array;
use tensorlogic_gp_kernels::gradient::{finite_difference_gradient, max_abs_difference};
use tensorlogic_gp_kernels::*;

const SCENARIO: [&str; 2] = ["aabbcc", "aaabac"];

fn encoded(strings: &[&str]) -> EncodedBatch {
    AsciiBytesTransformer::new().transform(strings).unwrap()
}

#[test]
fn test_spectrum_scenario() {
    let strings = encoded(&SCENARIO);
    let kernel = SpectrumKernel::new(Some(2)).unwrap();
    let k = kernel.evaluate((&strings).into(), None).unwrap();
    assert_eq!(k, array![[5.0, 3.0], [3.0, 7.0]]);
}

#[test]
fn test_spectrum_preextracted_scenario() {
    let strings = encoded(&SCENARIO);
    let grams = NGramTransformer::new(2).unwrap().transform(&strings).unwrap();
    let k_strings = SpectrumKernel::new(Some(2))
        .unwrap()
        .evaluate((&strings).into(), None)
        .unwrap();
    let k_grams = SpectrumKernel::new(None)
        .unwrap()
        .evaluate((&grams).into(), None)
        .unwrap();
    assert_eq!(k_strings, k_grams);
}

#[test]
fn test_distance_spectrum_scenario() {
    let strings = encoded(&SCENARIO);
    let kernel = DistanceSpectrumKernel::new(RbfKernel::new(1.0).unwrap(), Some(2)).unwrap();
    let k = kernel.evaluate((&strings).into(), None).unwrap();
    let expected = array![[5.0, 2.2130613], [2.2130613, 6.2130613]];
    assert!(max_abs_difference(&k, &expected) < 1e-6);
}

#[test]
fn test_distance_spectrum_preextracted_scenario() {
    let strings = encoded(&SCENARIO);
    let grams = NGramTransformer::new(2).unwrap().transform(&strings).unwrap();
    let k_strings = DistanceSpectrumKernel::new(RbfKernel::new(1.0).unwrap(), Some(2))
        .unwrap()
        .evaluate((&strings).into(), None)
        .unwrap();
    let k_grams = DistanceSpectrumKernel::new(RbfKernel::new(1.0).unwrap(), None)
        .unwrap()
        .evaluate((&grams).into(), None)
        .unwrap();
    assert!(max_abs_difference(&k_strings, &k_grams) < 1e-12);
}

#[test]
fn test_ascii_roundtrip_mixed_lengths() {
    let strings = vec![
        "".to_string(),
        "a".to_string(),
        "hello world".to_string(),
        "~!@#".to_string(),
    ];
    let transformer = AsciiBytesTransformer::new();
    let batch = transformer.transform(&strings).unwrap();
    assert_eq!(batch.width(), 11);
    assert_eq!(batch.as_array()[[0, 0]], PAD_BYTE);
    assert_eq!(transformer.inverse_transform(&batch).unwrap(), strings);
}

#[test]
fn test_ascii_rejects_non_ascii() {
    assert!(matches!(
        AsciiBytesTransformer::new().transform(["naïve"]),
        Err(KernelError::InvalidInput(_))
    ));
}

#[test]
fn test_ngram_windows() {
    let strings = encoded(&["abcd", "ab", ""]);
    let grams = NGramTransformer::new(3).unwrap().transform(&strings).unwrap();
    assert_eq!(grams.n_strings(), 3);
    assert_eq!(grams.ngrams(0), &[b"abc".to_vec(), b"bcd".to_vec()][..]);
    assert_eq!(grams.ngrams(1), &[b"ab".to_vec()][..]);
    assert!(grams.ngrams(2).is_empty());
}

#[test]
fn test_string_kernel_algebra() {
    let strings = encoded(&SCENARIO);
    let spectrum = SpectrumKernel::new(Some(2)).unwrap();
    let base = spectrum.evaluate((&strings).into(), None).unwrap();

    let kernel = ConstantKernel::new(0.5).unwrap() * spectrum + WhiteKernel::new(1.0).unwrap();
    let k = kernel.evaluate((&strings).into(), None).unwrap();
    assert_abs_diff_eq!(k[[0, 0]], 0.5 * base[[0, 0]] + 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(k[[0, 1]], 0.5 * base[[0, 1]], epsilon = 1e-12);

    // Only the constant and the noise level are differentiable
    let (_, grad) = kernel.evaluate_with_gradient((&strings).into()).unwrap();
    assert_eq!(grad.dim(), (2, 2, 2));
}

#[test]
fn test_distance_spectrum_gradient_through_tree() {
    let strings = encoded(&["aabbcc", "aaabac", "cabbage", "abba"]);
    let kernel = ConstantKernel::new(1.5).unwrap()
        * DistanceSpectrumKernel::new(RbfKernel::new(2.0).unwrap(), Some(2)).unwrap();
    let names: Vec<String> = kernel
        .hyperparameters()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["k1__value", "k2__base_kernel__lengthscale"]);

    let (_, grad) = kernel.evaluate_with_gradient((&strings).into()).unwrap();
    let approx = finite_difference_gradient(&kernel, (&strings).into(), 1e-6).unwrap();
    assert!(max_abs_difference(&grad, &approx) < 1e-5);
}

#[test]
fn test_string_kernel_config_roundtrip() {
    let kernel = SpectrumKernel::new(Some(3)).unwrap()
        + DistanceSpectrumKernel::new(RbfKernel::new(1.0).unwrap(), Some(3)).unwrap();
    let json = kernel.config().to_json().unwrap();
    let rebuilt = KernelConfig::from_json(&json).unwrap().build().unwrap();

    let strings = encoded(&["banana", "bandana", "cabana"]);
    let k1 = kernel.evaluate((&strings).into(), None).unwrap();
    let k2 = rebuilt.evaluate((&strings).into(), None).unwrap();
    assert!(max_abs_difference(&k1, &k2) < 1e-12);
}
