//! Integration tests for numeric kernels and the kernel algebra.
//!
//! Exercises the public API the way a Gaussian-process optimizer would:
//! build a kernel tree, read theta, move through hyperparameter space and
//! compare analytic gradients with finite differences.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use scirs2_core::ndarray::{array, Array2, Axis};
use tensorlogic_gp_kernels::gradient::{finite_difference_gradient, is_symmetric, max_abs_difference};
use tensorlogic_gp_kernels::*;

fn sample_data(n: usize, d: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, d), |(i, j)| ((i * d + j) as f64 * 1.3).sin() * 2.0)
}

// ============================================================================
// RBF
// ============================================================================

#[test]
fn test_rbf_closed_form() {
    let x = sample_data(5, 3);
    let l = 1.7;
    let kernel = RbfKernel::new(l).unwrap();
    let k = kernel.evaluate((&x).into(), None).unwrap();

    for i in 0..5 {
        for j in 0..5 {
            let d2: f64 = x
                .row(i)
                .iter()
                .zip(x.row(j).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            assert_relative_eq!(k[[i, j]], (-0.5 * d2 / (l * l)).exp(), max_relative = 1e-6);
        }
    }
    assert!(is_symmetric(&k, 1e-12));
}

#[test]
fn test_rbf_gradient_finite_difference() {
    let x = sample_data(6, 2);
    let kernel = RbfKernel::new(0.8).unwrap();
    let (_, grad) = kernel.evaluate_with_gradient((&x).into()).unwrap();
    let approx = finite_difference_gradient(&kernel, (&x).into(), 1e-7).unwrap();
    assert!(max_abs_difference(&grad, &approx) < 1e-4);
}

#[test]
fn test_rbf_cross_dimension_mismatch() {
    let kernel = RbfKernel::new(1.0).unwrap();
    let x = sample_data(3, 2);
    let y = sample_data(3, 4);
    assert!(matches!(
        kernel.evaluate((&x).into(), Some((&y).into())),
        Err(KernelError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_rbf_rejects_invalid_lengthscale() {
    assert!(matches!(
        RbfKernel::new(0.0),
        Err(KernelError::InvalidParameter { .. })
    ));
    assert!(RbfKernel::new(-2.0).is_err());
    assert!(RbfKernel::anisotropic(&[1.0, f64::NAN]).is_err());
}

#[test]
fn test_rbf_rejects_string_input() {
    let strings = AsciiBytesTransformer::new().transform(["abc"]).unwrap();
    let kernel = RbfKernel::new(1.0).unwrap();
    assert!(matches!(
        kernel.evaluate((&strings).into(), None),
        Err(KernelError::UnsupportedOperation(_))
    ));
}

// ============================================================================
// Constant
// ============================================================================

#[test]
fn test_constant_value_and_gradient() {
    let x = sample_data(4, 2);
    let kernel = ConstantKernel::new(3.5).unwrap();
    let (k, grad) = kernel.evaluate_with_gradient((&x).into()).unwrap();
    assert!(k.iter().all(|&v| (v - 3.5).abs() < 1e-12));
    assert!(grad.iter().all(|&v| (v - 3.5).abs() < 1e-12));
}

// ============================================================================
// Algebra
// ============================================================================

#[test]
fn test_algebra_laws() {
    let x = sample_data(7, 3);
    let k1 = RbfKernel::new(0.9).unwrap();
    let k2 = ConstantKernel::new(1.7).unwrap();
    let g1 = k1.evaluate((&x).into(), None).unwrap();
    let g2 = k2.evaluate((&x).into(), None).unwrap();

    let sum = (k1.clone() + k2.clone()).evaluate((&x).into(), None).unwrap();
    assert!(max_abs_difference(&sum, &(&g1 + &g2)) < 1e-12);

    let product = (k1.clone() * k2).evaluate((&x).into(), None).unwrap();
    assert!(max_abs_difference(&product, &(&g1 * &g2)) < 1e-12);

    let power = k1.pow(2.5).unwrap().evaluate((&x).into(), None).unwrap();
    assert!(max_abs_difference(&power, &g1.mapv(|v| v.powf(2.5))) < 1e-12);
}

#[test]
fn test_nested_tree_gradient() {
    let x = sample_data(5, 2);
    let kernel = ConstantKernel::new(2.0).unwrap() * RbfKernel::new(1.5).unwrap().pow(2.0).unwrap()
        + RbfKernel::anisotropic(&[0.5, 3.0]).unwrap()
        + WhiteKernel::new(0.01).unwrap();
    assert_eq!(kernel.n_dims(), 5);

    let (k, grad) = kernel.evaluate_with_gradient((&x).into()).unwrap();
    assert!(is_symmetric(&k, 1e-12));
    assert_eq!(grad.dim(), (5, 5, 5));
    for p in 0..5 {
        assert!(is_symmetric(&grad.index_axis(Axis(2), p).to_owned(), 1e-12));
    }

    let approx = finite_difference_gradient(&kernel, (&x).into(), 1e-6).unwrap();
    assert!(max_abs_difference(&grad, &approx) < 1e-6);
}

#[test]
fn test_theta_roundtrip_through_set_theta() {
    let mut kernel = ConstantKernel::new(2.0).unwrap() * RbfKernel::new(1.0).unwrap();
    let theta = kernel.theta();
    assert_abs_diff_eq!(theta[0], 2.0_f64.ln(), epsilon = 1e-12);
    assert_abs_diff_eq!(theta[1], 0.0, epsilon = 1e-12);

    kernel.set_theta(&[0.0, 1.0]).unwrap();
    let names: Vec<_> = kernel.hyperparameters();
    assert_eq!(names[0].name(), "k1__value");
    assert_abs_diff_eq!(names[0].value(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(names[1].value(), 1.0_f64.exp(), epsilon = 1e-12);
}

#[test]
fn test_clone_with_theta_is_independent() {
    let kernel = RbfKernel::new(1.0).unwrap() + WhiteKernel::new(0.1).unwrap();
    let x = sample_data(4, 2);
    let k_before = kernel.evaluate((&x).into(), None).unwrap();

    let moved = kernel.clone_with_theta(&[2.0, -5.0]).unwrap();
    let k_moved = moved.evaluate((&x).into(), None).unwrap();
    let k_after = kernel.evaluate((&x).into(), None).unwrap();

    assert!(max_abs_difference(&k_before, &k_after) < 1e-15);
    assert!(max_abs_difference(&k_before, &k_moved) > 1e-3);
}

#[test]
fn test_boxed_composition() {
    let parts: Vec<Box<dyn Kernel>> = vec![
        RbfKernel::new(1.0).unwrap().boxed(),
        ConstantKernel::new(0.5).unwrap().boxed(),
        WhiteKernel::new(0.2).unwrap().boxed(),
    ];
    let kernel = parts
        .into_iter()
        .reduce(|acc, k| SumKernel::from_boxed(acc, k).boxed())
        .unwrap();
    assert_eq!(kernel.n_dims(), 3);

    let x = array![[0.0], [1.0]];
    let k = kernel.evaluate((&x).into(), None).unwrap();
    assert_abs_diff_eq!(k[[0, 0]], 1.0 + 0.5 + 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(k[[0, 1]], (-0.5_f64).exp() + 0.5, epsilon = 1e-12);
}

#[test]
fn test_kernels_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Box<dyn Kernel>>();
    assert_send_sync::<SumKernel>();
    assert_send_sync::<DistanceSpectrumKernel>();
}

#[test]
fn test_concurrent_evaluation_of_clones() {
    let kernel = ConstantKernel::new(2.0).unwrap() * RbfKernel::new(1.0).unwrap();
    let x = sample_data(8, 3);
    let expected = kernel.evaluate((&x).into(), None).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let local = kernel.clone_box();
                let x = &x;
                scope.spawn(move || local.evaluate(x.into(), None))
            })
            .collect();
        for handle in handles {
            let k = handle.join().unwrap().unwrap();
            assert!(max_abs_difference(&k, &expected) < 1e-15);
        }
    });
}
