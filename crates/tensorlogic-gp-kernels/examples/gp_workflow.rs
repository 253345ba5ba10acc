//! Gaussian-Process Kernel Workflow
//!
//! This example builds a GP regression kernel, inspects and moves its
//! hyperparameters, checks its gradient, stores it as JSON, and finally
//! compares strings with spectrum kernels.
//!
//! Run with: cargo run --example gp_workflow

use scirs2_core::ndarray::Array2;
use tensorlogic_gp_kernels::gradient::{finite_difference_gradient, max_abs_difference};
use tensorlogic_gp_kernels::{
    AsciiBytesTransformer, ConstantKernel, DistanceSpectrumKernel, Kernel, KernelConfig,
    KernelExt, RbfKernel, SpectrumKernel, WhiteKernel,
};

fn main() -> anyhow::Result<()> {
    println!("=== GP Kernel Workflow ===\n");

    // Step 1: Build a kernel tree
    println!("STEP 1: Kernel Construction");
    println!("───────────────────────────");
    let kernel = ConstantKernel::new(2.0)? * RbfKernel::anisotropic(&[1.0, 0.5])?
        + RbfKernel::new(3.0)?.pow(2.0)?
        + WhiteKernel::new(0.05)?;
    println!("Kernel: {}", kernel);
    println!("Free hyperparameters: {}", kernel.n_dims());
    for p in kernel.hyperparameters() {
        println!("  {:<28} value={:?} fixed={}", p.name(), p.values(), p.is_fixed());
    }
    println!();

    // Step 2: Evaluate with gradient
    println!("STEP 2: Gram Matrix and Gradient");
    println!("────────────────────────────────");
    let x = Array2::from_shape_fn((6, 2), |(i, j)| ((i * 2 + j) as f64 * 0.9).sin());
    let (k, gradient) = kernel.evaluate_with_gradient((&x).into())?;
    println!("Gram matrix shape: {:?}", k.dim());
    println!("Gradient shape:    {:?}", gradient.dim());

    let numeric = finite_difference_gradient(&kernel, (&x).into(), 1e-6)?;
    println!(
        "Max |analytic - finite difference|: {:.2e}",
        max_abs_difference(&gradient, &numeric)
    );
    println!();

    // Step 3: Move through hyperparameter space
    println!("STEP 3: Hyperparameter Updates");
    println!("──────────────────────────────");
    let theta = kernel.theta();
    let shifted: Vec<f64> = theta.iter().map(|t| t - 0.5).collect();
    let moved = kernel.clone_with_theta(&shifted)?;
    println!("theta:        {:?}", theta.to_vec());
    println!("moved kernel: {}", moved);
    println!();

    // Step 4: Persist as JSON
    println!("STEP 4: Configuration Round Trip");
    println!("────────────────────────────────");
    let json = moved.config().to_json()?;
    println!("{}", json);
    let restored = KernelConfig::from_json(&json)?.build()?;
    let drift = max_abs_difference(
        &moved.evaluate((&x).into(), None)?,
        &restored.evaluate((&x).into(), None)?,
    );
    println!("Restored kernel drift: {:.2e}", drift);
    println!();

    // Step 5: String kernels
    println!("STEP 5: String Kernels");
    println!("──────────────────────");
    let words = ["aabbcc", "aaabac", "abcabc"];
    let strings = AsciiBytesTransformer::new().transform(words)?;

    let spectrum = SpectrumKernel::new(Some(2))?;
    let distance = DistanceSpectrumKernel::new(RbfKernel::new(1.0)?, Some(2))?;
    for (name, k) in [
        ("Spectrum", spectrum.evaluate((&strings).into(), None)?),
        ("DistanceSpectrum", distance.evaluate((&strings).into(), None)?),
    ] {
        println!("{}:", name);
        for (i, row) in k.rows().into_iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|v| format!("{:8.4}", v)).collect();
            println!("  {:<8} {}", words[i], cells.join(" "));
        }
    }

    println!("\n✓ Workflow complete");
    Ok(())
}
