// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Gaussian Kernel Activations
// ─────────────────────────────────────────────────────────────────────
//! a[t][b] = exp(−½ · Σ_d ((x[t][d] − c[b][d]) / w[b][d])²)
//!
//! Optional row normalisation (Σ_b a[t][b] = 1) and asymmetric widths
//! (inputs left of a center use the width of the basis function to the
//! left). Writes into caller-owned buffers.

use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use motion_types::{MotionConfig, MotionError, MotionResult};

/// Evaluation switches for kernel activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KernelOptions {
    pub normalized: bool,
    pub asymmetric: bool,
}

impl From<&MotionConfig> for KernelOptions {
    fn from(config: &MotionConfig) -> Self {
        Self {
            normalized: config.normalized_kernels,
            asymmetric: config.asymmetric_kernels,
        }
    }
}

/// Gaussian activations of every basis function for every input row.
///
/// `centers`, `widths`: n_basis × n_dims. `inputs`: T × n_dims.
/// `out`: T × n_basis. Widths are expected to be positive; the model
/// parameters enforce that at construction.
pub fn gaussian_activations(
    centers: ArrayView2<'_, f64>,
    widths: ArrayView2<'_, f64>,
    inputs: ArrayView2<'_, f64>,
    options: KernelOptions,
    mut out: ArrayViewMut2<'_, f64>,
) -> MotionResult<()> {
    let (n_basis, n_dims) = centers.dim();
    if widths.dim() != centers.dim() {
        return Err(MotionError::Structural(format!(
            "widths are {:?}, centers are {:?}",
            widths.dim(),
            centers.dim()
        )));
    }
    if inputs.ncols() != n_dims {
        return Err(MotionError::Structural(format!(
            "inputs have {} columns, expected {n_dims}",
            inputs.ncols()
        )));
    }
    if out.dim() != (inputs.nrows(), n_basis) {
        return Err(MotionError::Structural(format!(
            "activation buffer is {:?}, expected ({}, {n_basis})",
            out.dim(),
            inputs.nrows()
        )));
    }

    // A single normalised kernel is 1 everywhere.
    if options.normalized && n_basis == 1 {
        out.fill(1.0);
        return Ok(());
    }

    for (t, x) in inputs.rows().into_iter().enumerate() {
        for b in 0..n_basis {
            let mut exponent = 0.0;
            for d in 0..n_dims {
                let c = centers[[b, d]];
                let w = if options.asymmetric && b > 0 && x[d] < c {
                    widths[[b - 1, d]]
                } else {
                    widths[[b, d]]
                };
                let z = (x[d] - c) / w;
                exponent += z * z;
            }
            out[[t, b]] = (-0.5 * exponent).exp();
        }

        if options.normalized {
            let mut row = out.row_mut(t);
            let sum = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|a| a / sum);
            } else {
                log::debug!("all kernels inactive at input row {t}; using uniform activations");
                row.fill(1.0 / n_basis as f64);
            }
        }
    }
    Ok(())
}

/// Allocating variant of [`gaussian_activations`].
pub fn activations(
    centers: ArrayView2<'_, f64>,
    widths: ArrayView2<'_, f64>,
    inputs: ArrayView2<'_, f64>,
    options: KernelOptions,
) -> MotionResult<Array2<f64>> {
    let mut out = Array2::zeros((inputs.nrows(), centers.nrows()));
    gaussian_activations(centers, widths, inputs, options, out.view_mut())?;
    Ok(out)
}
