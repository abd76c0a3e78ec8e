// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Function Approximators
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gaussian kernel activations and radial basis function network
//! regression for learned movement forcing terms.
//!
//! Architecture:
//!   - kernel: activations a[t][b] (plain, normalised, asymmetric)
//!   - params: centers / widths / weights with eager shape checks
//!   - rbfn: real-time single-sample and batch prediction
//!   - registry: tag → decoder dispatch for persisted approximators

#![deny(unsafe_code)]

pub mod kernel;
pub mod params;
pub mod rbfn;
pub mod registry;

pub use kernel::{activations, gaussian_activations, KernelOptions};
pub use params::ModelParametersRbfn;
pub use rbfn::FunctionApproximatorRbfn;
pub use registry::{AnyApproximator, ApproximatorKind};
