// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Error hierarchy, runtime configuration and persisted-document helpers
//! shared by the dynamical-system and function-approximator crates.

#![deny(unsafe_code)]

pub mod config;
pub mod document;
pub mod error;
pub mod integration;

pub use config::MotionConfig;
pub use error::{MotionError, MotionResult};
pub use integration::IntegrationMethod;
