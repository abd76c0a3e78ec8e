// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Dynamical Systems
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Attractor dynamical systems for movement generation: exponential,
//! sigmoid, spring-damper and time (phase) systems behind one
//! integration interface, with Euler/RK4 stepping, closed-form
//! solutions and tagged JSON persistence.

#![deny(unsafe_code)]

pub mod exponential;
pub mod registry;
pub mod sigmoid;
pub mod spring_damper;
pub mod system;
pub mod time;

pub use exponential::{Exponential, ExponentialSystem};
pub use registry::{AnySystem, SystemKind};
pub use sigmoid::{Sigmoid, SigmoidSystem};
pub use spring_damper::{DampingRegime, SpringDamper, SpringDamperSystem, CRITICALLY_DAMPED};
pub use system::{DynamicalSystem, SystemCore, SystemDynamics};
pub use time::{Time, TimeSystem};
