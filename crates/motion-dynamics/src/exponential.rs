// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Exponential System
// ─────────────────────────────────────────────────────────────────────
//! First-order exponential decay toward the attractor:
//!
//!   ẋ = α (x_attr − x) / τ
//!
//! Closed form: x(t) = x_attr + (x_0 − x_attr) · exp(−α t / τ).

use ndarray::{Array1, ArrayView1, ArrayViewMut1, ArrayViewMut2, Zip};
use serde_json::{json, Map, Value};

use motion_types::document::{f64_field, vector_field};
use motion_types::{MotionError, MotionResult};

use crate::system::{DynamicalSystem, SystemCore, SystemDynamics};

#[derive(Debug, Clone, PartialEq)]
pub struct Exponential {
    alpha: f64,
}

pub type ExponentialSystem = DynamicalSystem<Exponential>;

impl SystemDynamics for Exponential {
    const NAME: &'static str = "ExponentialSystem";
    const ORDER: usize = 1;

    fn differential_equation(
        &self,
        core: &SystemCore,
        x: ArrayView1<'_, f64>,
        mut xd: ArrayViewMut1<'_, f64>,
    ) {
        let rate = self.alpha / core.tau();
        Zip::from(&mut xd)
            .and(&x)
            .and(core.attractor_state())
            .for_each(|d, &xi, &attr| *d = rate * (attr - xi));
    }

    fn analytical_solution(
        &self,
        core: &SystemCore,
        ts: ArrayView1<'_, f64>,
        mut xs: ArrayViewMut2<'_, f64>,
        mut xds: ArrayViewMut2<'_, f64>,
    ) -> MotionResult<()> {
        let rate = self.alpha / core.tau();
        let init = core.initial_state();
        let attr = core.attractor_state();
        for (i, &t) in ts.iter().enumerate() {
            let decay = (-rate * t).exp();
            for d in 0..core.dim() {
                let range = init[d] - attr[d];
                xs[[i, d]] = attr[d] + range * decay;
                xds[[i, d]] = -rate * range * decay;
            }
        }
        Ok(())
    }

    fn write_fields(&self, doc: &mut Map<String, Value>) {
        doc.insert("alpha_".to_string(), json!(self.alpha));
    }
}

fn check_alpha(alpha: f64) -> MotionResult<()> {
    if !alpha.is_finite() {
        return Err(MotionError::Structural(format!(
            "alpha must be finite, got {alpha}"
        )));
    }
    Ok(())
}

impl ExponentialSystem {
    /// `alpha` is the decay constant; larger is faster.
    pub fn new(
        tau: f64,
        y_init: Array1<f64>,
        y_attr: Array1<f64>,
        alpha: f64,
    ) -> MotionResult<Self> {
        check_alpha(alpha)?;
        let core = SystemCore::new(Exponential::ORDER, tau, y_init, y_attr)?;
        Self::from_parts(core, Exponential { alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.dynamics.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> MotionResult<()> {
        check_alpha(alpha)?;
        self.dynamics.alpha = alpha;
        Ok(())
    }

    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        Self::check_header(doc)?;
        Self::new(
            f64_field(doc, "tau_")?,
            vector_field(doc, "initial_state_")?,
            vector_field(doc, "attractor_state_")?,
            f64_field(doc, "alpha_")?,
        )?
        .restore_base(doc)
    }
}
