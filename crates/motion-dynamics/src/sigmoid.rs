// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Sigmoid System
// ─────────────────────────────────────────────────────────────────────
//! Logistic growth (r > 0) or decay (r < 0) with per-dimension carrying
//! capacity K:
//!
//!   ẋ = r x (1 − x / K) / τ
//!   K = x_0 · (1 + exp(r · ρ))
//!
//! where ρ is the inflection ratio. Closed form with b = K / x_0 − 1:
//!
//!   x(t) = K / (1 + b · exp(−r t / τ))

use ndarray::{Array1, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use serde_json::{json, Map, Value};

use motion_types::document::{f64_field, vector_field};
use motion_types::{MotionError, MotionResult};

use crate::system::{DynamicalSystem, SystemCore, SystemDynamics};

/// Relative headroom below which K is reported as too close to x_0.
const MIN_RELATIVE_HEADROOM: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct Sigmoid {
    max_rate: f64,
    inflection_ratio: f64,
    capacities: Array1<f64>,
}

pub type SigmoidSystem = DynamicalSystem<Sigmoid>;

impl Sigmoid {
    fn new(max_rate: f64, inflection_ratio: f64, x_init: &Array1<f64>) -> MotionResult<Self> {
        for (name, v) in [("max_rate", max_rate), ("inflection_ratio", inflection_ratio)] {
            if !v.is_finite() {
                return Err(MotionError::Structural(format!(
                    "{name} must be finite, got {v}"
                )));
            }
        }
        let mut sigmoid = Self {
            max_rate,
            inflection_ratio,
            capacities: Array1::zeros(x_init.len()),
        };
        sigmoid.capacities = sigmoid.carrying_capacities(x_init)?;
        Ok(sigmoid)
    }

    fn carrying_capacities(&self, x_init: &Array1<f64>) -> MotionResult<Array1<f64>> {
        let factor = 1.0 + (self.max_rate * self.inflection_ratio).exp();
        let mut ks = Array1::zeros(x_init.len());
        for (d, (&x0, k)) in x_init.iter().zip(ks.iter_mut()).enumerate() {
            if x0 == 0.0 || !x0.is_finite() {
                return Err(MotionError::Structural(format!(
                    "sigmoid initial state must be finite and non-zero, got {x0} at {d}"
                )));
            }
            *k = x0 * factor;
            if !k.is_finite() {
                return Err(MotionError::Structural(format!(
                    "carrying capacity overflows for max_rate {} and inflection_ratio {}",
                    self.max_rate, self.inflection_ratio
                )));
            }
            if ((*k - x0) / x0).abs() < MIN_RELATIVE_HEADROOM {
                log::warn!(
                    "sigmoid: carrying capacity {k} too close to initial state {x0} at {d}; \
                     the curve will be nearly flat"
                );
            }
        }
        Ok(ks)
    }

    /// Where the trajectory settles: 0 for decay, K for growth.
    fn limit(&self, x_init: &Array1<f64>) -> Array1<f64> {
        if self.max_rate > 0.0 {
            self.capacities.clone()
        } else if self.max_rate < 0.0 {
            Array1::zeros(self.capacities.len())
        } else {
            x_init.clone()
        }
    }

    fn refresh(&mut self, core: &mut SystemCore) -> MotionResult<()> {
        self.capacities = self.carrying_capacities(core.initial_state())?;
        core.set_attractor_state(self.limit(core.initial_state()))
    }
}

impl SystemDynamics for Sigmoid {
    const NAME: &'static str = "SigmoidSystem";
    const ORDER: usize = 1;
    const DERIVED_ATTRACTOR: bool = true;

    fn differential_equation(
        &self,
        core: &SystemCore,
        x: ArrayView1<'_, f64>,
        mut xd: ArrayViewMut1<'_, f64>,
    ) {
        let scale = self.max_rate / core.tau();
        for d in 0..x.len() {
            xd[d] = scale * x[d] * (1.0 - x[d] / self.capacities[d]);
        }
    }

    fn analytical_solution(
        &self,
        core: &SystemCore,
        ts: ArrayView1<'_, f64>,
        mut xs: ArrayViewMut2<'_, f64>,
        mut xds: ArrayViewMut2<'_, f64>,
    ) -> MotionResult<()> {
        let tau = core.tau();
        let r = self.max_rate;
        let init = core.initial_state();
        for (i, &t) in ts.iter().enumerate() {
            let e = (-r * t / tau).exp();
            for d in 0..core.dim() {
                let k = self.capacities[d];
                let b = k / init[d] - 1.0;
                let denom = 1.0 + b * e;
                xs[[i, d]] = k / denom;
                xds[[i, d]] = k * r * b * e / (denom * denom * tau);
            }
        }
        Ok(())
    }

    fn state_changed(&mut self, core: &mut SystemCore) -> MotionResult<()> {
        self.refresh(core)
    }

    fn write_fields(&self, doc: &mut Map<String, Value>) {
        doc.insert("max_rate_".to_string(), json!(self.max_rate));
        doc.insert("inflection_ratio_".to_string(), json!(self.inflection_ratio));
    }
}

impl SigmoidSystem {
    /// The attractor is derived from the growth direction and is not an
    /// argument.
    pub fn new(
        tau: f64,
        x_init: Array1<f64>,
        max_rate: f64,
        inflection_ratio: f64,
    ) -> MotionResult<Self> {
        let sigmoid = Sigmoid::new(max_rate, inflection_ratio, &x_init)?;
        let attractor = sigmoid.limit(&x_init);
        let core = SystemCore::new(Sigmoid::ORDER, tau, x_init, attractor)?;
        Self::from_parts(core, sigmoid)
    }

    pub fn max_rate(&self) -> f64 {
        self.dynamics.max_rate
    }

    pub fn inflection_ratio(&self) -> f64 {
        self.dynamics.inflection_ratio
    }

    /// Per-dimension carrying capacity K.
    pub fn carrying_capacities(&self) -> &Array1<f64> {
        &self.dynamics.capacities
    }

    pub fn set_max_rate(&mut self, max_rate: f64) -> MotionResult<()> {
        let mut next = Sigmoid::new(
            max_rate,
            self.dynamics.inflection_ratio,
            self.core.initial_state(),
        )?;
        next.refresh(&mut self.core)?;
        self.dynamics = next;
        Ok(())
    }

    pub fn set_inflection_ratio(&mut self, inflection_ratio: f64) -> MotionResult<()> {
        let mut next = Sigmoid::new(
            self.dynamics.max_rate,
            inflection_ratio,
            self.core.initial_state(),
        )?;
        next.refresh(&mut self.core)?;
        self.dynamics = next;
        Ok(())
    }

    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        Self::check_header(doc)?;
        Self::new(
            f64_field(doc, "tau_")?,
            vector_field(doc, "initial_state_")?,
            f64_field(doc, "max_rate_")?,
            f64_field(doc, "inflection_ratio_")?,
        )?
        .restore_base(doc)
    }
}
