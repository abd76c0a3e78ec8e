// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Spring-Damper System
// ─────────────────────────────────────────────────────────────────────
//! Second-order spring-damper pulled toward the attractor, rewritten as
//! a first-order system over x = [y, z] with z = τ·ẏ:
//!
//!   τ ẏ = z
//!   τ ż = (−k (y − y_attr) − c z) / m
//!
//! Critical damping: k = c² / (4m). The closed-form solution covers the
//! under-, critically and over-damped regimes, starting at rest.

use ndarray::{Array1, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use serde_json::{json, Map, Value};

use motion_types::document::{f64_field, vector_field};
use motion_types::{MotionConfig, MotionError, MotionResult};

use crate::system::{DynamicalSystem, SystemCore, SystemDynamics};

/// Stored in `spring_constant_` when k was derived from critical damping.
pub const CRITICALLY_DAMPED: f64 = -1.0;

/// Damping regime of the closed-form solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DampingRegime {
    Under,
    Critical,
    Over,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpringDamper {
    damping_coefficient: f64,
    spring_constant: f64,
    mass: f64,
    /// Set when k was derived from c and m rather than given.
    critical: bool,
    critical_tolerance: f64,
}

pub type SpringDamperSystem = DynamicalSystem<SpringDamper>;

impl SpringDamper {
    fn new(damping_coefficient: f64, spring_constant: Option<f64>, mass: f64) -> MotionResult<Self> {
        if !(damping_coefficient.is_finite() && damping_coefficient >= 0.0) {
            return Err(MotionError::Structural(format!(
                "damping coefficient must be finite and >= 0, got {damping_coefficient}"
            )));
        }
        if !(mass.is_finite() && mass > 0.0) {
            return Err(MotionError::Structural(format!(
                "mass must be finite and > 0, got {mass}"
            )));
        }
        let (spring_constant, critical) = match spring_constant {
            Some(k) if k.is_finite() && k >= 0.0 => (k, false),
            Some(k) => {
                return Err(MotionError::Structural(format!(
                    "spring constant must be finite and >= 0, got {k}"
                )))
            }
            None => (damping_coefficient * damping_coefficient / (4.0 * mass), true),
        };
        Ok(Self {
            damping_coefficient,
            spring_constant,
            mass,
            critical,
            critical_tolerance: MotionConfig::default().critical_damping_tolerance,
        })
    }

    /// ζ = c / (2 √(k m)).
    pub fn damping_ratio(&self) -> f64 {
        self.damping_coefficient / (2.0 * (self.spring_constant * self.mass).sqrt())
    }

    pub fn regime(&self) -> DampingRegime {
        let zeta = self.damping_ratio();
        if (zeta - 1.0).abs() <= self.critical_tolerance {
            DampingRegime::Critical
        } else if zeta < 1.0 {
            DampingRegime::Under
        } else {
            DampingRegime::Over
        }
    }
}

/// Closed-form u(t) = y(t) − y_attr for one dimension.
enum Response {
    Critical { omega: f64, a: f64, b: f64 },
    Under { decay: f64, omega_d: f64, a: f64, b: f64 },
    Over { r1: f64, r2: f64, c1: f64, c2: f64 },
}

impl Response {
    fn new(regime: DampingRegime, omega: f64, zeta: f64, u0: f64, v0: f64) -> Self {
        match regime {
            DampingRegime::Critical => Response::Critical {
                omega,
                a: u0,
                b: v0 + omega * u0,
            },
            DampingRegime::Under => {
                let decay = zeta * omega;
                let omega_d = omega * (1.0 - zeta * zeta).sqrt();
                Response::Under {
                    decay,
                    omega_d,
                    a: u0,
                    b: (v0 + decay * u0) / omega_d,
                }
            }
            DampingRegime::Over => {
                let spread = omega * (zeta * zeta - 1.0).sqrt();
                let r1 = -zeta * omega + spread;
                let r2 = -zeta * omega - spread;
                let c2 = (v0 - r1 * u0) / (r2 - r1);
                Response::Over {
                    r1,
                    r2,
                    c1: u0 - c2,
                    c2,
                }
            }
        }
    }

    /// (u, u̇) at time t.
    fn eval(&self, t: f64) -> (f64, f64) {
        match *self {
            Response::Critical { omega, a, b } => {
                let e = (-omega * t).exp();
                let u = (a + b * t) * e;
                (u, b * e - omega * u)
            }
            Response::Under {
                decay,
                omega_d,
                a,
                b,
            } => {
                let e = (-decay * t).exp();
                let (sin, cos) = (omega_d * t).sin_cos();
                let u = e * (a * cos + b * sin);
                let du = e * ((b * omega_d - decay * a) * cos - (a * omega_d + decay * b) * sin);
                (u, du)
            }
            Response::Over { r1, r2, c1, c2 } => {
                let e1 = (r1 * t).exp();
                let e2 = (r2 * t).exp();
                (c1 * e1 + c2 * e2, c1 * r1 * e1 + c2 * r2 * e2)
            }
        }
    }
}

impl SystemDynamics for SpringDamper {
    const NAME: &'static str = "SpringDamperSystem";
    const ORDER: usize = 2;

    fn differential_equation(
        &self,
        core: &SystemCore,
        x: ArrayView1<'_, f64>,
        mut xd: ArrayViewMut1<'_, f64>,
    ) {
        let n = core.dim_orig();
        let tau = core.tau();
        let attr = core.attractor_state();
        for d in 0..n {
            let y = x[d];
            let z = x[n + d];
            xd[d] = z / tau;
            xd[n + d] = (-self.spring_constant * (y - attr[d]) - self.damping_coefficient * z)
                / (self.mass * tau);
        }
    }

    fn analytical_solution(
        &self,
        core: &SystemCore,
        ts: ArrayView1<'_, f64>,
        mut xs: ArrayViewMut2<'_, f64>,
        mut xds: ArrayViewMut2<'_, f64>,
    ) -> MotionResult<()> {
        if self.spring_constant <= 0.0 {
            return Err(MotionError::Unsupported(format!(
                "{} closed form needs a positive spring constant, got {}",
                Self::NAME,
                self.spring_constant
            )));
        }
        let n = core.dim_orig();
        let tau = core.tau();
        let omega = (self.spring_constant / self.mass).sqrt() / tau;
        let zeta = self.damping_ratio();
        let regime = self.regime();
        if regime != DampingRegime::Critical {
            log::debug!("spring-damper: closed form in {regime:?}-damped regime (zeta = {zeta})");
        }

        for d in 0..n {
            let attr = core.attractor_state()[d];
            let response = Response::new(regime, omega, zeta, core.initial_state()[d] - attr, 0.0);
            for (i, &t) in ts.iter().enumerate() {
                let (u, du) = response.eval(t);
                let ddu = -omega * omega * u - 2.0 * zeta * omega * du;
                xs[[i, d]] = u + attr;
                xs[[i, n + d]] = tau * du;
                xds[[i, d]] = du;
                xds[[i, n + d]] = tau * ddu;
            }
        }
        Ok(())
    }

    fn configure(&mut self, config: &MotionConfig) {
        self.critical_tolerance = config.critical_damping_tolerance;
    }

    fn write_fields(&self, doc: &mut Map<String, Value>) {
        let k = if self.critical {
            CRITICALLY_DAMPED
        } else {
            self.spring_constant
        };
        doc.insert("damping_coefficient_".to_string(), json!(self.damping_coefficient));
        doc.insert("spring_constant_".to_string(), json!(k));
        doc.insert("mass_".to_string(), json!(self.mass));
    }
}

impl SpringDamperSystem {
    /// `spring_constant: None` selects critical damping, k = c² / (4m).
    pub fn new(
        tau: f64,
        y_init: Array1<f64>,
        y_attr: Array1<f64>,
        damping_coefficient: f64,
        spring_constant: Option<f64>,
        mass: f64,
    ) -> MotionResult<Self> {
        let dynamics = SpringDamper::new(damping_coefficient, spring_constant, mass)?;
        let core = SystemCore::new(SpringDamper::ORDER, tau, y_init, y_attr)?;
        Self::from_parts(core, dynamics)
    }

    /// Critically damped, unit mass.
    pub fn critically_damped(
        tau: f64,
        y_init: Array1<f64>,
        y_attr: Array1<f64>,
        damping_coefficient: f64,
    ) -> MotionResult<Self> {
        Self::new(tau, y_init, y_attr, damping_coefficient, None, 1.0)
    }

    pub fn damping_coefficient(&self) -> f64 {
        self.dynamics.damping_coefficient
    }

    pub fn spring_constant(&self) -> f64 {
        self.dynamics.spring_constant
    }

    pub fn mass(&self) -> f64 {
        self.dynamics.mass
    }

    pub fn damping_ratio(&self) -> f64 {
        self.dynamics.damping_ratio()
    }

    pub fn regime(&self) -> DampingRegime {
        self.dynamics.regime()
    }

    /// Keeps k unless it was derived from critical damping, in which case
    /// it is re-derived.
    pub fn set_damping_coefficient(&mut self, damping_coefficient: f64) -> MotionResult<()> {
        let k = (!self.dynamics.critical).then_some(self.dynamics.spring_constant);
        self.replace(SpringDamper::new(damping_coefficient, k, self.dynamics.mass)?);
        Ok(())
    }

    pub fn set_spring_constant(&mut self, spring_constant: Option<f64>) -> MotionResult<()> {
        self.replace(SpringDamper::new(
            self.dynamics.damping_coefficient,
            spring_constant,
            self.dynamics.mass,
        )?);
        Ok(())
    }

    pub fn set_mass(&mut self, mass: f64) -> MotionResult<()> {
        let k = (!self.dynamics.critical).then_some(self.dynamics.spring_constant);
        self.replace(SpringDamper::new(self.dynamics.damping_coefficient, k, mass)?);
        Ok(())
    }

    fn replace(&mut self, mut next: SpringDamper) {
        next.critical_tolerance = self.dynamics.critical_tolerance;
        self.dynamics = next;
    }

    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        Self::check_header(doc)?;
        let k = f64_field(doc, "spring_constant_")?;
        let spring_constant = (k != CRITICALLY_DAMPED).then_some(k);
        Self::new(
            f64_field(doc, "tau_")?,
            vector_field(doc, "initial_state_")?,
            vector_field(doc, "attractor_state_")?,
            f64_field(doc, "damping_coefficient_")?,
            spring_constant,
            f64_field(doc, "mass_")?,
        )?
        .restore_base(doc)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, s, Array2};

    use super::*;

    fn assert_matches_rk4(mut sys: SpringDamperSystem, t_end: f64, tol: f64) {
        let ts = Array1::linspace(0.0, t_end, 2001);
        let (xs_num, xds_num) = sys.integrate_trajectory(ts.view()).unwrap();
        let mut xs = Array2::zeros((0, 0));
        let mut xds = Array2::zeros((0, 0));
        sys.analytical_solution(ts.view(), &mut xs, &mut xds).unwrap();
        assert_eq!(xs.dim(), xs_num.dim());
        for (a, b) in xs.iter().zip(xs_num.iter()) {
            assert!((a - b).abs() < tol, "{a} vs {b}");
        }
        for (a, b) in xds.iter().zip(xds_num.iter()) {
            assert!((a - b).abs() < 10.0 * tol, "{a} vs {b}");
        }
    }

    #[test]
    fn test_critical_spring_constant() {
        let sys = SpringDamperSystem::critically_damped(1.0, array![1.0], array![0.0], 20.0).unwrap();
        assert!((sys.spring_constant() - 100.0).abs() < 1e-12);
        assert_eq!(sys.regime(), DampingRegime::Critical);
        assert_eq!(sys.dim(), 2);
    }

    #[test]
    fn test_start_is_at_rest() {
        let mut sys =
            SpringDamperSystem::critically_damped(0.5, array![1.0, 2.0], array![0.0, 0.0], 10.0).unwrap();
        let mut x = Array1::zeros(4);
        let mut xd = Array1::zeros(4);
        sys.integrate_start(None, x.view_mut(), xd.view_mut()).unwrap();
        assert_eq!(x, array![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(xd[0], 0.0);
        assert!(xd[2] < 0.0 && xd[3] < 0.0);
    }

    #[test]
    fn test_critically_damped_step_never_overshoots() {
        let mut sys = SpringDamperSystem::critically_damped(1.0, array![1.0], array![0.0], 20.0).unwrap();
        let ts = Array1::linspace(0.0, 3.0, 3001);
        let (xs, _) = sys.integrate_trajectory(ts.view()).unwrap();
        for &y in xs.slice(s![.., 0]).iter() {
            assert!(y >= -1e-12, "overshoot: {y}");
        }
        assert!(xs[[3000, 0]].abs() < 1e-6);
    }

    #[test]
    fn test_critical_analytical_matches_rk4() {
        let sys =
            SpringDamperSystem::critically_damped(1.0, array![1.0, -0.5], array![0.2, 0.3], 20.0).unwrap();
        assert_matches_rk4(sys, 1.0, 1e-6);
    }

    #[test]
    fn test_under_damped_analytical_matches_rk4() {
        let sys =
            SpringDamperSystem::new(0.8, array![1.0], array![0.0], 2.0, Some(50.0), 1.5).unwrap();
        assert_eq!(sys.regime(), DampingRegime::Under);
        assert_matches_rk4(sys, 2.0, 1e-6);
    }

    #[test]
    fn test_over_damped_analytical_matches_rk4() {
        let sys =
            SpringDamperSystem::new(1.0, array![-1.0], array![0.5], 30.0, Some(50.0), 1.0).unwrap();
        assert_eq!(sys.regime(), DampingRegime::Over);
        assert_matches_rk4(sys, 2.0, 1e-6);
    }

    #[test]
    fn test_zero_spring_constant_has_no_closed_form() {
        let sys = SpringDamperSystem::new(1.0, array![1.0], array![0.0], 1.0, Some(0.0), 1.0).unwrap();
        let mut xs = Array2::zeros((0, 0));
        let mut xds = Array2::zeros((0, 0));
        let err = sys
            .analytical_solution(array![0.0].view(), &mut xs, &mut xds)
            .unwrap_err();
        assert!(matches!(err, MotionError::Unsupported(_)));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let y = || array![1.0];
        assert!(SpringDamperSystem::new(1.0, y(), y(), 1.0, None, 0.0).is_err());
        assert!(SpringDamperSystem::new(1.0, y(), y(), -1.0, None, 1.0).is_err());
        assert!(SpringDamperSystem::new(1.0, y(), y(), 1.0, Some(-4.0), 1.0).is_err());
    }

    #[test]
    fn test_set_damping_keeps_critical() {
        let mut sys = SpringDamperSystem::critically_damped(1.0, array![1.0], array![0.0], 20.0).unwrap();
        sys.set_damping_coefficient(10.0).unwrap();
        assert!((sys.spring_constant() - 25.0).abs() < 1e-12);

        let mut sys = SpringDamperSystem::new(1.0, array![1.0], array![0.0], 20.0, Some(100.0), 1.0).unwrap();
        sys.set_damping_coefficient(10.0).unwrap();
        assert_eq!(sys.spring_constant(), 100.0);
        assert_eq!(sys.regime(), DampingRegime::Under);
    }

    #[test]
    fn test_config_tolerance_widens_critical_band() {
        let mut sys =
            SpringDamperSystem::new(1.0, array![1.0], array![0.0], 20.0, Some(100.5), 1.0).unwrap();
        assert_eq!(sys.regime(), DampingRegime::Under);
        let config = MotionConfig {
            critical_damping_tolerance: 1e-2,
            ..MotionConfig::default()
        };
        sys.apply_config(&config);
        assert_eq!(sys.regime(), DampingRegime::Critical);
    }

    #[test]
    fn test_document_round_trip() {
        let sys = SpringDamperSystem::critically_damped(0.4, array![1.0, 2.0], array![0.0, 0.5], 12.0).unwrap();
        let doc = sys.to_document();
        assert_eq!(doc["spring_constant_"], json!(CRITICALLY_DAMPED));
        assert_eq!(doc["dim_"], json!(4));
        let back = SpringDamperSystem::from_document(&doc).unwrap();
        assert_eq!(back.core(), sys.core());
        assert_eq!(back.dynamics(), sys.dynamics());

        let sys = SpringDamperSystem::new(1.0, array![1.0], array![0.0], 3.0, Some(7.0), 2.0).unwrap();
        let back = SpringDamperSystem::from_document(&sys.to_document()).unwrap();
        assert_eq!(back.spring_constant(), 7.0);
        assert_eq!(back.mass(), 2.0);
    }
}
