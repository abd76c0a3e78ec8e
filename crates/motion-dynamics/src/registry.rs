// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Dynamical System Registry
// ─────────────────────────────────────────────────────────────────────
//! Closed set of system variants, tag lookup and a type-erased handle.

use ndarray::{Array2, ArrayView1, ArrayViewMut1};
use serde_json::Value;

use motion_types::document::{check_schema_version, type_tag};
use motion_types::{IntegrationMethod, MotionConfig, MotionError, MotionResult};

use crate::exponential::ExponentialSystem;
use crate::sigmoid::SigmoidSystem;
use crate::spring_damper::SpringDamperSystem;
use crate::system::SystemCore;
use crate::time::TimeSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemKind {
    Exponential,
    Sigmoid,
    SpringDamper,
    Time,
}

impl SystemKind {
    pub const ALL: [SystemKind; 4] = [
        SystemKind::Exponential,
        SystemKind::Sigmoid,
        SystemKind::SpringDamper,
        SystemKind::Time,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SystemKind::Exponential => "ExponentialSystem",
            SystemKind::Sigmoid => "SigmoidSystem",
            SystemKind::SpringDamper => "SpringDamperSystem",
            SystemKind::Time => "TimeSystem",
        }
    }

    /// Fully qualified tag, e.g. `dynamicalsystems.TimeSystem.TimeSystem`.
    pub fn type_tag(self) -> String {
        format!("dynamicalsystems.{0}.{0}", self.name())
    }

    /// Exact match on the short or qualified name first, then substring.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| tag == k.name() || tag == k.type_tag())
            .or_else(|| Self::ALL.iter().copied().find(|k| tag.contains(k.name())))
    }
}

type Decoder = fn(&Value) -> MotionResult<AnySystem>;

fn decode_exponential(doc: &Value) -> MotionResult<AnySystem> {
    ExponentialSystem::from_document(doc).map(AnySystem::Exponential)
}

fn decode_sigmoid(doc: &Value) -> MotionResult<AnySystem> {
    SigmoidSystem::from_document(doc).map(AnySystem::Sigmoid)
}

fn decode_spring_damper(doc: &Value) -> MotionResult<AnySystem> {
    SpringDamperSystem::from_document(doc).map(AnySystem::SpringDamper)
}

fn decode_time(doc: &Value) -> MotionResult<AnySystem> {
    TimeSystem::from_document(doc).map(AnySystem::Time)
}

fn decoder(kind: SystemKind) -> Decoder {
    match kind {
        SystemKind::Exponential => decode_exponential,
        SystemKind::Sigmoid => decode_sigmoid,
        SystemKind::SpringDamper => decode_spring_damper,
        SystemKind::Time => decode_time,
    }
}

/// Any registered dynamical system.
#[derive(Debug, Clone)]
pub enum AnySystem {
    Exponential(ExponentialSystem),
    Sigmoid(SigmoidSystem),
    SpringDamper(SpringDamperSystem),
    Time(TimeSystem),
}

macro_rules! dispatch {
    ($self:expr, $sys:ident => $body:expr) => {
        match $self {
            AnySystem::Exponential($sys) => $body,
            AnySystem::Sigmoid($sys) => $body,
            AnySystem::SpringDamper($sys) => $body,
            AnySystem::Time($sys) => $body,
        }
    };
}

impl AnySystem {
    /// Decode a persisted system, choosing the variant by its tag.
    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        check_schema_version(doc)?;
        let tag = type_tag(doc)?;
        let Some(kind) = SystemKind::from_tag(tag) else {
            log::warn!("no dynamical system registered for tag {tag:?}");
            return Err(MotionError::UnknownVariant(tag.to_string()));
        };
        decoder(kind)(doc)
    }

    pub fn from_json(json: &str) -> MotionResult<Self> {
        let doc: Value = serde_json::from_str(json)
            .map_err(|e| MotionError::malformed("<document>", e.to_string()))?;
        Self::from_document(&doc)
    }

    pub fn kind(&self) -> SystemKind {
        match self {
            AnySystem::Exponential(_) => SystemKind::Exponential,
            AnySystem::Sigmoid(_) => SystemKind::Sigmoid,
            AnySystem::SpringDamper(_) => SystemKind::SpringDamper,
            AnySystem::Time(_) => SystemKind::Time,
        }
    }

    pub fn to_document(&self) -> Value {
        dispatch!(self, s => s.to_document())
    }

    pub fn core(&self) -> &SystemCore {
        dispatch!(self, s => s.core())
    }

    pub fn dim(&self) -> usize {
        self.core().dim()
    }

    pub fn differential_equation(
        &self,
        x: ArrayView1<'_, f64>,
        xd: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        dispatch!(self, s => s.differential_equation(x, xd))
    }

    pub fn integrate_start(
        &mut self,
        x_init: Option<ArrayView1<'_, f64>>,
        x: ArrayViewMut1<'_, f64>,
        xd: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        dispatch!(self, s => s.integrate_start(x_init, x, xd))
    }

    pub fn integrate_step(
        &mut self,
        dt: f64,
        x: ArrayView1<'_, f64>,
        x_updated: ArrayViewMut1<'_, f64>,
        xd_updated: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        dispatch!(self, s => s.integrate_step(dt, x, x_updated, xd_updated))
    }

    pub fn analytical_solution(
        &self,
        ts: ArrayView1<'_, f64>,
        xs: &mut Array2<f64>,
        xds: &mut Array2<f64>,
    ) -> MotionResult<()> {
        dispatch!(self, s => s.analytical_solution(ts, xs, xds))
    }

    pub fn integrate_trajectory(
        &mut self,
        ts: ArrayView1<'_, f64>,
    ) -> MotionResult<(Array2<f64>, Array2<f64>)> {
        dispatch!(self, s => s.integrate_trajectory(ts))
    }

    pub fn set_integration_method(&mut self, method: IntegrationMethod) {
        dispatch!(self, s => s.set_integration_method(method))
    }

    pub fn apply_config(&mut self, config: &MotionConfig) {
        dispatch!(self, s => s.apply_config(config))
    }
}

impl From<ExponentialSystem> for AnySystem {
    fn from(s: ExponentialSystem) -> Self {
        AnySystem::Exponential(s)
    }
}

impl From<SigmoidSystem> for AnySystem {
    fn from(s: SigmoidSystem) -> Self {
        AnySystem::Sigmoid(s)
    }
}

impl From<SpringDamperSystem> for AnySystem {
    fn from(s: SpringDamperSystem) -> Self {
        AnySystem::SpringDamper(s)
    }
}

impl From<TimeSystem> for AnySystem {
    fn from(s: TimeSystem) -> Self {
        AnySystem::Time(s)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use serde_json::json;

    use super::*;

    fn all_systems() -> Vec<AnySystem> {
        vec![
            ExponentialSystem::new(0.5, array![1.0, 2.0], array![0.0, 0.0], 6.0)
                .unwrap()
                .into(),
            SigmoidSystem::new(1.0, array![0.1], 10.0, 0.5).unwrap().into(),
            SpringDamperSystem::critically_damped(1.0, array![1.0], array![0.0], 20.0)
                .unwrap()
                .into(),
            TimeSystem::new(2.0, true).unwrap().into(),
        ]
    }

    #[test]
    fn test_tag_lookup() {
        assert_eq!(
            SystemKind::from_tag("dynamicalsystems.TimeSystem.TimeSystem"),
            Some(SystemKind::Time)
        );
        assert_eq!(
            SystemKind::from_tag("SpringDamperSystem"),
            Some(SystemKind::SpringDamper)
        );
        assert_eq!(
            SystemKind::from_tag("legacy.pkg.SigmoidSystem"),
            Some(SystemKind::Sigmoid)
        );
        assert_eq!(SystemKind::from_tag("dynamicalsystems.Foo.Foo"), None);
    }

    #[test]
    fn test_round_trip_all_variants() {
        for sys in all_systems() {
            let doc = sys.to_document();
            let back = AnySystem::from_document(&doc).unwrap();
            assert_eq!(back.kind(), sys.kind());
            assert_eq!(back.core(), sys.core());
            assert_eq!(back.to_document(), doc);
        }
    }

    #[test]
    fn test_round_trip_through_json_text() {
        for sys in all_systems() {
            let text = serde_json::to_string(&sys.to_document()).unwrap();
            let back = AnySystem::from_json(&text).unwrap();
            assert_eq!(back.core(), sys.core());
        }
    }

    #[test]
    fn test_unknown_tag() {
        let doc = json!({"py/object": "dynamicalsystems.Foo.Foo", "tau_": 1.0});
        assert_eq!(
            AnySystem::from_document(&doc).unwrap_err(),
            MotionError::UnknownVariant("dynamicalsystems.Foo.Foo".into())
        );
    }

    #[test]
    fn test_missing_tag() {
        let doc = json!({"tau_": 1.0});
        assert!(matches!(
            AnySystem::from_document(&doc).unwrap_err(),
            MotionError::MissingField(_)
        ));
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut doc = all_systems()[0].to_document();
        doc["schema_version"] = json!(99);
        assert!(matches!(
            AnySystem::from_document(&doc).unwrap_err(),
            MotionError::SchemaVersion { found: 99, .. }
        ));
    }

    #[test]
    fn test_missing_integration_method_defaults_to_runge_kutta() {
        let mut doc = all_systems()[0].to_document();
        doc.as_object_mut().unwrap().remove("integration_method_");
        let sys = AnySystem::from_document(&doc).unwrap();
        assert_eq!(sys.core().integration_method(), IntegrationMethod::RungeKutta);
    }

    #[test]
    fn test_legacy_document_without_schema_version() {
        let doc = json!({
            "py/object": "dynamicalsystems.ExponentialSystem.ExponentialSystem",
            "tau_": 1.0,
            "initial_state_": {"values": [[1.0], [2.0]]},
            "attractor_state_": {"values": [0.0, 0.0]},
            "alpha_": 3.0,
            "integration_method_": "EULER",
            "dim_": 2,
            "dim_orig_": 2
        });
        let sys = AnySystem::from_document(&doc).unwrap();
        assert_eq!(sys.kind(), SystemKind::Exponential);
        assert_eq!(sys.core().initial_state(), &array![1.0, 2.0]);
        assert_eq!(sys.core().integration_method(), IntegrationMethod::Euler);
    }

    #[test]
    fn test_inconsistent_dims_rejected() {
        let mut doc = all_systems()[2].to_document();
        doc["dim_"] = json!(3);
        assert!(AnySystem::from_document(&doc).unwrap_err().is_structural());
    }

    #[test]
    fn test_dispatch_steps_each_variant() {
        for mut sys in all_systems() {
            let dim = sys.dim();
            let mut x = ndarray::Array1::zeros(dim);
            let mut xd = ndarray::Array1::zeros(dim);
            let mut x_next = ndarray::Array1::zeros(dim);
            sys.integrate_start(None, x.view_mut(), xd.view_mut()).unwrap();
            sys.integrate_step(0.01, x.view(), x_next.view_mut(), xd.view_mut())
                .unwrap();
            assert!(x_next.iter().all(|v| v.is_finite()));
        }
    }
}
