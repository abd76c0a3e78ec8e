// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Dynamical System Core
// ─────────────────────────────────────────────────────────────────────
//! Shared state, the `SystemDynamics` trait and the generic
//! `DynamicalSystem<D>` wrapper that owns integration scratch.
//!
//! State layout: first-order systems use `x = y` (length `dim_orig`);
//! second-order systems are rewritten as `x = [y, z]` with `z` the
//! tau-scaled velocity, so `dim = order * dim_orig`.
//!
//! Integration:
//!   Euler:  x' = x + dt·f(x)
//!   RK4:    x' = x + dt·(k1 + 2k2 + 2k3 + k4)/6
//!
//! Pre-allocated scratch arrays for zero-alloc hot-path execution.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2, Zip};
use serde_json::{json, Map, Value};

use motion_types::document::{
    check_schema_version, optional_field, optional_type_tag, str_field, tag_document,
    usize_field, vector_document,
};
use motion_types::{IntegrationMethod, MotionConfig, MotionError, MotionResult};

/// Parameters every dynamical system carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemCore {
    order: usize,
    dim: usize,
    dim_orig: usize,
    tau: f64,
    initial_state: Array1<f64>,
    attractor_state: Array1<f64>,
    integration_method: IntegrationMethod,
}

impl SystemCore {
    pub fn new(
        order: usize,
        tau: f64,
        initial_state: Array1<f64>,
        attractor_state: Array1<f64>,
    ) -> MotionResult<Self> {
        if order != 1 && order != 2 {
            return Err(MotionError::Structural(format!(
                "order must be 1 or 2, got {order}"
            )));
        }
        if initial_state.is_empty() {
            return Err(MotionError::Structural(
                "initial state must not be empty".to_string(),
            ));
        }
        if initial_state.len() != attractor_state.len() {
            return Err(MotionError::Structural(format!(
                "initial state has length {}, attractor state has length {}",
                initial_state.len(),
                attractor_state.len()
            )));
        }
        check_tau(tau)?;
        let dim_orig = initial_state.len();
        Ok(Self {
            order,
            dim: order * dim_orig,
            dim_orig,
            tau,
            initial_state,
            attractor_state,
            integration_method: IntegrationMethod::default(),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Length of the full state vector `x`.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Dimensionality of the physical quantity (before the order rewrite).
    pub fn dim_orig(&self) -> usize {
        self.dim_orig
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn initial_state(&self) -> &Array1<f64> {
        &self.initial_state
    }

    pub fn attractor_state(&self) -> &Array1<f64> {
        &self.attractor_state
    }

    pub fn integration_method(&self) -> IntegrationMethod {
        self.integration_method
    }

    pub(crate) fn set_tau(&mut self, tau: f64) -> MotionResult<()> {
        check_tau(tau)?;
        self.tau = tau;
        Ok(())
    }

    pub(crate) fn set_initial_state(&mut self, state: Array1<f64>) -> MotionResult<()> {
        self.check_orig_len("initial state", state.len())?;
        self.initial_state = state;
        Ok(())
    }

    pub(crate) fn set_attractor_state(&mut self, state: Array1<f64>) -> MotionResult<()> {
        self.check_orig_len("attractor state", state.len())?;
        self.attractor_state = state;
        Ok(())
    }

    fn check_orig_len(&self, what: &str, len: usize) -> MotionResult<()> {
        if len != self.dim_orig {
            return Err(MotionError::Structural(format!(
                "{what} has length {len}, expected {}",
                self.dim_orig
            )));
        }
        Ok(())
    }
}

fn check_tau(tau: f64) -> MotionResult<()> {
    if !(tau.is_finite() && tau > 0.0) {
        return Err(MotionError::Structural(format!(
            "tau must be finite and > 0, got {tau}"
        )));
    }
    Ok(())
}

/// The equations of one concrete system.
///
/// Implementors supply the rate of change; the closed-form solution is
/// optional and reports `Unsupported` unless overridden.
pub trait SystemDynamics: Clone {
    /// Short discriminator name, e.g. `ExponentialSystem`.
    const NAME: &'static str;

    /// 1 for `x = y`, 2 for `x = [y, z]`.
    const ORDER: usize;

    /// The attractor is computed by `state_changed` and cannot be set.
    const DERIVED_ATTRACTOR: bool = false;

    /// Write `f(x)` into `xd`. Both have length `core.dim()`.
    ///
    /// Called on the real-time path: must not allocate.
    fn differential_equation(
        &self,
        core: &SystemCore,
        x: ArrayView1<'_, f64>,
        xd: ArrayViewMut1<'_, f64>,
    );

    /// Closed-form trajectory at each time in `ts`, written time-major
    /// (`xs`, `xds` are `T × dim`).
    fn analytical_solution(
        &self,
        core: &SystemCore,
        ts: ArrayView1<'_, f64>,
        xs: ArrayViewMut2<'_, f64>,
        xds: ArrayViewMut2<'_, f64>,
    ) -> MotionResult<()> {
        let _ = (core, ts, xs, xds);
        Err(MotionError::Unsupported(format!(
            "{} has no closed-form solution",
            Self::NAME
        )))
    }

    /// Re-derive cached quantities after tau or the initial state changed.
    fn state_changed(&mut self, core: &mut SystemCore) -> MotionResult<()> {
        let _ = core;
        Ok(())
    }

    /// Pick up evaluation settings from a runtime config.
    fn configure(&mut self, config: &MotionConfig) {
        let _ = config;
    }

    /// Append the variant-specific fields to a persisted document.
    fn write_fields(&self, doc: &mut Map<String, Value>);
}

/// RK4 stage buffers, sized to `dim` once.
#[derive(Debug, Clone)]
struct StepScratch {
    k1: Array1<f64>,
    k2: Array1<f64>,
    k3: Array1<f64>,
    k4: Array1<f64>,
    stage: Array1<f64>,
}

impl StepScratch {
    fn new(dim: usize) -> Self {
        Self {
            k1: Array1::zeros(dim),
            k2: Array1::zeros(dim),
            k3: Array1::zeros(dim),
            k4: Array1::zeros(dim),
            stage: Array1::zeros(dim),
        }
    }
}

/// A dynamical system: shared core, concrete equations, step scratch.
///
/// The object is a policy, not a trajectory holder: state vectors are
/// passed in by the caller on every call. Hot-path methods take
/// `&mut self` because they write the internal scratch; results never
/// depend on what the scratch held before.
#[derive(Debug, Clone)]
pub struct DynamicalSystem<D> {
    pub(crate) core: SystemCore,
    pub(crate) dynamics: D,
    scratch: StepScratch,
}

impl<D: SystemDynamics> DynamicalSystem<D> {
    pub fn from_parts(mut core: SystemCore, mut dynamics: D) -> MotionResult<Self> {
        if core.order() != D::ORDER {
            return Err(MotionError::Structural(format!(
                "{} is order {}, core was built with order {}",
                D::NAME,
                D::ORDER,
                core.order()
            )));
        }
        dynamics.state_changed(&mut core)?;
        let scratch = StepScratch::new(core.dim());
        Ok(Self {
            core,
            dynamics,
            scratch,
        })
    }

    /// Fully qualified discriminator written into documents.
    pub fn type_tag() -> String {
        format!("dynamicalsystems.{0}.{0}", D::NAME)
    }

    pub fn name(&self) -> &'static str {
        D::NAME
    }

    pub fn core(&self) -> &SystemCore {
        &self.core
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn dim(&self) -> usize {
        self.core.dim()
    }

    pub fn dim_orig(&self) -> usize {
        self.core.dim_orig()
    }

    pub fn tau(&self) -> f64 {
        self.core.tau()
    }

    pub fn initial_state(&self) -> &Array1<f64> {
        self.core.initial_state()
    }

    pub fn attractor_state(&self) -> &Array1<f64> {
        self.core.attractor_state()
    }

    pub fn integration_method(&self) -> IntegrationMethod {
        self.core.integration_method()
    }

    pub fn set_tau(&mut self, tau: f64) -> MotionResult<()> {
        self.update_core(|core| core.set_tau(tau))
    }

    pub fn set_initial_state(&mut self, state: Array1<f64>) -> MotionResult<()> {
        self.update_core(|core| core.set_initial_state(state))
    }

    pub fn set_attractor_state(&mut self, state: Array1<f64>) -> MotionResult<()> {
        if D::DERIVED_ATTRACTOR {
            return Err(MotionError::Unsupported(format!(
                "{} derives its attractor state",
                D::NAME
            )));
        }
        self.core.set_attractor_state(state)
    }

    /// Edit copies of the core and dynamics; both are kept only when the
    /// edit and the re-derivation succeed.
    fn update_core(
        &mut self,
        edit: impl FnOnce(&mut SystemCore) -> MotionResult<()>,
    ) -> MotionResult<()> {
        let mut core = self.core.clone();
        let mut dynamics = self.dynamics.clone();
        edit(&mut core)?;
        dynamics.state_changed(&mut core)?;
        self.core = core;
        self.dynamics = dynamics;
        Ok(())
    }

    pub fn set_integration_method(&mut self, method: IntegrationMethod) {
        self.core.integration_method = method;
    }

    pub fn apply_config(&mut self, config: &MotionConfig) {
        self.set_integration_method(config.integration_method);
        self.dynamics.configure(config);
    }

    fn check_len(&self, what: &str, len: usize) -> MotionResult<()> {
        if len != self.core.dim() {
            return Err(MotionError::Structural(format!(
                "{what} has length {len}, expected dim = {}",
                self.core.dim()
            )));
        }
        Ok(())
    }

    /// Rate of change at `x`, written into `xd`.
    pub fn differential_equation(
        &self,
        x: ArrayView1<'_, f64>,
        xd: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        self.check_len("x", x.len())?;
        self.check_len("xd", xd.len())?;
        self.dynamics.differential_equation(&self.core, x, xd);
        Ok(())
    }

    /// Write the initial state into `x` and its rate of change into `xd`.
    ///
    /// If `x_init` is given it replaces the stored initial state first.
    /// Only the position part is externally specified, so for second-order
    /// systems the velocity half of `x` is zero.
    pub fn integrate_start(
        &mut self,
        x_init: Option<ArrayView1<'_, f64>>,
        mut x: ArrayViewMut1<'_, f64>,
        xd: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        self.check_len("x", x.len())?;
        self.check_len("xd", xd.len())?;
        if let Some(init) = x_init {
            self.set_initial_state(init.to_owned())?;
        }

        x.fill(0.0);
        x.slice_mut(s![..self.core.dim_orig()])
            .assign(self.core.initial_state());
        self.dynamics.differential_equation(&self.core, x.view(), xd);
        Ok(())
    }

    /// Advance `x` by `dt` with the configured method.
    ///
    /// Writes the new state into `x_updated` and the rate of change at the
    /// new state into `xd_updated`. Allocation-free.
    pub fn integrate_step(
        &mut self,
        dt: f64,
        x: ArrayView1<'_, f64>,
        x_updated: ArrayViewMut1<'_, f64>,
        xd_updated: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(MotionError::Structural(format!(
                "dt must be finite and > 0, got {dt}"
            )));
        }
        self.check_len("x", x.len())?;
        self.check_len("x_updated", x_updated.len())?;
        self.check_len("xd_updated", xd_updated.len())?;

        match self.core.integration_method() {
            IntegrationMethod::Euler => self.step_euler(dt, x, x_updated, xd_updated),
            IntegrationMethod::RungeKutta => self.step_runge_kutta(dt, x, x_updated, xd_updated),
        }
        Ok(())
    }

    fn step_euler(
        &self,
        dt: f64,
        x: ArrayView1<'_, f64>,
        mut x_updated: ArrayViewMut1<'_, f64>,
        mut xd_updated: ArrayViewMut1<'_, f64>,
    ) {
        self.dynamics
            .differential_equation(&self.core, x, xd_updated.view_mut());
        Zip::from(&mut x_updated)
            .and(&x)
            .and(&xd_updated)
            .for_each(|xu, &xi, &di| *xu = xi + dt * di);
    }

    fn step_runge_kutta(
        &mut self,
        dt: f64,
        x: ArrayView1<'_, f64>,
        mut x_updated: ArrayViewMut1<'_, f64>,
        xd_updated: ArrayViewMut1<'_, f64>,
    ) {
        let core = &self.core;
        let dynamics = &self.dynamics;
        let StepScratch {
            k1,
            k2,
            k3,
            k4,
            stage,
        } = &mut self.scratch;

        dynamics.differential_equation(core, x, k1.view_mut());

        Zip::from(&mut *stage)
            .and(&x)
            .and(&*k1)
            .for_each(|st, &xi, &k| *st = xi + 0.5 * dt * k);
        dynamics.differential_equation(core, stage.view(), k2.view_mut());

        Zip::from(&mut *stage)
            .and(&x)
            .and(&*k2)
            .for_each(|st, &xi, &k| *st = xi + 0.5 * dt * k);
        dynamics.differential_equation(core, stage.view(), k3.view_mut());

        Zip::from(&mut *stage)
            .and(&x)
            .and(&*k3)
            .for_each(|st, &xi, &k| *st = xi + dt * k);
        dynamics.differential_equation(core, stage.view(), k4.view_mut());

        Zip::from(&mut x_updated)
            .and(&x)
            .and(&*k1)
            .and(&*k2)
            .and(&*k3)
            .and(&*k4)
            .for_each(|xu, &xi, &a, &b, &c, &d| {
                *xu = xi + dt * (a + 2.0 * (b + c) + d) / 6.0;
            });
        dynamics.differential_equation(core, x_updated.view(), xd_updated);
    }

    /// Closed-form trajectory and rate of change at each time in `ts`.
    ///
    /// `xs`/`xds` are resized to `T × dim`, unless `xs` arrives shaped
    /// `dim × T`, in which case both are returned in that orientation.
    /// A square `xs` counts as `dim × T`. Allocates; not for the control
    /// loop.
    pub fn analytical_solution(
        &self,
        ts: ArrayView1<'_, f64>,
        xs: &mut Array2<f64>,
        xds: &mut Array2<f64>,
    ) -> MotionResult<()> {
        let n_t = ts.len();
        if n_t == 0 {
            return Err(MotionError::Structural(
                "analytical solution needs at least one time".to_string(),
            ));
        }
        let dim = self.core.dim();
        let dim_major = xs.dim() == (dim, n_t);

        let mut xs_tm = Array2::zeros((n_t, dim));
        let mut xds_tm = Array2::zeros((n_t, dim));
        self.dynamics
            .analytical_solution(&self.core, ts, xs_tm.view_mut(), xds_tm.view_mut())?;

        if dim_major {
            *xs = xs_tm.reversed_axes().as_standard_layout().into_owned();
            *xds = xds_tm.reversed_axes().as_standard_layout().into_owned();
        } else {
            *xs = xs_tm;
            *xds = xds_tm;
        }
        Ok(())
    }

    /// Numerically integrate from the initial state over the times in `ts`.
    ///
    /// Returns time-major `(xs, xds)`; row 0 is the start state. Step sizes
    /// are the differences of consecutive times. Allocates.
    pub fn integrate_trajectory(
        &mut self,
        ts: ArrayView1<'_, f64>,
    ) -> MotionResult<(Array2<f64>, Array2<f64>)> {
        let n_t = ts.len();
        if n_t == 0 {
            return Err(MotionError::Structural(
                "trajectory needs at least one time".to_string(),
            ));
        }
        let dim = self.core.dim();
        let mut xs = Array2::zeros((n_t, dim));
        let mut xds = Array2::zeros((n_t, dim));

        let mut x = Array1::zeros(dim);
        let mut x_next = Array1::zeros(dim);
        let mut xd = Array1::zeros(dim);
        self.integrate_start(None, x.view_mut(), xd.view_mut())?;
        xs.row_mut(0).assign(&x);
        xds.row_mut(0).assign(&xd);

        for i in 1..n_t {
            let dt = ts[i] - ts[i - 1];
            self.integrate_step(dt, x.view(), x_next.view_mut(), xd.view_mut())?;
            std::mem::swap(&mut x, &mut x_next);
            xs.row_mut(i).assign(&x);
            xds.row_mut(i).assign(&xd);
        }
        Ok((xs, xds))
    }

    /// Persisted form: base fields, variant fields, discriminator.
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        map.insert("dim_".to_string(), json!(self.core.dim()));
        map.insert("dim_orig_".to_string(), json!(self.core.dim_orig()));
        map.insert("tau_".to_string(), json!(self.core.tau()));
        map.insert(
            "initial_state_".to_string(),
            vector_document(self.core.initial_state().view()),
        );
        map.insert(
            "attractor_state_".to_string(),
            vector_document(self.core.attractor_state().view()),
        );
        map.insert(
            "integration_method_".to_string(),
            json!(self.core.integration_method().as_str()),
        );
        self.dynamics.write_fields(&mut map);
        tag_document(&mut map, &Self::type_tag());
        Value::Object(map)
    }

    /// Check the schema version and, when present, that the tag names `D`.
    pub(crate) fn check_header(doc: &Value) -> MotionResult<()> {
        check_schema_version(doc)?;
        if let Some(tag) = optional_type_tag(doc)? {
            if !tag.contains(D::NAME) {
                return Err(MotionError::UnknownVariant(format!(
                    "{tag} (expected {})",
                    D::NAME
                )));
            }
        }
        Ok(())
    }

    /// Apply the base fields a variant constructor does not consume:
    /// integration method and the stored dimensions (checked, not trusted).
    pub(crate) fn restore_base(mut self, doc: &Value) -> MotionResult<Self> {
        if optional_field(doc, "dim_").is_some() {
            let dim = usize_field(doc, "dim_")?;
            if dim != self.core.dim() {
                return Err(MotionError::Structural(format!(
                    "document dim_ = {dim}, but order {} × dim_orig {} = {}",
                    self.core.order(),
                    self.core.dim_orig(),
                    self.core.dim()
                )));
            }
        }
        if optional_field(doc, "dim_orig_").is_some() {
            let dim_orig = usize_field(doc, "dim_orig_")?;
            if dim_orig != self.core.dim_orig() {
                return Err(MotionError::Structural(format!(
                    "document dim_orig_ = {dim_orig}, but the state vectors have length {}",
                    self.core.dim_orig()
                )));
            }
        }
        match optional_field(doc, "integration_method_") {
            Some(_) => {
                let method: IntegrationMethod = str_field(doc, "integration_method_")?.parse()?;
                self.set_integration_method(method);
            }
            None => log::debug!(
                "{}: document has no integration_method_, keeping {}",
                D::NAME,
                self.core.integration_method()
            ),
        }
        Ok(self)
    }
}
