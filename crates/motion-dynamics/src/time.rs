// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Time System
// ─────────────────────────────────────────────────────────────────────
//! Phase variable running linearly from 0 to 1 in τ seconds (or from 1
//! down to 0 when counting down), then holding.

use ndarray::{array, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use serde_json::{json, Map, Value};

use motion_types::document::{bool_field, f64_field, optional_field, vector_field};
use motion_types::MotionResult;

use crate::system::{DynamicalSystem, SystemCore, SystemDynamics};

#[derive(Debug, Clone, PartialEq)]
pub struct Time {
    count_down: bool,
}

pub type TimeSystem = DynamicalSystem<Time>;

impl SystemDynamics for Time {
    const NAME: &'static str = "TimeSystem";
    const ORDER: usize = 1;

    fn differential_equation(
        &self,
        core: &SystemCore,
        x: ArrayView1<'_, f64>,
        mut xd: ArrayViewMut1<'_, f64>,
    ) {
        let rate = 1.0 / core.tau();
        xd[0] = if self.count_down {
            if x[0] > 0.0 {
                -rate
            } else {
                0.0
            }
        } else if x[0] < 1.0 {
            rate
        } else {
            0.0
        };
    }

    fn analytical_solution(
        &self,
        core: &SystemCore,
        ts: ArrayView1<'_, f64>,
        mut xs: ArrayViewMut2<'_, f64>,
        mut xds: ArrayViewMut2<'_, f64>,
    ) -> MotionResult<()> {
        let rate = 1.0 / core.tau();
        let x0 = core.initial_state()[0];
        for (i, &t) in ts.iter().enumerate() {
            let (x, xd) = if self.count_down {
                let x = x0 - rate * t;
                if x > 0.0 {
                    (x, -rate)
                } else {
                    (0.0, 0.0)
                }
            } else {
                let x = x0 + rate * t;
                if x < 1.0 {
                    (x, rate)
                } else {
                    (1.0, 0.0)
                }
            };
            xs[[i, 0]] = x;
            xds[[i, 0]] = xd;
        }
        Ok(())
    }

    fn write_fields(&self, doc: &mut Map<String, Value>) {
        doc.insert("count_down_".to_string(), json!(self.count_down));
    }
}

impl TimeSystem {
    pub fn new(tau: f64, count_down: bool) -> MotionResult<Self> {
        let (init, attr) = if count_down {
            (array![1.0], array![0.0])
        } else {
            (array![0.0], array![1.0])
        };
        let core = SystemCore::new(Time::ORDER, tau, init, attr)?;
        Self::from_parts(core, Time { count_down })
    }

    pub fn count_down(&self) -> bool {
        self.dynamics.count_down
    }

    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        Self::check_header(doc)?;
        let mut sys = Self::new(f64_field(doc, "tau_")?, bool_field(doc, "count_down_")?)?;
        if optional_field(doc, "initial_state_").is_some() {
            sys.set_initial_state(vector_field(doc, "initial_state_")?)?;
        }
        if optional_field(doc, "attractor_state_").is_some() {
            sys.set_attractor_state(vector_field(doc, "attractor_state_")?)?;
        }
        sys.restore_base(doc)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2};

    use motion_types::IntegrationMethod;

    use super::*;

    #[test]
    fn test_states() {
        let up = TimeSystem::new(2.0, false).unwrap();
        assert_eq!(up.initial_state(), &array![0.0]);
        assert_eq!(up.attractor_state(), &array![1.0]);
        let down = TimeSystem::new(2.0, true).unwrap();
        assert_eq!(down.initial_state(), &array![1.0]);
        assert_eq!(down.attractor_state(), &array![0.0]);
    }

    #[test]
    fn test_phase_reaches_one_at_tau_and_holds() {
        let mut sys = TimeSystem::new(0.5, false).unwrap();
        sys.set_integration_method(IntegrationMethod::Euler);
        let ts = Array1::linspace(0.0, 1.0, 101);
        let (xs, xds) = sys.integrate_trajectory(ts.view()).unwrap();
        assert!((xs[[25, 0]] - 0.5).abs() < 1e-9);
        // Euler may finish one step past 1; after that the phase holds.
        let end = xs[[100, 0]];
        assert!(end > 1.0 - 1e-9 && end < 1.02 + 1e-9);
        assert_eq!(xs[[60, 0]], end);
        assert_eq!(xds[[100, 0]], 0.0);
    }

    #[test]
    fn test_analytical_count_down() {
        let sys = TimeSystem::new(2.0, true).unwrap();
        let mut xs = Array2::zeros((0, 0));
        let mut xds = Array2::zeros((0, 0));
        sys.analytical_solution(array![0.0, 1.0, 3.0].view(), &mut xs, &mut xds)
            .unwrap();
        assert_eq!(xs.column(0).to_vec(), vec![1.0, 0.5, 0.0]);
        assert_eq!(xds.column(0).to_vec(), vec![-0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_document_round_trip() {
        let sys = TimeSystem::new(1.5, true).unwrap();
        let back = TimeSystem::from_document(&sys.to_document()).unwrap();
        assert_eq!(back.core(), sys.core());
        assert!(back.count_down());
    }
}
