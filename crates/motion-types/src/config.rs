// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Runtime Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{MotionError, MotionResult};
use crate::integration::IntegrationMethod;

/// Runtime configuration shared by dynamical systems and approximators.
///
/// Construction parameters of individual systems (tau, states, gains) are
/// not part of this struct; it only carries the evaluation policy knobs
/// that callers usually want to set once for a whole controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Scheme used by `integrate_step`.
    /// Default: RUNGE_KUTTA.
    pub integration_method: IntegrationMethod,

    /// Normalise kernel activations so each row sums to one.
    /// Default: false.
    pub normalized_kernels: bool,

    /// Use the width of the left neighbour for inputs left of a center.
    /// Default: false.
    pub asymmetric_kernels: bool,

    /// |zeta - 1| below which a spring-damper is treated as critically damped
    /// by the closed-form solution.
    /// Default: 1e-9.
    pub critical_damping_tolerance: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            integration_method: IntegrationMethod::RungeKutta,
            normalized_kernels: false,
            asymmetric_kernels: false,
            critical_damping_tolerance: 1e-9,
        }
    }
}

impl MotionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> MotionResult<()> {
        if !self.critical_damping_tolerance.is_finite() || self.critical_damping_tolerance < 0.0 {
            return Err(MotionError::Config(format!(
                "critical_damping_tolerance must be finite and >= 0, got {}",
                self.critical_damping_tolerance
            )));
        }
        Ok(())
    }

    /// Load from JSON string and validate.
    pub fn from_json(json: &str) -> MotionResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| MotionError::Config(format!("JSON parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(MotionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = MotionConfig::from_json(r#"{"integration_method": "EULER"}"#).unwrap();
        assert_eq!(cfg.integration_method, IntegrationMethod::Euler);
        assert!(!cfg.normalized_kernels);
        assert!((cfg.critical_damping_tolerance - 1e-9).abs() < 1e-18);
    }

    #[test]
    fn test_from_json_rejects_negative_tolerance() {
        let err = MotionConfig::from_json(r#"{"critical_damping_tolerance": -1.0}"#).unwrap_err();
        assert!(matches!(err, MotionError::Config(_)));
    }

    #[test]
    fn test_from_json_parse_error() {
        let err = MotionConfig::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }
}
