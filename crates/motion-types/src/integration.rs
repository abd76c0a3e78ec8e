// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Integration Method Selector
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Numerical integration scheme used by `integrate_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegrationMethod {
    /// Explicit Euler, O(dt) local error.
    #[serde(rename = "EULER")]
    Euler,
    /// Classic 4th-order Runge-Kutta, O(dt^4) local error.
    #[default]
    #[serde(rename = "RUNGE_KUTTA")]
    RungeKutta,
}

impl IntegrationMethod {
    /// Name used in persisted documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            IntegrationMethod::Euler => "EULER",
            IntegrationMethod::RungeKutta => "RUNGE_KUTTA",
        }
    }
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationMethod {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EULER" => Ok(IntegrationMethod::Euler),
            "RUNGE_KUTTA" => Ok(IntegrationMethod::RungeKutta),
            other => Err(MotionError::malformed(
                "integration_method_",
                format!("expected \"EULER\" or \"RUNGE_KUTTA\", got {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_runge_kutta() {
        assert_eq!(IntegrationMethod::default(), IntegrationMethod::RungeKutta);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("EULER".parse::<IntegrationMethod>().unwrap(), IntegrationMethod::Euler);
        assert_eq!(
            "RUNGE_KUTTA".parse::<IntegrationMethod>().unwrap(),
            IntegrationMethod::RungeKutta
        );
        assert!("euler".parse::<IntegrationMethod>().is_err());
    }

    #[test]
    fn test_serde_names_match_document_names() {
        let s = serde_json::to_string(&IntegrationMethod::Euler).unwrap();
        assert_eq!(s, "\"EULER\"");
        let m: IntegrationMethod = serde_json::from_str("\"RUNGE_KUTTA\"").unwrap();
        assert_eq!(m, IntegrationMethod::RungeKutta);
    }
}
