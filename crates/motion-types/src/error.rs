// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all motion kernel failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Shape or dimension mismatch, wrong order, non-positive `dt`/`tau`.
    #[error("structural invariant violated: {0}")]
    Structural(String),

    /// A persisted document names a type that no decoder is registered for.
    #[error("unknown variant tag: {0}")]
    UnknownVariant(String),

    /// An expected key is absent from a persisted document.
    #[error("missing field `{0}` in document")]
    MissingField(String),

    /// A key is present but its value has the wrong type or shape.
    #[error("malformed field `{field}`: {reason}")]
    MalformedField { field: String, reason: String },

    /// The requested operation has no implementation for this variant.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The document was written by a newer schema than this build reads.
    #[error("schema version {found} is newer than supported version {supported}")]
    SchemaVersion { found: u64, supported: u64 },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl MotionError {
    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        MotionError::MalformedField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that signal a programming/input error rather than a
    /// bad document.
    pub fn is_structural(&self) -> bool {
        matches!(self, MotionError::Structural(_))
    }
}

pub type MotionResult<T> = Result<T, MotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_missing_field() {
        let e = MotionError::MissingField("tau_".into());
        assert_eq!(e.to_string(), "missing field `tau_` in document");
    }

    #[test]
    fn test_malformed_helper() {
        let e = MotionError::malformed("alpha_", "expected a number");
        assert!(matches!(e, MotionError::MalformedField { ref field, .. } if field == "alpha_"));
        assert!(e.to_string().contains("expected a number"));
    }

    #[test]
    fn test_is_structural() {
        assert!(MotionError::Structural("dt".into()).is_structural());
        assert!(!MotionError::UnknownVariant("Foo".into()).is_structural());
    }
}
