// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Function Approximator Registry
// ─────────────────────────────────────────────────────────────────────

use ndarray::{Array1, ArrayView2, ArrayViewMut1};
use serde_json::Value;

use motion_types::document::{check_schema_version, type_tag};
use motion_types::{MotionConfig, MotionError, MotionResult};

use crate::rbfn::FunctionApproximatorRbfn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApproximatorKind {
    Rbfn,
}

impl ApproximatorKind {
    pub const ALL: [ApproximatorKind; 1] = [ApproximatorKind::Rbfn];

    pub const fn name(self) -> &'static str {
        match self {
            ApproximatorKind::Rbfn => "FunctionApproximatorRBFN",
        }
    }

    /// Short suffix that identifies the kind inside qualified tags.
    const fn marker(self) -> &'static str {
        match self {
            ApproximatorKind::Rbfn => "RBFN",
        }
    }

    pub fn type_tag(self) -> String {
        format!("functionapproximators.{0}.{0}", self.name())
    }

    /// Exact match on the short or qualified name first, then substring.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| tag == k.name() || tag == k.type_tag())
            .or_else(|| Self::ALL.iter().copied().find(|k| tag.contains(k.marker())))
    }
}

/// Any registered function approximator.
#[derive(Debug, Clone)]
pub enum AnyApproximator {
    Rbfn(FunctionApproximatorRbfn),
}

impl AnyApproximator {
    /// Decode a persisted approximator, choosing the variant by its tag.
    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        check_schema_version(doc)?;
        let tag = type_tag(doc)?;
        match ApproximatorKind::from_tag(tag) {
            Some(ApproximatorKind::Rbfn) => {
                FunctionApproximatorRbfn::from_document(doc).map(AnyApproximator::Rbfn)
            }
            None => {
                log::warn!("no function approximator registered for tag {tag:?}");
                Err(MotionError::UnknownVariant(tag.to_string()))
            }
        }
    }

    pub fn from_json(json: &str) -> MotionResult<Self> {
        let doc: Value = serde_json::from_str(json)
            .map_err(|e| MotionError::malformed("<document>", e.to_string()))?;
        Self::from_document(&doc)
    }

    pub fn kind(&self) -> ApproximatorKind {
        match self {
            AnyApproximator::Rbfn(_) => ApproximatorKind::Rbfn,
        }
    }

    pub fn to_document(&self) -> Value {
        match self {
            AnyApproximator::Rbfn(fa) => fa.to_document(),
        }
    }

    pub fn predict(
        &mut self,
        inputs: ArrayView2<'_, f64>,
        outputs: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        match self {
            AnyApproximator::Rbfn(fa) => fa.predict(inputs, outputs),
        }
    }

    pub fn predict_batch(&mut self, inputs: ArrayView2<'_, f64>) -> MotionResult<Array1<f64>> {
        match self {
            AnyApproximator::Rbfn(fa) => fa.predict_batch(inputs),
        }
    }

    pub fn apply_config(&mut self, config: &MotionConfig) {
        match self {
            AnyApproximator::Rbfn(fa) => fa.apply_config(config),
        }
    }
}

impl From<FunctionApproximatorRbfn> for AnyApproximator {
    fn from(fa: FunctionApproximatorRbfn) -> Self {
        AnyApproximator::Rbfn(fa)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use serde_json::json;

    use super::*;

    fn rbfn_2d() -> AnyApproximator {
        FunctionApproximatorRbfn::new(
            array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            array![[0.5, 0.5], [0.5, 0.5], [0.5, 0.5], [0.5, 0.5]],
            array![[1.0], [2.0], [3.0], [4.0]],
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_tag_lookup() {
        assert_eq!(
            ApproximatorKind::from_tag(
                "functionapproximators.FunctionApproximatorRBFN.FunctionApproximatorRBFN"
            ),
            Some(ApproximatorKind::Rbfn)
        );
        assert_eq!(
            ApproximatorKind::from_tag("FunctionApproximatorRBFN"),
            Some(ApproximatorKind::Rbfn)
        );
        assert_eq!(ApproximatorKind::from_tag("legacy.RBFN"), Some(ApproximatorKind::Rbfn));
        assert_eq!(ApproximatorKind::from_tag("FunctionApproximatorLWR"), None);
    }

    #[test]
    fn test_round_trip_predicts_identically() {
        let mut fa = rbfn_2d();
        let doc = fa.to_document();
        let mut back = AnyApproximator::from_document(&doc).unwrap();
        assert_eq!(back.kind(), ApproximatorKind::Rbfn);
        let inputs = array![[0.2, 0.3], [0.9, 0.8], [0.5, 0.5]];
        assert_eq!(
            back.predict_batch(inputs.view()).unwrap(),
            fa.predict_batch(inputs.view()).unwrap()
        );
    }

    #[test]
    fn test_round_trip_through_json_text() {
        let fa = rbfn_2d();
        let text = serde_json::to_string(&fa.to_document()).unwrap();
        let back = AnyApproximator::from_json(&text).unwrap();
        assert_eq!(back.to_document(), fa.to_document());
    }

    #[test]
    fn test_lwr_document_is_unknown_variant() {
        let doc = json!({
            "py/object": "functionapproximators.FunctionApproximatorLWR.FunctionApproximatorLWR",
            "_model_params": {}
        });
        assert_eq!(
            AnyApproximator::from_document(&doc).unwrap_err(),
            MotionError::UnknownVariant(
                "functionapproximators.FunctionApproximatorLWR.FunctionApproximatorLWR".into()
            )
        );
    }

    #[test]
    fn test_apply_config_sets_kernel_options() {
        let mut fa = rbfn_2d();
        let config = MotionConfig {
            normalized_kernels: true,
            asymmetric_kernels: true,
            ..MotionConfig::default()
        };
        fa.apply_config(&config);
        let AnyApproximator::Rbfn(inner) = &fa;
        assert!(inner.options().normalized);
        assert!(inner.options().asymmetric);
    }
}
