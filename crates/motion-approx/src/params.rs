// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — RBFN Model Parameters
// ─────────────────────────────────────────────────────────────────────

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2};
use serde_json::{Map, Value};

use motion_types::document::{
    check_schema_version, matrix_document, matrix_field, optional_field, tag_document,
    vector_document, vector_field,
};
use motion_types::{MotionError, MotionResult};

use crate::kernel::{gaussian_activations, KernelOptions};

pub const MODEL_PARAMETERS_TAG: &str =
    "functionapproximators.ModelParametersRBFN.ModelParametersRBFN";

/// Centers, widths and weights of a radial basis function network.
///
/// `centers`, `widths`: n_basis × n_dims. `weights`: n_basis.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParametersRbfn {
    centers: Array2<f64>,
    widths: Array2<f64>,
    weights: Array1<f64>,
}

impl ModelParametersRbfn {
    pub fn new(centers: Array2<f64>, widths: Array2<f64>, weights: Array1<f64>) -> MotionResult<Self> {
        let (n_basis, n_dims) = centers.dim();
        if n_basis == 0 || n_dims == 0 {
            return Err(MotionError::Structural(format!(
                "centers must be non-empty, got {n_basis}x{n_dims}"
            )));
        }
        if widths.dim() != centers.dim() {
            return Err(MotionError::Structural(format!(
                "widths are {:?}, centers are {:?}",
                widths.dim(),
                centers.dim()
            )));
        }
        if weights.len() != n_basis {
            return Err(MotionError::Structural(format!(
                "{} weights for {n_basis} basis functions",
                weights.len()
            )));
        }
        if centers.iter().any(|c| !c.is_finite()) {
            return Err(MotionError::Structural("centers must be finite".to_string()));
        }
        if let Some(w) = widths.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(MotionError::Structural(format!(
                "widths must be finite and > 0, got {w}"
            )));
        }
        Ok(Self {
            centers,
            widths,
            weights,
        })
    }

    pub fn n_basis_functions(&self) -> usize {
        self.centers.nrows()
    }

    pub fn expected_input_dim(&self) -> usize {
        self.centers.ncols()
    }

    pub fn expected_output_dim(&self) -> usize {
        1
    }

    pub fn centers(&self) -> &Array2<f64> {
        &self.centers
    }

    pub fn widths(&self) -> &Array2<f64> {
        &self.widths
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn set_weights(&mut self, weights: Array1<f64>) -> MotionResult<()> {
        if weights.len() != self.n_basis_functions() {
            return Err(MotionError::Structural(format!(
                "{} weights for {} basis functions",
                weights.len(),
                self.n_basis_functions()
            )));
        }
        self.weights = weights;
        Ok(())
    }

    /// Activations into a caller-owned T × n_basis buffer.
    pub fn kernel_activations_into(
        &self,
        inputs: ArrayView2<'_, f64>,
        options: KernelOptions,
        out: ArrayViewMut2<'_, f64>,
    ) -> MotionResult<()> {
        gaussian_activations(self.centers.view(), self.widths.view(), inputs, options, out)
    }

    pub fn kernel_activations(
        &self,
        inputs: ArrayView2<'_, f64>,
        options: KernelOptions,
    ) -> MotionResult<Array2<f64>> {
        let mut out = Array2::zeros((inputs.nrows(), self.n_basis_functions()));
        self.kernel_activations_into(inputs, options, out.view_mut())?;
        Ok(out)
    }

    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        map.insert("centers".to_string(), matrix_document(self.centers.view()));
        map.insert("widths".to_string(), matrix_document(self.widths.view()));
        map.insert("weights".to_string(), vector_document(self.weights.view()));
        tag_document(&mut map, MODEL_PARAMETERS_TAG);
        Value::Object(map)
    }

    /// Read `centers`, `widths`, `weights`; the member-style spellings
    /// with a trailing underscore are accepted too.
    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        check_schema_version(doc)?;
        let centers = matrix_field(doc, member_key(doc, "centers", "centers_")?)?;
        let widths = matrix_field(doc, member_key(doc, "widths", "widths_")?)?;
        let weights = vector_field(doc, member_key(doc, "weights", "weights_")?)?;
        Self::new(centers, widths, weights)
    }
}

fn member_key(doc: &Value, key: &'static str, member: &'static str) -> MotionResult<&'static str> {
    if optional_field(doc, key).is_some() {
        Ok(key)
    } else if optional_field(doc, member).is_some() {
        Ok(member)
    } else {
        Err(MotionError::MissingField(key.to_string()))
    }
}
