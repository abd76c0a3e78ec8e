// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — RBFN Function Approximator
// ─────────────────────────────────────────────────────────────────────
//! Radial basis function network regression:
//!
//!   y[t] = Σ_b a[t][b] · w[b]
//!
//! The single-sample path writes into a pre-sized 1 × n_basis buffer
//! and is allocation-free. The batch path grows its buffer to the
//! largest batch seen so far.

use ndarray::{s, Array1, Array2, ArrayView2, ArrayViewMut1, Zip};
use serde_json::{json, Map, Value};

use motion_types::document::{
    bool_field, check_schema_version, optional_field, optional_type_tag, tag_document,
};
use motion_types::{MotionConfig, MotionError, MotionResult};

use crate::kernel::KernelOptions;
use crate::params::ModelParametersRbfn;

pub const RBFN_TAG: &str = "functionapproximators.FunctionApproximatorRBFN.FunctionApproximatorRBFN";

/// Key of the nested model-parameter document.
pub const MODEL_PARAMS_KEY: &str = "_model_params";

#[derive(Debug, Clone)]
pub struct FunctionApproximatorRbfn {
    params: ModelParametersRbfn,
    options: KernelOptions,
    activations_one: Array2<f64>,
    activations_batch: Array2<f64>,
}

impl FunctionApproximatorRbfn {
    /// `weights` is n_basis × 1.
    pub fn new(centers: Array2<f64>, widths: Array2<f64>, weights: Array2<f64>) -> MotionResult<Self> {
        if weights.ncols() != 1 {
            return Err(MotionError::Structural(format!(
                "weights must be a single column, got {} columns",
                weights.ncols()
            )));
        }
        let weights = weights.column(0).to_owned();
        Ok(Self::from_parameters(ModelParametersRbfn::new(
            centers, widths, weights,
        )?))
    }

    pub fn from_parameters(params: ModelParametersRbfn) -> Self {
        let n_basis = params.n_basis_functions();
        Self {
            params,
            options: KernelOptions::default(),
            activations_one: Array2::zeros((1, n_basis)),
            activations_batch: Array2::zeros((0, n_basis)),
        }
    }

    pub fn with_options(mut self, options: KernelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> KernelOptions {
        self.options
    }

    pub fn set_options(&mut self, options: KernelOptions) {
        self.options = options;
    }

    pub fn apply_config(&mut self, config: &MotionConfig) {
        self.options = KernelOptions::from(config);
    }

    pub fn parameters(&self) -> &ModelParametersRbfn {
        &self.params
    }

    pub fn set_weights(&mut self, weights: Array1<f64>) -> MotionResult<()> {
        self.params.set_weights(weights)
    }

    pub fn expected_input_dim(&self) -> usize {
        self.params.expected_input_dim()
    }

    pub fn expected_output_dim(&self) -> usize {
        self.params.expected_output_dim()
    }

    /// Predict one output per input row.
    ///
    /// `inputs`: T × n_dims, `outputs`: T. With T == 1 no heap memory is
    /// touched; larger batches may grow the internal buffer.
    pub fn predict(
        &mut self,
        inputs: ArrayView2<'_, f64>,
        mut outputs: ArrayViewMut1<'_, f64>,
    ) -> MotionResult<()> {
        let n_t = inputs.nrows();
        if inputs.ncols() != self.params.expected_input_dim() {
            return Err(MotionError::Structural(format!(
                "inputs have {} columns, expected {}",
                inputs.ncols(),
                self.params.expected_input_dim()
            )));
        }
        if outputs.len() != n_t {
            return Err(MotionError::Structural(format!(
                "outputs have length {}, expected {n_t}",
                outputs.len()
            )));
        }

        if n_t == 1 {
            self.params
                .kernel_activations_into(inputs, self.options, self.activations_one.view_mut())?;
            outputs[0] = self.activations_one.row(0).dot(self.params.weights());
            return Ok(());
        }

        if self.activations_batch.nrows() < n_t {
            self.activations_batch = Array2::zeros((n_t, self.params.n_basis_functions()));
        }
        let mut activations = self.activations_batch.slice_mut(s![..n_t, ..]);
        self.params
            .kernel_activations_into(inputs, self.options, activations.view_mut())?;
        let weights = self.params.weights();
        Zip::from(&mut outputs)
            .and(activations.rows())
            .for_each(|y, a| *y = a.dot(weights));
        Ok(())
    }

    /// Allocating convenience around [`predict`](Self::predict).
    pub fn predict_batch(&mut self, inputs: ArrayView2<'_, f64>) -> MotionResult<Array1<f64>> {
        let mut outputs = Array1::zeros(inputs.nrows());
        self.predict(inputs, outputs.view_mut())?;
        Ok(outputs)
    }

    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        map.insert(MODEL_PARAMS_KEY.to_string(), self.params.to_document());
        map.insert("normalized_kernels_".to_string(), json!(self.options.normalized));
        map.insert("asymmetric_kernels_".to_string(), json!(self.options.asymmetric));
        tag_document(&mut map, RBFN_TAG);
        Value::Object(map)
    }

    /// Accepts a nested `_model_params` sub-document or the matrices at
    /// the top level. Kernel options default to off when absent.
    pub fn from_document(doc: &Value) -> MotionResult<Self> {
        check_schema_version(doc)?;
        if let Some(tag) = optional_type_tag(doc)? {
            if !tag.contains("RBFN") {
                return Err(MotionError::UnknownVariant(format!("{tag} (expected RBFN)")));
            }
        }
        let params = match optional_field(doc, MODEL_PARAMS_KEY) {
            Some(nested) => ModelParametersRbfn::from_document(nested)?,
            None => ModelParametersRbfn::from_document(doc)?,
        };
        let mut options = KernelOptions::default();
        if optional_field(doc, "normalized_kernels_").is_some() {
            options.normalized = bool_field(doc, "normalized_kernels_")?;
        }
        if optional_field(doc, "asymmetric_kernels_").is_some() {
            options.asymmetric = bool_field(doc, "asymmetric_kernels_")?;
        }
        Ok(Self::from_parameters(params).with_options(options))
    }
}
