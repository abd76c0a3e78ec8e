// ─────────────────────────────────────────────────────────────────────
// Motion Kernel — Persisted Document Helpers
// ─────────────────────────────────────────────────────────────────────
//! Path-addressed lookup and numeric extraction on `serde_json::Value`
//! documents, plus the inverse writers.
//!
//! Vectors and matrices are stored as `{"values": [...]}` objects. Vectors
//! are flat arrays; matrices are arrays of equal-length rows. A bare array
//! (without the `values` wrapper) is accepted on read.
//!
//! Every document names its concrete type under [`TYPE_TAG_KEY`] and the
//! schema it was written with under [`SCHEMA_VERSION_KEY`].

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde_json::{json, Map, Value};

use crate::error::{MotionError, MotionResult};

/// Key holding the discriminator naming the concrete type of a document.
pub const TYPE_TAG_KEY: &str = "py/object";

/// Alternative discriminator key written by the plain JSON encoder.
pub const CLASS_KEY: &str = "class";

/// Key holding the interchange schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Schema version written by this build. Older (or unversioned) documents
/// are read; newer ones are rejected.
pub const SCHEMA_VERSION: u64 = 1;

/// Look up `key` in an object document.
pub fn field<'a>(doc: &'a Value, key: &str) -> MotionResult<&'a Value> {
    match doc {
        Value::Object(map) => map
            .get(key)
            .ok_or_else(|| MotionError::MissingField(key.to_string())),
        _ => Err(MotionError::malformed(key, "parent is not an object")),
    }
}

/// Look up `key`, returning `None` when absent.
pub fn optional_field<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    doc.as_object().and_then(|map| map.get(key))
}

pub fn f64_field(doc: &Value, key: &str) -> MotionResult<f64> {
    let v = field(doc, key)?;
    v.as_f64()
        .ok_or_else(|| MotionError::malformed(key, format!("expected a number, got {v}")))
}

pub fn usize_field(doc: &Value, key: &str) -> MotionResult<usize> {
    let v = field(doc, key)?;
    v.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| MotionError::malformed(key, format!("expected a non-negative integer, got {v}")))
}

pub fn bool_field(doc: &Value, key: &str) -> MotionResult<bool> {
    let v = field(doc, key)?;
    v.as_bool()
        .ok_or_else(|| MotionError::malformed(key, format!("expected a boolean, got {v}")))
}

pub fn str_field<'a>(doc: &'a Value, key: &str) -> MotionResult<&'a str> {
    let v = field(doc, key)?;
    v.as_str()
        .ok_or_else(|| MotionError::malformed(key, format!("expected a string, got {v}")))
}

/// The discriminator of a document, if it carries one.
///
/// [`TYPE_TAG_KEY`] wins over [`CLASS_KEY`] when both are present.
pub fn optional_type_tag(doc: &Value) -> MotionResult<Option<&str>> {
    for key in [TYPE_TAG_KEY, CLASS_KEY] {
        if optional_field(doc, key).is_some() {
            return str_field(doc, key).map(Some);
        }
    }
    Ok(None)
}

/// The discriminator of a document.
pub fn type_tag(doc: &Value) -> MotionResult<&str> {
    optional_type_tag(doc)?.ok_or_else(|| MotionError::MissingField(TYPE_TAG_KEY.to_string()))
}

/// Reject documents written by a newer schema.
pub fn check_schema_version(doc: &Value) -> MotionResult<()> {
    let Some(v) = optional_field(doc, SCHEMA_VERSION_KEY) else {
        log::debug!("document has no {SCHEMA_VERSION_KEY}; reading as legacy");
        return Ok(());
    };
    let found = v.as_u64().ok_or_else(|| {
        MotionError::malformed(SCHEMA_VERSION_KEY, format!("expected an integer, got {v}"))
    })?;
    if found > SCHEMA_VERSION {
        return Err(MotionError::SchemaVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// Write the discriminator and schema version into `map`.
pub fn tag_document(map: &mut Map<String, Value>, tag: &str) {
    map.insert(TYPE_TAG_KEY.to_string(), Value::String(tag.to_string()));
    map.insert(SCHEMA_VERSION_KEY.to_string(), json!(SCHEMA_VERSION));
}

fn values_of<'a>(v: &'a Value, key: &str) -> MotionResult<&'a Vec<Value>> {
    let inner = match v {
        Value::Object(_) => field(v, "values")
            .map_err(|_| MotionError::MissingField(format!("{key}.values")))?,
        other => other,
    };
    inner
        .as_array()
        .ok_or_else(|| MotionError::malformed(key, "expected an array of values"))
}

fn number(v: &Value, key: &str) -> MotionResult<f64> {
    v.as_f64()
        .ok_or_else(|| MotionError::malformed(key, format!("expected a number, got {v}")))
}

/// Extract a vector stored under `key`.
///
/// Accepts a flat array, a single row `[[...]]`, or a single column
/// `[[a], [b], ...]`.
pub fn vector_field(doc: &Value, key: &str) -> MotionResult<Array1<f64>> {
    parse_vector(field(doc, key)?, key)
}

pub fn parse_vector(v: &Value, key: &str) -> MotionResult<Array1<f64>> {
    let items = values_of(v, key)?;
    if items.iter().all(Value::is_number) {
        return items.iter().map(|x| number(x, key)).collect();
    }
    let m = parse_matrix(v, key)?;
    match m.dim() {
        (1, _) => Ok(m.row(0).to_owned()),
        (_, 1) => Ok(m.column(0).to_owned()),
        (r, c) => Err(MotionError::malformed(
            key,
            format!("expected a vector, got a {r}x{c} matrix"),
        )),
    }
}

/// Extract a matrix stored under `key`.
///
/// A flat array is read as a single column.
pub fn matrix_field(doc: &Value, key: &str) -> MotionResult<Array2<f64>> {
    parse_matrix(field(doc, key)?, key)
}

pub fn parse_matrix(v: &Value, key: &str) -> MotionResult<Array2<f64>> {
    let rows = values_of(v, key)?;
    if rows.is_empty() {
        return Ok(Array2::zeros((0, 0)));
    }

    if rows.iter().all(Value::is_number) {
        let col: Vec<f64> = rows.iter().map(|x| number(x, key)).collect::<MotionResult<_>>()?;
        let n = col.len();
        return Array2::from_shape_vec((n, 1), col)
            .map_err(|e| MotionError::malformed(key, e.to_string()));
    }

    let n_cols = rows[0]
        .as_array()
        .ok_or_else(|| MotionError::malformed(key, "mixed rows and scalars"))?
        .len();
    let mut data = Vec::with_capacity(rows.len() * n_cols);
    for (i, row) in rows.iter().enumerate() {
        let row = row
            .as_array()
            .ok_or_else(|| MotionError::malformed(key, format!("row {i} is not an array")))?;
        if row.len() != n_cols {
            return Err(MotionError::malformed(
                key,
                format!("row {i} has {} columns, expected {n_cols}", row.len()),
            ));
        }
        for x in row {
            data.push(number(x, key)?);
        }
    }
    Array2::from_shape_vec((rows.len(), n_cols), data)
        .map_err(|e| MotionError::malformed(key, e.to_string()))
}

pub fn vector_document(v: ArrayView1<'_, f64>) -> Value {
    json!({ "values": v.to_vec() })
}

pub fn matrix_document(m: ArrayView2<'_, f64>) -> Value {
    let rows: Vec<Vec<f64>> = m.rows().into_iter().map(|r| r.to_vec()).collect();
    json!({ "values": rows })
}
