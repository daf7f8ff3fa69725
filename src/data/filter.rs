use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use super::model::{ColumnType, DataCategory, DatasetFileinfo, FileinfoTable, MetadataValue};
use crate::error::{GazeError, Result};

// ---------------------------------------------------------------------------
// Subset predicate: which values are allowed per column
// ---------------------------------------------------------------------------

/// Allowed values for one fileinfo column.
#[derive(Debug, Clone, PartialEq)]
pub enum SubsetValue {
    One(MetadataValue),
    Many(Vec<MetadataValue>),
}

/// Column name → allowed values. Keys are combined with AND.
pub type Subset = BTreeMap<String, SubsetValue>;

impl SubsetValue {
    /// The allowed set; a single value is a one-element set.
    pub fn values(&self) -> &[MetadataValue] {
        match self {
            SubsetValue::One(value) => std::slice::from_ref(value),
            SubsetValue::Many(values) => values,
        }
    }

    fn validate(&self, column: &str) -> Result<()> {
        if let Some(value) = self.values().iter().find(|v| matches!(v, MetadataValue::Null)) {
            return Err(GazeError::Configuration(format!(
                "subset values must be of type bool, float, int, str, or a list of those, \
                 but value of key {column} is {value}"
            )));
        }
        Ok(())
    }
}

impl From<MetadataValue> for SubsetValue {
    fn from(value: MetadataValue) -> Self {
        SubsetValue::One(value)
    }
}

impl From<Vec<MetadataValue>> for SubsetValue {
    fn from(values: Vec<MetadataValue>) -> Self {
        SubsetValue::Many(values)
    }
}

impl TryFrom<JsonValue> for SubsetValue {
    type Error = GazeError;

    /// Accepts a bool, number or string, or an array of those.
    fn try_from(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Array(items) => items
                .into_iter()
                .map(json_scalar)
                .collect::<Result<Vec<_>>>()
                .map(SubsetValue::Many),
            other => json_scalar(other).map(SubsetValue::One),
        }
    }
}

fn json_scalar(value: JsonValue) -> Result<MetadataValue> {
    match value {
        JsonValue::Bool(b) => Ok(MetadataValue::Bool(b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(MetadataValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(MetadataValue::Float(f))
            } else {
                Err(GazeError::Configuration(format!("unsupported subset number {n}")))
            }
        }
        JsonValue::String(s) => Ok(MetadataValue::String(s)),
        other => Err(GazeError::Configuration(format!(
            "subset values must be of type bool, float, int, str, or a list of those, \
             but got {other}"
        ))),
    }
}

/// Parse a JSON object such as `{"subject_id": [1, 2], "session": "a"}` into a [`Subset`].
pub fn subset_from_json(value: JsonValue) -> Result<Subset> {
    let JsonValue::Object(map) = value else {
        return Err(GazeError::Configuration(format!(
            "subset must be a JSON object but is {value}"
        )));
    };
    map.into_iter()
        .map(|(key, value)| Ok((key, SubsetValue::try_from(value)?)))
        .collect()
}

// ---------------------------------------------------------------------------
// take_subset
// ---------------------------------------------------------------------------

/// Keep the gaze fileinfo rows whose value in every subset column is allowed.
///
/// Only the `gaze` table is filtered; the other categories are returned as they are.
pub fn take_subset(fileinfo: DatasetFileinfo, subset: Option<&Subset>) -> Result<DatasetFileinfo> {
    let Some(subset) = subset else {
        return Ok(fileinfo);
    };

    let Some(gaze) = fileinfo.gaze() else {
        let key = subset.keys().next().map(String::as_str).unwrap_or_default();
        return Err(GazeError::Configuration(format!(
            "subset key {key} must be a column in the fileinfo attribute. \
             No gaze files were scanned"
        )));
    };

    let mut constraints: Vec<(usize, &[MetadataValue])> = Vec::with_capacity(subset.len());
    for (key, value) in subset {
        let column = gaze.column_index(key).ok_or_else(|| {
            GazeError::Configuration(format!(
                "subset key {key} must be a column in the fileinfo attribute. \
                 Available columns are: {:?}",
                gaze.column_names()
            ))
        })?;
        value.validate(key)?;
        let dtype = gaze.columns()[column].dtype;
        if let Some(mismatch) = value.values().iter().find(|v| !fits_column(v, dtype)) {
            return Err(GazeError::Configuration(format!(
                "subset value {mismatch} for key {key} does not match column type {dtype}"
            )));
        }
        constraints.push((column, value.values()));
    }

    let filtered: FileinfoTable = gaze.filter_rows(|row| {
        constraints
            .iter()
            .all(|(column, allowed)| allowed.iter().any(|a| a.loosely_equals(&row[*column])))
    });

    let mut fileinfo = fileinfo;
    fileinfo.insert(DataCategory::Gaze, filtered);
    Ok(fileinfo)
}

/// Integers and floats are interchangeable; everything else must match exactly.
fn fits_column(value: &MetadataValue, dtype: ColumnType) -> bool {
    matches!(
        (value, dtype),
        (MetadataValue::Integer(_) | MetadataValue::Float(_), ColumnType::Int64 | ColumnType::Float64)
            | (MetadataValue::String(_), ColumnType::Utf8)
            | (MetadataValue::Bool(_), ColumnType::Boolean)
    )
}
