use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arrow::array::{new_null_array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{GazeError, Result};

/// Name of the fileinfo column holding the matched relative path.
pub const FILEPATH_COLUMN: &str = "filepath";

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a fileinfo column
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value: one captured placeholder, after casting.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Equality used for membership tests: integers and floats compare numerically.
    pub fn loosely_equals(&self, other: &MetadataValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Convert the value to `target`, failing on values that cannot be represented.
    pub fn cast(&self, target: ColumnType) -> Result<MetadataValue> {
        let fail = || {
            GazeError::Configuration(format!("cannot cast value '{self}' to {target}"))
        };
        let cast = match (self, target) {
            (MetadataValue::Null, _) => MetadataValue::Null,

            (MetadataValue::Integer(i), ColumnType::Int64) => MetadataValue::Integer(*i),
            (MetadataValue::Float(v), ColumnType::Int64) => {
                if v.fract() != 0.0 || !v.is_finite() {
                    return Err(fail());
                }
                MetadataValue::Integer(*v as i64)
            }
            (MetadataValue::Bool(b), ColumnType::Int64) => MetadataValue::Integer(*b as i64),
            (MetadataValue::String(s), ColumnType::Int64) => {
                MetadataValue::Integer(s.trim().parse().map_err(|_| fail())?)
            }

            (MetadataValue::Integer(i), ColumnType::Float64) => MetadataValue::Float(*i as f64),
            (MetadataValue::Float(v), ColumnType::Float64) => MetadataValue::Float(*v),
            (MetadataValue::Bool(b), ColumnType::Float64) => {
                MetadataValue::Float(if *b { 1.0 } else { 0.0 })
            }
            (MetadataValue::String(s), ColumnType::Float64) => {
                MetadataValue::Float(s.trim().parse().map_err(|_| fail())?)
            }

            (value, ColumnType::Utf8) => MetadataValue::String(value.to_string()),

            (MetadataValue::Bool(b), ColumnType::Boolean) => MetadataValue::Bool(*b),
            (MetadataValue::Integer(0), ColumnType::Boolean) => MetadataValue::Bool(false),
            (MetadataValue::Integer(1), ColumnType::Boolean) => MetadataValue::Bool(true),
            (MetadataValue::String(s), ColumnType::Boolean) => match s.trim() {
                "true" => MetadataValue::Bool(true),
                "false" => MetadataValue::Bool(false),
                _ => return Err(fail()),
            },
            _ => return Err(fail()),
        };
        Ok(cast)
    }

    /// Build a constant Arrow array of `len` rows holding this value.
    pub fn to_array(&self, len: usize) -> ArrayRef {
        match self {
            MetadataValue::String(s) => Arc::new(StringArray::from(vec![s.as_str(); len])),
            MetadataValue::Integer(i) => Arc::new(Int64Array::from(vec![*i; len])),
            MetadataValue::Float(v) => Arc::new(Float64Array::from(vec![*v; len])),
            MetadataValue::Bool(b) => Arc::new(BooleanArray::from(vec![*b; len])),
            MetadataValue::Null => new_null_array(&DataType::Utf8, len),
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnType – declared column types
// ---------------------------------------------------------------------------

/// Target types for fileinfo and metadata columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[serde(alias = "i64", alias = "int")]
    Int64,
    #[serde(alias = "f64", alias = "float")]
    Float64,
    #[serde(alias = "string", alias = "str")]
    Utf8,
    #[serde(alias = "bool")]
    Boolean,
}

impl ColumnType {
    pub fn data_type(self) -> DataType {
        match self {
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Utf8 => DataType::Utf8,
            ColumnType::Boolean => DataType::Boolean,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Utf8 => "utf8",
            ColumnType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Column name → target type, applied as an explicit cast pass.
pub type SchemaOverrides = BTreeMap<String, ColumnType>;

// ---------------------------------------------------------------------------
// DataCategory
// ---------------------------------------------------------------------------

/// Independent file classes within one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataCategory {
    Gaze,
    PrecomputedEvents,
    PrecomputedReadingMeasures,
}

impl DataCategory {
    pub const ALL: [DataCategory; 3] = [
        DataCategory::Gaze,
        DataCategory::PrecomputedEvents,
        DataCategory::PrecomputedReadingMeasures,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataCategory::Gaze => "gaze",
            DataCategory::PrecomputedEvents => "precomputed_events",
            DataCategory::PrecomputedReadingMeasures => "precomputed_reading_measures",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FileRecord – one discovered file
// ---------------------------------------------------------------------------

/// A file matched by a filename pattern, with its raw placeholder values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the scanned root, `/`-separated (absolute if not scanned relatively).
    pub filepath: String,
    /// Placeholder name → captured text, in pattern order.
    pub fields: Vec<(String, String)>,
}

impl FileRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

// ---------------------------------------------------------------------------
// FileinfoTable – metadata rows of one category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileinfoColumn {
    pub name: String,
    pub dtype: ColumnType,
}

/// Per-file metadata, one row per discovered file, sorted by `filepath`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileinfoTable {
    columns: Vec<FileinfoColumn>,
    rows: Vec<Vec<MetadataValue>>,
}

impl FileinfoTable {
    /// Assemble a table from already-typed columns and rows.
    ///
    /// Every row must have one value per column.
    pub fn new(columns: Vec<FileinfoColumn>, rows: Vec<Vec<MetadataValue>>) -> Result<Self> {
        if !columns.iter().any(|c| c.name == FILEPATH_COLUMN) {
            return Err(GazeError::Configuration(format!(
                "fileinfo table requires a '{FILEPATH_COLUMN}' column"
            )));
        }
        if let Some(i) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(GazeError::Configuration(format!(
                "fileinfo row {i} has {} values but the table has {} columns",
                rows[i].len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[FileinfoColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Owned view of row `index`.
    pub fn row(&self, index: usize) -> Option<FileinfoRow> {
        self.rows.get(index).map(|values| FileinfoRow {
            values: self
                .columns
                .iter()
                .map(|c| c.name.clone())
                .zip(values.iter().cloned())
                .collect(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = FileinfoRow> + '_ {
        (0..self.rows.len()).filter_map(|i| self.row(i))
    }

    /// The `filepath` value of row `index`.
    pub fn filepath(&self, index: usize) -> Option<&str> {
        let col = self.column_index(FILEPATH_COLUMN)?;
        match self.rows.get(index)?.get(col)? {
            MetadataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&MetadataValue>> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[col]).collect())
    }

    /// Cast a column in place; the declared type always becomes `target`.
    pub fn cast_column(&mut self, name: &str, target: ColumnType) -> Result<()> {
        let col = self.column_index(name).ok_or_else(|| {
            GazeError::Configuration(format!(
                "cannot cast unknown fileinfo column '{name}'. Available columns are: {:?}",
                self.column_names()
            ))
        })?;
        for row in &mut self.rows {
            row[col] = row[col].cast(target).map_err(|err| {
                GazeError::Configuration(format!("fileinfo column '{name}': {err}"))
            })?;
        }
        self.columns[col].dtype = target;
        Ok(())
    }

    /// A new table with the rows for which `keep` returns `true`.
    pub fn filter_rows<F>(&self, mut keep: F) -> FileinfoTable
    where
        F: FnMut(&[MetadataValue]) -> bool,
    {
        FileinfoTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }

    /// Sort rows by `filepath`, lexicographically.
    pub fn sort_by_filepath(&mut self) {
        if let Some(col) = self.column_index(FILEPATH_COLUMN) {
            self.rows.sort_by(|a, b| a[col].to_string().cmp(&b[col].to_string()));
        }
    }

    /// Arrow view of the table, used for display.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, c.dtype.data_type(), true))
            .collect();
        let arrays = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let values: Vec<MetadataValue> =
                    self.rows.iter().map(|row| row[i].clone()).collect();
                values_to_array(&values, c.dtype)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

fn values_to_array(values: &[MetadataValue], dtype: ColumnType) -> Result<ArrayRef> {
    let array: ArrayRef = match dtype {
        ColumnType::Int64 => Arc::new(Int64Array::from(
            values
                .iter()
                .map(|v| match v.cast(dtype)? {
                    MetadataValue::Integer(i) => Ok(Some(i)),
                    _ => Ok(None),
                })
                .collect::<Result<Vec<_>>>()?,
        )),
        ColumnType::Float64 => Arc::new(Float64Array::from(
            values.iter().map(|v| v.as_f64()).collect::<Vec<_>>(),
        )),
        ColumnType::Boolean => Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| match v {
                    MetadataValue::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Utf8 => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| match v {
                    MetadataValue::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>(),
        )),
    };
    Ok(array)
}

// ---------------------------------------------------------------------------
// FileinfoRow – one row of a FileinfoTable
// ---------------------------------------------------------------------------

/// Column name → value for a single file, in table column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FileinfoRow {
    values: Vec<(String, MetadataValue)>,
}

impl FileinfoRow {
    pub fn new(values: Vec<(String, MetadataValue)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&MetadataValue> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn filepath(&self) -> Option<&str> {
        match self.get(FILEPATH_COLUMN)? {
            MetadataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Every metadata field except `filepath`.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.values
            .iter()
            .filter(|(k, _)| k != FILEPATH_COLUMN)
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields().map(|(k, _)| k.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// DatasetFileinfo – the fileinfo tables of all scanned categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFileinfo {
    tables: BTreeMap<DataCategory, FileinfoTable>,
}

impl DatasetFileinfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: DataCategory, table: FileinfoTable) {
        self.tables.insert(category, table);
    }

    pub fn get(&self, category: DataCategory) -> Option<&FileinfoTable> {
        self.tables.get(&category)
    }

    pub fn gaze(&self) -> Option<&FileinfoTable> {
        self.get(DataCategory::Gaze)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DataCategory, &FileinfoTable)> {
        self.tables.iter().map(|(category, table)| (*category, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FileinfoTable {
        FileinfoTable::new(
            vec![
                FileinfoColumn { name: "filepath".into(), dtype: ColumnType::Utf8 },
                FileinfoColumn { name: "subject_id".into(), dtype: ColumnType::Utf8 },
            ],
            vec![
                vec![MetadataValue::String("b.csv".into()), MetadataValue::String("2".into())],
                vec![MetadataValue::String("a.csv".into()), MetadataValue::String("1".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn cast_column_changes_values_and_dtype() {
        let mut t = table();
        t.cast_column("subject_id", ColumnType::Int64).unwrap();
        assert_eq!(t.columns()[1].dtype, ColumnType::Int64);
        assert_eq!(t.row(0).unwrap().get("subject_id"), Some(&MetadataValue::Integer(2)));
    }

    #[test]
    fn cast_rejects_non_numeric_text() {
        let err = MetadataValue::String("abc".into()).cast(ColumnType::Int64).unwrap_err();
        assert!(matches!(err, GazeError::Configuration(_)));
    }

    #[test]
    fn sort_by_filepath_orders_rows() {
        let mut t = table();
        t.sort_by_filepath();
        assert_eq!(t.filepath(0), Some("a.csv"));
        assert_eq!(t.filepath(1), Some("b.csv"));
    }

    #[test]
    fn row_fields_skip_filepath() {
        let row = table().row(0).unwrap();
        assert_eq!(row.field_names(), vec!["subject_id".to_string()]);
        assert_eq!(row.filepath(), Some("b.csv"));
    }

    #[test]
    fn numeric_values_compare_loosely() {
        assert!(MetadataValue::Integer(1).loosely_equals(&MetadataValue::Float(1.0)));
        assert!(!MetadataValue::Integer(1).loosely_equals(&MetadataValue::String("1".into())));
    }

    #[test]
    fn record_batch_view_keeps_types() {
        let mut t = table();
        t.cast_column("subject_id", ColumnType::Int64).unwrap();
        let batch = t.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Int64);
    }
}
