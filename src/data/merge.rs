use std::fmt;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use super::model::{FileinfoRow, SchemaOverrides};
use crate::error::{GazeError, Result};

// ---------------------------------------------------------------------------
// Trial columns
// ---------------------------------------------------------------------------

/// Columns identifying a trial, metadata columns first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrialColumnSet(Vec<String>);

impl TrialColumnSet {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Non-fatal findings reported alongside a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Declared trial columns that are also fileinfo columns; they were removed from the declared list.
    DuplicateMetadataColumns(Vec<String>),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateMetadataColumns(columns) => write!(
                f,
                "removed duplicated fileinfo columns from trial_columns: {}",
                columns.join(", ")
            ),
        }
    }
}

/// Merge user-declared trial columns with the fileinfo fields of a file.
///
/// Without declared columns every fileinfo field is a trial column. Otherwise
/// declared names that are also fileinfo fields are dropped from the declared
/// list (reported as a diagnostic) and the fileinfo fields are put in front.
pub fn resolve_trial_columns(
    declared: Option<&[String]>,
    fileinfo_fields: &[String],
) -> (TrialColumnSet, Vec<Diagnostic>) {
    let declared = match declared {
        Some(declared) if !declared.is_empty() => declared,
        _ => return (TrialColumnSet(fileinfo_fields.to_vec()), Vec::new()),
    };

    let (dupes, kept): (Vec<String>, Vec<String>) = declared
        .iter()
        .cloned()
        .partition(|c| fileinfo_fields.contains(c));

    let mut diagnostics = Vec::new();
    if !dupes.is_empty() {
        diagnostics.push(Diagnostic::DuplicateMetadataColumns(dupes));
    }

    let mut columns = fileinfo_fields.to_vec();
    columns.extend(kept);
    (TrialColumnSet(columns), diagnostics)
}

// ---------------------------------------------------------------------------
// Metadata injection
// ---------------------------------------------------------------------------

/// Prepend one constant column per fileinfo field (except `filepath`) that
/// `batch` does not already have, then cast the fileinfo columns that have an
/// override. Existing columns keep their values.
pub fn add_fileinfo(
    batch: &RecordBatch,
    fileinfo: &FileinfoRow,
    overrides: &SchemaOverrides,
) -> Result<RecordBatch> {
    let schema = batch.schema();
    let num_rows = batch.num_rows();

    let mut fields: Vec<Field> = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for (name, value) in fileinfo.fields() {
        if schema.index_of(name).is_ok() {
            continue;
        }
        let array = value.to_array(num_rows);
        fields.push(Field::new(name, array.data_type().clone(), true));
        arrays.push(array);
    }
    fields.extend(schema.fields().iter().map(|f| f.as_ref().clone()));
    arrays.extend(batch.columns().iter().cloned());

    let cast_options = CastOptions {
        safe: false,
        ..Default::default()
    };
    for (name, dtype) in overrides {
        if fileinfo.get(name).is_none() {
            continue;
        }
        let Some(i) = fields.iter().position(|f| f.name() == name) else {
            continue;
        };
        let target = dtype.data_type();
        if fields[i].data_type() == &target {
            continue;
        }
        arrays[i] = cast_with_options(&arrays[i], &target, &cast_options).map_err(|err| {
            GazeError::Configuration(format!("cannot cast column '{name}' to {dtype}: {err}"))
        })?;
        fields[i] = Field::new(name, target, true);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        arrays,
        &options,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ColumnType, MetadataValue};
    use arrow::array::{AsArray, Int64Array};
    use arrow::datatypes::{DataType, Int64Type};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn undeclared_trial_columns_are_the_fileinfo_fields() {
        let (set, diagnostics) = resolve_trial_columns(None, &names(&["subject_id", "session"]));
        assert_eq!(set.as_slice(), names(&["subject_id", "session"]).as_slice());
        assert!(diagnostics.is_empty());

        let empty: Vec<String> = Vec::new();
        let (set, _) = resolve_trial_columns(Some(empty.as_slice()), &names(&["subject_id"]));
        assert_eq!(set.into_vec(), names(&["subject_id"]));
    }

    #[test]
    fn duplicated_trial_columns_go_to_metadata() {
        let declared = names(&["subject_id", "trial_id"]);
        let (set, diagnostics) = resolve_trial_columns(Some(declared.as_slice()), &names(&["subject_id"]));

        assert_eq!(set.into_vec(), names(&["subject_id", "trial_id"]));
        assert_eq!(
            diagnostics,
            vec![Diagnostic::DuplicateMetadataColumns(names(&["subject_id"]))]
        );
        assert!(diagnostics[0].to_string().contains("subject_id"));
    }

    #[test]
    fn declared_columns_follow_metadata() {
        let declared = names(&["trial_id"]);
        let (set, diagnostics) = resolve_trial_columns(Some(declared.as_slice()), &names(&["subject_id"]));
        assert_eq!(set.into_vec(), names(&["subject_id", "trial_id"]));
        assert!(diagnostics.is_empty());
    }

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("time", DataType::Int64, true),
            Field::new("subject_id", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![0, 1])),
                Arc::new(Int64Array::from(vec![7, 7])),
            ],
        )
        .unwrap()
    }

    fn row() -> FileinfoRow {
        FileinfoRow::new(vec![
            ("filepath".into(), MetadataValue::String("1/a.csv".into())),
            ("subject_id".into(), MetadataValue::Integer(1)),
            ("session".into(), MetadataValue::String("3".into())),
        ])
    }

    #[test]
    fn injection_never_overwrites_existing_columns() {
        let out = add_fileinfo(&batch(), &row(), &SchemaOverrides::new()).unwrap();
        let schema = out.schema();
        let columns: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(columns, vec!["session", "time", "subject_id"]);

        let subject = out.column_by_name("subject_id").unwrap().as_primitive::<Int64Type>();
        assert_eq!(subject.values().to_vec(), vec![7, 7]);
    }

    #[test]
    fn overrides_cast_injected_columns() {
        let mut overrides = SchemaOverrides::new();
        overrides.insert("session".into(), ColumnType::Int64);
        let out = add_fileinfo(&batch(), &row(), &overrides).unwrap();
        let session = out.column_by_name("session").unwrap();
        assert_eq!(session.data_type(), &DataType::Int64);
        assert_eq!(session.as_primitive::<Int64Type>().value(1), 3);
    }

    #[test]
    fn failed_override_cast_is_an_error() {
        let row = FileinfoRow::new(vec![
            ("filepath".into(), MetadataValue::String("a.csv".into())),
            ("session".into(), MetadataValue::String("morning".into())),
        ]);
        let mut overrides = SchemaOverrides::new();
        overrides.insert("session".into(), ColumnType::Int64);
        assert!(add_fileinfo(&batch(), &row, &overrides).is_err());
    }

    #[test]
    fn filepath_is_never_injected() {
        let out = add_fileinfo(&batch(), &row(), &SchemaOverrides::new()).unwrap();
        assert!(out.column_by_name("filepath").is_none());
    }
}
