use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::display::{ArrayFormatter, FormatOptions};

use crate::definition::ReadOptions;
use crate::error::{GazeError, Result};

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Separator used when the read options leave it unset.
pub fn default_separator(path: &Path) -> char {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => '\t',
        _ => ',',
    }
}

/// Read a delimited text file into a single batch.
///
/// Column types are inferred over all rows: integer, then float, then
/// boolean (`true`/`false`), falling back to text. Empty cells and
/// `options.null_values` become nulls.
pub fn read_delimited(path: &Path, options: &ReadOptions) -> Result<RecordBatch> {
    let separator = options.separator.unwrap_or_else(|| default_separator(path));
    let separator = u8::try_from(separator).map_err(|_| {
        GazeError::Configuration(format!("separator '{separator}' is not a single-byte character"))
    })?;
    let comment = options
        .comment_prefix
        .map(|c| {
            u8::try_from(c).map_err(|_| {
                GazeError::Configuration(format!("comment prefix '{c}' is not a single-byte character"))
            })
        })
        .transpose()?;

    let text = std::fs::read_to_string(path)?;
    let body: String = text
        .lines()
        .skip(options.skip_rows)
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(options.has_header)
        .comment(comment)
        .from_reader(body.as_bytes());

    let mut cells: Vec<Vec<Option<String>>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|err| GazeError::Parse {
            path: path.to_path_buf(),
            message: format!("row {row_no}: {err}"),
        })?;
        if cells.is_empty() {
            cells = vec![Vec::new(); record.len()];
        }
        for (col, value) in record.iter().enumerate() {
            let value = value.trim();
            let is_null = value.is_empty() || options.null_values.iter().any(|n| n == value);
            if let Some(column) = cells.get_mut(col) {
                column.push(if is_null { None } else { Some(value.to_string()) });
            }
        }
    }

    let headers: Vec<String> = if options.has_header {
        reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect()
    } else {
        (1..=cells.len()).map(|i| format!("column_{i}")).collect()
    };
    if cells.is_empty() {
        cells = vec![Vec::new(); headers.len()];
    }

    let n_rows = cells.first().map_or(0, |c| c.len());
    let mut fields = Vec::with_capacity(headers.len());
    let mut arrays = Vec::with_capacity(headers.len());
    for (name, values) in headers.iter().zip(cells) {
        let array = infer_column(&values);
        fields.push(Field::new(name, array.data_type().clone(), true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(n_rows));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        arrays,
        &options,
    )?)
}

fn infer_column(values: &[Option<String>]) -> ArrayRef {
    let present = || values.iter().flatten();

    if present().all(|s| s.parse::<i64>().is_ok()) && present().next().is_some() {
        return Arc::new(Int64Array::from(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse().ok()))
                .collect::<Vec<Option<i64>>>(),
        ));
    }
    if present().all(|s| s.parse::<f64>().is_ok()) && present().next().is_some() {
        return Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse().ok()))
                .collect::<Vec<Option<f64>>>(),
        ));
    }
    if present().all(|s| s == "true" || s == "false") && present().next().is_some() {
        return Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| v.as_deref().map(|s| s == "true"))
                .collect::<Vec<Option<bool>>>(),
        ));
    }
    Arc::new(StringArray::from(
        values.iter().map(|v| v.as_deref()).collect::<Vec<Option<&str>>>(),
    ))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Write a batch as comma-separated text with a header row.
///
/// Nulls are written as empty cells. Nested columns are written in their
/// display form (`[1.0, 2.0]`); unnest them first to keep them readable.
pub fn write_delimited(batch: &RecordBatch, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let schema = batch.schema();
    writer.write_record(schema.fields().iter().map(|f| f.name().as_str()))?;

    let options = FormatOptions::default();
    let formatters = batch
        .columns()
        .iter()
        .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for row in 0..batch.num_rows() {
        let record: Vec<String> = formatters
            .iter()
            .map(|f| f.value(row).to_string())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
