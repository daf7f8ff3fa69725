use std::path::{Path, PathBuf};

use log::info;

use super::model::{
    ColumnType, DataCategory, DatasetFileinfo, FileRecord, FileinfoColumn, FileinfoTable,
    MetadataValue, SchemaOverrides, FILEPATH_COLUMN,
};
use super::pattern::{match_filepaths, FilePattern};
use crate::definition::DatasetDefinition;
use crate::error::{GazeError, Result};
use crate::paths::DatasetPaths;

/// Scan every category the definition declares files for.
///
/// Categories with `has_files = false` are left out of the result.
pub fn scan_dataset(definition: &DatasetDefinition, paths: &DatasetPaths) -> Result<DatasetFileinfo> {
    let mut fileinfo = DatasetFileinfo::new();

    for category in DataCategory::ALL {
        let config = definition.category(category);
        if !config.has_files {
            continue;
        }

        let format = config.filename_format.as_deref().ok_or_else(|| {
            GazeError::Configuration(format!(
                "no filename format defined for category '{category}'"
            ))
        })?;
        let pattern = FilePattern::compile(format)?;
        let directory = category_directory(paths, category);

        let records = match_filepaths(&directory, &pattern, true)?;
        let table = build_fileinfo(records, &config.schema_overrides, &directory)?;
        info!("{category}: {} files in {}", table.len(), directory.display());
        fileinfo.insert(category, table);
    }

    Ok(fileinfo)
}

fn category_directory(paths: &DatasetPaths, category: DataCategory) -> PathBuf {
    match category {
        DataCategory::Gaze => paths.raw(),
        DataCategory::PrecomputedEvents => paths.precomputed_events(),
        DataCategory::PrecomputedReadingMeasures => paths.precomputed_reading_measures(),
    }
}

/// Turn matched records into a fileinfo table sorted by `filepath`.
///
/// Column types come from the first record, then `overrides` are cast on top.
/// `directory` only names the scanned location when no records were found.
pub fn build_fileinfo(
    records: Vec<FileRecord>,
    overrides: &SchemaOverrides,
    directory: &Path,
) -> Result<FileinfoTable> {
    let Some(first) = records.first() else {
        return Err(GazeError::Discovery {
            directory: directory.to_path_buf(),
        });
    };

    // Captured text is always a string until an override says otherwise.
    let mut columns = vec![FileinfoColumn {
        name: FILEPATH_COLUMN.to_string(),
        dtype: ColumnType::Utf8,
    }];
    columns.extend(first.fields.iter().map(|(name, _)| FileinfoColumn {
        name: name.clone(),
        dtype: ColumnType::Utf8,
    }));

    let rows = records
        .into_iter()
        .map(|record| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(MetadataValue::String(record.filepath));
            row.extend(
                record
                    .fields
                    .into_iter()
                    .map(|(_, value)| MetadataValue::String(value)),
            );
            row
        })
        .collect();

    let mut table = FileinfoTable::new(columns, rows)?;
    table.sort_by_filepath();
    for (column, dtype) in overrides {
        table.cast_column(column, *dtype)?;
    }
    Ok(table)
}
