use std::path::Path;

use log::{debug, warn};

use super::frame::{EventFrame, GazeColumns, GazeFrame, PrecomputedEvents, ReadingMeasures, TimeUnit};
use super::merge::{add_fileinfo, resolve_trial_columns};
use super::model::{FileinfoRow, FileinfoTable};
use crate::definition::{DatasetDefinition, ReadOptions};
use crate::error::{GazeError, Result};
use crate::formats::asc::{ASC_PIXEL_COLUMNS, ASC_TIME_COLUMN};
use crate::formats::delimited::read_delimited;
use crate::formats::{
    FileFormat, EVENT_EXTENSIONS, GAZE_EXTENSIONS, PRECOMPUTED_EXTENSIONS,
};
use crate::paths::DatasetPaths;
use crate::progress::file_progress_bar;

// ---------------------------------------------------------------------------
// Gaze files
// ---------------------------------------------------------------------------

/// Options of [`load_gaze_files`].
#[derive(Debug, Clone, Copy)]
pub struct GazeLoadOptions<'a> {
    /// Load previously saved preprocessed files instead of the raw files.
    pub preprocessed: bool,
    /// One-time alternative to the `preprocessed` directory name.
    pub preprocessed_dirname: Option<&'a str>,
    /// Extension of the preprocessed files.
    pub extension: &'a str,
    pub show_progress: bool,
}

impl Default for GazeLoadOptions<'_> {
    fn default() -> Self {
        Self {
            preprocessed: false,
            preprocessed_dirname: None,
            extension: "feather",
            show_progress: true,
        }
    }
}

/// Load the gaze file of every fileinfo row, in row order.
///
/// The first failing file aborts the whole batch.
pub fn load_gaze_files(
    definition: &DatasetDefinition,
    fileinfo: &FileinfoTable,
    paths: &DatasetPaths,
    options: GazeLoadOptions<'_>,
) -> Result<Vec<GazeFrame>> {
    let pb = file_progress_bar(fileinfo.len(), options.show_progress);
    let mut gaze = Vec::with_capacity(fileinfo.len());

    for row in fileinfo.rows() {
        let mut filepath = paths.raw().join(row_filepath(&row)?);
        if options.preprocessed {
            filepath = paths.get_preprocessed_filepath(
                &filepath,
                options.preprocessed_dirname,
                options.extension,
            );
        }
        gaze.push(load_gaze_file(&filepath, &row, definition, options.preprocessed)?);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(gaze)
}

/// Load one gaze file and attach its fileinfo row.
///
/// Raw delimited files are read with the definition's read options and column
/// layout; preprocessed ones have their columns detected and times in
/// milliseconds. Feather files are taken as already normalized.
pub fn load_gaze_file(
    filepath: &Path,
    fileinfo_row: &FileinfoRow,
    definition: &DatasetDefinition,
    preprocessed: bool,
) -> Result<GazeFrame> {
    let (trial_columns, diagnostics) = resolve_trial_columns(
        definition.trial_columns.as_deref(),
        &fileinfo_row.field_names(),
    );
    for diagnostic in &diagnostics {
        warn!("{}: {diagnostic}", filepath.display());
    }

    let format = FileFormat::for_path(filepath, &GAZE_EXTENSIONS)?;
    let (read_options, columns) = match format {
        FileFormat::DelimitedText if preprocessed => (ReadOptions::default(), GazeColumns::detected()),
        FileFormat::DelimitedText => (definition.gaze.read_options.clone(), definition.gaze_columns()),
        FileFormat::ColumnarBinary => (ReadOptions::default(), GazeColumns::detected()),
        FileFormat::AsciiLog => (
            ReadOptions::default(),
            GazeColumns {
                time_column: Some(ASC_TIME_COLUMN.to_string()),
                time_unit: TimeUnit::Milliseconds,
                pixel_columns: Some(ASC_PIXEL_COLUMNS.iter().map(|c| c.to_string()).collect()),
                ..GazeColumns::default()
            },
        ),
    };

    debug!("loading {} as {format:?}", filepath.display());
    let batch = format.read_table(filepath, &read_options)?;
    let batch = add_fileinfo(&batch, fileinfo_row, &definition.gaze.schema_overrides)?;

    GazeFrame::new(
        batch,
        &columns,
        definition.experiment.clone(),
        trial_columns.into_vec(),
    )
}

// ---------------------------------------------------------------------------
// Event files
// ---------------------------------------------------------------------------

/// Load the saved event file of every fileinfo row from the events tree.
///
/// `events_dirname` replaces the `events` directory name for this call only.
pub fn load_event_files(
    definition: &DatasetDefinition,
    fileinfo: &FileinfoTable,
    paths: &DatasetPaths,
    events_dirname: Option<&str>,
    extension: &str,
) -> Result<Vec<EventFrame>> {
    let format = FileFormat::from_extension(extension)
        .filter(|_| EVENT_EXTENSIONS.contains(&extension))
        .ok_or_else(|| GazeError::unsupported(extension, &EVENT_EXTENSIONS))?;

    let pb = file_progress_bar(fileinfo.len(), true);
    let mut events = Vec::with_capacity(fileinfo.len());

    for row in fileinfo.rows() {
        let raw_filepath = paths.raw().join(row_filepath(&row)?);
        let filepath = paths.raw_to_event_filepath(&raw_filepath, events_dirname, extension);

        let batch = format.read_table(&filepath, &ReadOptions::default())?;
        let batch = add_fileinfo(&batch, &row, &definition.gaze.schema_overrides)?;
        events.push(EventFrame::new(batch)?);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(events)
}

// ---------------------------------------------------------------------------
// Precomputed files
// ---------------------------------------------------------------------------

pub fn load_precomputed_event_files(
    definition: &DatasetDefinition,
    fileinfo: &FileinfoTable,
    paths: &DatasetPaths,
) -> Result<Vec<PrecomputedEvents>> {
    let options = &definition.precomputed_events.read_options;
    fileinfo
        .rows()
        .map(|row| {
            let path = paths.precomputed_events().join(row_filepath(&row)?);
            load_precomputed_event_file(&path, options)
        })
        .collect()
}

pub fn load_precomputed_event_file(path: &Path, options: &ReadOptions) -> Result<PrecomputedEvents> {
    FileFormat::for_path(path, &PRECOMPUTED_EXTENSIONS)?;
    Ok(PrecomputedEvents {
        frame: read_delimited(path, options)?,
    })
}

pub fn load_precomputed_reading_measures(
    definition: &DatasetDefinition,
    fileinfo: &FileinfoTable,
    paths: &DatasetPaths,
) -> Result<Vec<ReadingMeasures>> {
    let options = &definition.precomputed_reading_measures.read_options;
    fileinfo
        .rows()
        .map(|row| {
            let path = paths.precomputed_reading_measures().join(row_filepath(&row)?);
            load_precomputed_reading_measure_file(&path, options)
        })
        .collect()
}

pub fn load_precomputed_reading_measure_file(
    path: &Path,
    options: &ReadOptions,
) -> Result<ReadingMeasures> {
    FileFormat::for_path(path, &PRECOMPUTED_EXTENSIONS)?;
    Ok(ReadingMeasures {
        frame: read_delimited(path, options)?,
    })
}

fn row_filepath(row: &FileinfoRow) -> Result<String> {
    row.filepath()
        .map(str::to_string)
        .ok_or_else(|| GazeError::Configuration("fileinfo row has no filepath".to_string()))
}
