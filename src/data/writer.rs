use std::fs;
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use log::debug;

use super::frame::{drop_columns, EventFrame, GazeFrame};
use super::model::FileinfoTable;
use crate::error::{GazeError, Result};
use crate::formats::OutputFormat;
use crate::paths::DatasetPaths;
use crate::progress::file_progress_bar;

/// Save one event table per fileinfo row into the events tree.
///
/// `events[i]` belongs to row `i`. Fileinfo columns are dropped before
/// writing. `verbose`: 0 silent, 1 progress bar, 2 also each destination.
pub fn save_events(
    events: &[EventFrame],
    fileinfo: &FileinfoTable,
    paths: &DatasetPaths,
    events_dirname: Option<&str>,
    verbose: u8,
    extension: &str,
) -> Result<()> {
    let format: OutputFormat = extension.parse()?;
    let drop = fileinfo.column_names();

    save_all(events.len(), fileinfo, format, verbose, |i, raw_filepath| {
        let destination =
            paths.raw_to_event_filepath(raw_filepath, events_dirname, format.extension());
        let batch = drop_columns(&events[i].frame, drop.as_slice())?;
        Ok((destination, batch))
    })
}

/// Save one gaze table per fileinfo row into the preprocessed tree.
///
/// Same layout rules as [`save_events`]; for `csv` the nested component
/// columns are split into scalar columns first.
pub fn save_preprocessed(
    gaze: &[GazeFrame],
    fileinfo: &FileinfoTable,
    paths: &DatasetPaths,
    preprocessed_dirname: Option<&str>,
    verbose: u8,
    extension: &str,
) -> Result<()> {
    let format: OutputFormat = extension.parse()?;
    let drop = fileinfo.column_names();

    save_all(gaze.len(), fileinfo, format, verbose, |i, raw_filepath| {
        let destination =
            paths.get_preprocessed_filepath(raw_filepath, preprocessed_dirname, format.extension());
        let mut frame = gaze[i].drop_columns(drop.as_slice())?;
        if format == OutputFormat::Csv {
            frame = frame.unnest()?;
        }
        Ok((destination, frame.frame))
    })
}

fn save_all<F>(
    count: usize,
    fileinfo: &FileinfoTable,
    format: OutputFormat,
    verbose: u8,
    mut prepare: F,
) -> Result<()>
where
    F: FnMut(usize, &Path) -> Result<(PathBuf, RecordBatch)>,
{
    if count != fileinfo.len() {
        return Err(GazeError::Configuration(format!(
            "got {count} tables for {} fileinfo rows",
            fileinfo.len()
        )));
    }

    let pb = file_progress_bar(count, verbose >= 1);
    for i in 0..count {
        let filepath = fileinfo.filepath(i).ok_or_else(|| {
            GazeError::Configuration(format!("fileinfo row {i} has no filepath"))
        })?;
        let (destination, batch) = prepare(i, Path::new(filepath))?;

        if verbose >= 2 {
            // println! rather than pb.println: a hidden bar swallows the latter
            pb.suspend(|| println!("Save file to {}", destination.display()));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("writing {} rows to {}", batch.num_rows(), destination.display());
        format.write(&batch, &destination)?;
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(())
}
