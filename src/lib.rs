//! Discover, load, normalize and persist eye-tracking datasets.
//!
//! A dataset lives under one directory with a `raw/` tree of recordings whose
//! filenames carry metadata (`{subject_id:d}_{session}.csv`). Scanning turns
//! the matching files into fileinfo tables, loading parses each file into a
//! normalized [`GazeFrame`](data::frame::GazeFrame) tagged with its metadata,
//! and saving writes processed tables into `preprocessed/` or `events/` trees
//! that mirror `raw/`.

pub mod data;
pub mod definition;
pub mod error;
pub mod formats;
pub mod paths;

mod progress;

pub use data::filter::{subset_from_json, take_subset, Subset, SubsetValue};
pub use data::frame::{EventFrame, GazeColumns, GazeFrame, TimeUnit};
pub use data::loader::{
    load_event_files, load_gaze_file, load_gaze_files, load_precomputed_event_files,
    load_precomputed_reading_measures, GazeLoadOptions,
};
pub use data::merge::{add_fileinfo, resolve_trial_columns, Diagnostic};
pub use data::model::{DataCategory, DatasetFileinfo, FileinfoRow, FileinfoTable, MetadataValue};
pub use data::scan::scan_dataset;
pub use data::writer::{save_events, save_preprocessed};
pub use definition::DatasetDefinition;
pub use error::{GazeError, Result};
pub use paths::DatasetPaths;
