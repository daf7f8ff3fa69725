//! Dataset definition: the read-only configuration a dataset is scanned,
//! loaded and saved with.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::frame::{GazeColumns, TimeUnit};
use crate::data::model::{DataCategory, SchemaOverrides};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Read options for delimited text
// ---------------------------------------------------------------------------

/// Options forwarded to the delimited-text parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Field separator. When unset, `.tsv` files use a tab and everything else a comma.
    pub separator: Option<char>,
    pub has_header: bool,
    /// Lines skipped before the header.
    pub skip_rows: usize,
    /// Lines starting with this character are ignored.
    pub comment_prefix: Option<char>,
    /// Cell values read as null, in addition to the empty string.
    pub null_values: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            separator: None,
            has_header: true,
            skip_rows: 0,
            comment_prefix: None,
            null_values: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-category configuration
// ---------------------------------------------------------------------------

/// How files of one category are found and read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub has_files: bool,
    /// Relative path pattern with `{name}` placeholders, e.g. `{subject_id:d}/{session}.csv`.
    pub filename_format: Option<String>,
    /// Types for placeholder columns; also applied to the metadata columns injected into loaded frames.
    pub schema_overrides: SchemaOverrides,
    pub read_options: ReadOptions,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            has_files: true,
            filename_format: None,
            schema_overrides: SchemaOverrides::new(),
            read_options: ReadOptions::default(),
        }
    }
}

impl CategoryConfig {
    /// A category the dataset has no files for.
    pub fn absent() -> Self {
        Self {
            has_files: false,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Experiment
// ---------------------------------------------------------------------------

/// Screen geometry and recording setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub screen_width_px: u32,
    pub screen_height_px: u32,
    pub screen_width_cm: f64,
    pub screen_height_cm: f64,
    /// Eye-to-screen distance. `None` when recorded per sample.
    #[serde(default)]
    pub distance_cm: Option<f64>,
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Samples per second.
    pub sampling_rate: f64,
}

fn default_origin() -> String {
    "upper left".to_string()
}

// ---------------------------------------------------------------------------
// DatasetDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetDefinition {
    pub name: String,
    pub gaze: CategoryConfig,
    pub precomputed_events: CategoryConfig,
    pub precomputed_reading_measures: CategoryConfig,

    /// User-declared trial columns; merged with the filename metadata on load.
    pub trial_columns: Option<Vec<String>>,

    pub time_column: Option<String>,
    pub time_unit: TimeUnit,
    pub pixel_columns: Option<Vec<String>>,
    pub position_columns: Option<Vec<String>>,
    pub velocity_columns: Option<Vec<String>>,
    pub acceleration_columns: Option<Vec<String>>,
    pub distance_column: Option<String>,

    pub experiment: Option<Experiment>,
}

impl Default for DatasetDefinition {
    fn default() -> Self {
        Self {
            name: "dataset".to_string(),
            gaze: CategoryConfig::default(),
            precomputed_events: CategoryConfig::absent(),
            precomputed_reading_measures: CategoryConfig::absent(),
            trial_columns: None,
            time_column: None,
            time_unit: TimeUnit::default(),
            pixel_columns: None,
            position_columns: None,
            velocity_columns: None,
            acceleration_columns: None,
            distance_column: None,
            experiment: None,
        }
    }
}

impl DatasetDefinition {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn category(&self, category: DataCategory) -> &CategoryConfig {
        match category {
            DataCategory::Gaze => &self.gaze,
            DataCategory::PrecomputedEvents => &self.precomputed_events,
            DataCategory::PrecomputedReadingMeasures => &self.precomputed_reading_measures,
        }
    }

    /// The declared gaze column layout of raw files.
    pub fn gaze_columns(&self) -> GazeColumns {
        GazeColumns {
            time_column: self.time_column.clone(),
            time_unit: self.time_unit,
            pixel_columns: self.pixel_columns.clone(),
            position_columns: self.position_columns.clone(),
            velocity_columns: self.velocity_columns.clone(),
            acceleration_columns: self.acceleration_columns.clone(),
            distance_column: self.distance_column.clone(),
            auto_column_detect: false,
        }
    }
}
