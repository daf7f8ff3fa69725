//! Directory layout of a dataset on disk.
//!
//! ```text
//!  <root>/<dataset>/
//!        ├── raw/                            gaze files matched by the filename pattern
//!        ├── preprocessed/                   mirrors raw/, one file per raw file
//!        ├── events/                         mirrors raw/, one file per raw file
//!        ├── precomputed_events/
//!        └── precomputed_reading_measures/
//! ```

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    dataset: PathBuf,
    raw_dirname: String,
    preprocessed_dirname: String,
    events_dirname: String,
    precomputed_events_dirname: String,
    precomputed_reading_measures_dirname: String,
}

impl DatasetPaths {
    /// Layout under `root/dataset_dirname`. A `dataset_dirname` of `"."` uses `root` itself.
    pub fn new(root: impl Into<PathBuf>, dataset_dirname: &str) -> Self {
        let root = root.into();
        let dataset = if dataset_dirname == "." {
            root
        } else {
            root.join(dataset_dirname)
        };
        Self {
            dataset,
            raw_dirname: "raw".to_string(),
            preprocessed_dirname: "preprocessed".to_string(),
            events_dirname: "events".to_string(),
            precomputed_events_dirname: "precomputed_events".to_string(),
            precomputed_reading_measures_dirname: "precomputed_reading_measures".to_string(),
        }
    }

    pub fn with_raw_dirname(mut self, name: impl Into<String>) -> Self {
        self.raw_dirname = name.into();
        self
    }

    pub fn with_preprocessed_dirname(mut self, name: impl Into<String>) -> Self {
        self.preprocessed_dirname = name.into();
        self
    }

    pub fn with_events_dirname(mut self, name: impl Into<String>) -> Self {
        self.events_dirname = name.into();
        self
    }

    pub fn with_precomputed_events_dirname(mut self, name: impl Into<String>) -> Self {
        self.precomputed_events_dirname = name.into();
        self
    }

    pub fn with_precomputed_reading_measures_dirname(mut self, name: impl Into<String>) -> Self {
        self.precomputed_reading_measures_dirname = name.into();
        self
    }

    pub fn dataset(&self) -> &Path {
        &self.dataset
    }

    pub fn raw(&self) -> PathBuf {
        self.dataset.join(&self.raw_dirname)
    }

    pub fn preprocessed(&self) -> PathBuf {
        self.dataset.join(&self.preprocessed_dirname)
    }

    pub fn events(&self) -> PathBuf {
        self.dataset.join(&self.events_dirname)
    }

    pub fn precomputed_events(&self) -> PathBuf {
        self.dataset.join(&self.precomputed_events_dirname)
    }

    pub fn precomputed_reading_measures(&self) -> PathBuf {
        self.dataset.join(&self.precomputed_reading_measures_dirname)
    }

    /// Map a raw file into the events tree, swapping its extension.
    ///
    /// `events_dirname` replaces the configured directory name for this call only.
    pub fn raw_to_event_filepath(
        &self,
        raw_filepath: &Path,
        events_dirname: Option<&str>,
        extension: &str,
    ) -> PathBuf {
        let root = match events_dirname {
            Some(name) => self.dataset.join(name),
            None => self.events(),
        };
        self.mirror_raw_filepath(raw_filepath, &root, extension)
    }

    /// Map a raw file into the preprocessed tree, swapping its extension.
    ///
    /// `preprocessed_dirname` replaces the configured directory name for this call only.
    pub fn get_preprocessed_filepath(
        &self,
        raw_filepath: &Path,
        preprocessed_dirname: Option<&str>,
        extension: &str,
    ) -> PathBuf {
        let root = match preprocessed_dirname {
            Some(name) => self.dataset.join(name),
            None => self.preprocessed(),
        };
        self.mirror_raw_filepath(raw_filepath, &root, extension)
    }

    fn mirror_raw_filepath(&self, raw_filepath: &Path, target_root: &Path, extension: &str) -> PathBuf {
        let raw_root = self.raw();
        // Paths outside raw/ are taken as already relative to it.
        let relative = raw_filepath.strip_prefix(&raw_root).unwrap_or(raw_filepath);
        target_root.join(relative).with_extension(extension)
    }
}
