/// On-disk table formats.
///
/// Loading dispatches on the file extension through [`FileFormat`]; each
/// variant has one reader. Writing goes through [`OutputFormat`].
pub mod asc;
pub mod delimited;
pub mod feather;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use arrow::record_batch::RecordBatch;

use crate::definition::ReadOptions;
use crate::error::{GazeError, Result};

/// Extensions gaze files can be loaded from.
pub const GAZE_EXTENSIONS: [&str; 5] = ["csv", "tsv", "txt", "feather", "asc"];
/// Extensions event files can be loaded from.
pub const EVENT_EXTENSIONS: [&str; 4] = ["csv", "txt", "tsv", "feather"];
/// Extensions precomputed event and reading measure files can be loaded from.
pub const PRECOMPUTED_EXTENSIONS: [&str; 3] = [".csv", ".tsv", ".txt"];
/// Formats tables can be saved as.
pub const OUTPUT_FORMATS: [&str; 2] = ["csv", "feather"];

// ---------------------------------------------------------------------------
// FileFormat – input dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.csv`, `.tsv`, `.txt`
    DelimitedText,
    /// `.feather` (Arrow IPC)
    ColumnarBinary,
    /// `.asc` tracker log
    AsciiLog,
}

impl FileFormat {
    /// Format for a bare extension (no leading dot), case-insensitive.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(FileFormat::DelimitedText),
            "feather" => Some(FileFormat::ColumnarBinary),
            "asc" => Some(FileFormat::AsciiLog),
            _ => None,
        }
    }

    /// Format of `path`, restricted to `supported`; anything else is an
    /// unsupported-format error naming the received suffix.
    pub fn for_path(path: &Path, supported: &[&'static str]) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let bare: Vec<&str> = supported.iter().map(|s| s.trim_start_matches('.')).collect();
        match Self::from_extension(extension) {
            Some(format) if bare.iter().any(|s| s.eq_ignore_ascii_case(extension)) => Ok(format),
            _ => Err(GazeError::unsupported(format!(".{extension}"), supported)),
        }
    }

    /// Read `path` as a plain table. ASCII logs yield their sample table.
    pub fn read_table(self, path: &Path, options: &ReadOptions) -> Result<RecordBatch> {
        match self {
            FileFormat::DelimitedText => delimited::read_delimited(path, options),
            FileFormat::ColumnarBinary => feather::read_feather(path),
            FileFormat::AsciiLog => asc::read_asc(path),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputFormat – save targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Feather,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Feather => "feather",
            OutputFormat::Csv => "csv",
        }
    }

    pub fn write(self, batch: &RecordBatch, path: &Path) -> Result<()> {
        match self {
            OutputFormat::Feather => feather::write_feather(batch, path),
            OutputFormat::Csv => delimited::write_delimited(batch, path),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = GazeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "feather" => Ok(OutputFormat::Feather),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(GazeError::unsupported(other, &OUTPUT_FORMATS)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
