/// Data layer: discovery, loading, metadata merge, persistence, and filtering.
///
/// Architecture:
/// ```text
///   raw/<pattern-matched files>
///        │
///        ▼
///   ┌──────────┐
///   │ pattern  │  filename pattern → FileRecord per matching file
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  scan    │  FileRecords → sorted, cast FileinfoTable per category
///   └──────────┘
///        │                         ┌──────────┐
///        ├────────────────────────▶│  filter  │  take_subset on the gaze table
///        ▼                         └──────────┘
///   ┌──────────┐   ┌──────────┐
///   │  loader  │──▶│  merge   │  parse file, inject fileinfo row, resolve trial columns
///   └──────────┘   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  frame   │  GazeFrame / EventFrame (normalized columns)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer  │  preprocessed/ and events/ mirroring raw/
///   └──────────┘
/// ```

pub mod filter;
pub mod frame;
pub mod loader;
pub mod merge;
pub mod model;
pub mod pattern;
pub mod scan;
pub mod writer;
