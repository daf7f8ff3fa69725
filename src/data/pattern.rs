use std::path::Path;

use log::{debug, warn};
use regex::Regex;
use walkdir::WalkDir;

use super::model::FileRecord;
use crate::error::{GazeError, Result};

// ---------------------------------------------------------------------------
// FilePattern – compiled `{placeholder}` pattern
// ---------------------------------------------------------------------------

/// A filename pattern such as `{subject_id:d}/trial_{trial}.csv`, compiled to an anchored regex.
///
/// * `{name}`   – one or more characters other than `/`
/// * `{name:d}` – one or more digits
///
/// Everything outside braces is matched literally, including `/`.
#[derive(Debug, Clone)]
pub struct FilePattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl FilePattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let malformed = |reason: String| {
            GazeError::Configuration(format!("malformed filename pattern '{pattern}': {reason}"))
        };

        let mut expr = String::from("^");
        let mut names: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();

                    let mut placeholder = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(malformed("nested '{'".to_string())),
                            other => placeholder.push(other),
                        }
                    }
                    if !closed {
                        return Err(malformed("unclosed '{'".to_string()));
                    }

                    let (name, spec) = match placeholder.split_once(':') {
                        Some((name, spec)) => (name, Some(spec)),
                        None => (placeholder.as_str(), None),
                    };
                    if !is_identifier(name) {
                        return Err(malformed(format!("invalid placeholder name '{name}'")));
                    }
                    if names.iter().any(|n| n == name) {
                        return Err(malformed(format!("duplicate placeholder '{name}'")));
                    }
                    let class = match spec {
                        None => "[^/]+?",
                        Some("d") => r"\d+",
                        Some(other) => {
                            return Err(malformed(format!(
                                "unknown format specifier '{other}' for '{name}'"
                            )))
                        }
                    };
                    expr.push_str(&format!("(?P<{name}>{class})"));
                    names.push(name.to_string());
                }
                '}' => return Err(malformed("unmatched '}'".to_string())),
                other => literal.push(other),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|err| malformed(err.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            names,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in pattern order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Match a `/`-separated relative path, returning the captured placeholder values.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .map(|name| {
                    let value = caps.name(name).map(|m| m.as_str()).unwrap_or_default();
                    (name.clone(), value.to_string())
                })
                .collect(),
        )
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Directory scan
// ---------------------------------------------------------------------------

/// Recursively collect every file under `root` whose relative path matches `pattern`.
///
/// Returns an empty vector when nothing matches, including when `root` does not exist.
/// With `relative = false` the records carry absolute paths.
pub fn match_filepaths(root: &Path, pattern: &FilePattern, relative: bool) -> Result<Vec<FileRecord>> {
    if !root.is_dir() {
        warn!("{} is not a directory, no files to match", root.display());
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative_path) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative_path: String = relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if let Some(fields) = pattern.captures(&relative_path) {
            let filepath = if relative {
                relative_path
            } else {
                entry.path().display().to_string()
            };
            records.push(FileRecord { filepath, fields });
        }
    }

    debug!(
        "{} files under {} match '{}'",
        records.len(),
        root.display(),
        pattern.as_str()
    );
    Ok(records)
}
