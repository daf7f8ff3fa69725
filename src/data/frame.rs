use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Float64Builder, ListBuilder};
use arrow::compute::cast;
use arrow::compute::kernels::numeric::sub;
use arrow::datatypes::{DataType, Field, FieldRef, Float64Type, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde::{Deserialize, Serialize};

use crate::definition::Experiment;
use crate::error::{GazeError, Result};

/// Canonical names of normalized gaze columns.
pub const TIME_COLUMN: &str = "time";
pub const DISTANCE_COLUMN: &str = "distance";

/// Column suffixes of unnested components, by component count.
const SUFFIXES_2: [&str; 2] = ["_x", "_y"];
const SUFFIXES_4: [&str; 4] = ["_xl", "_yl", "_xr", "_yr"];
const SUFFIXES_6: [&str; 6] = ["_xl", "_yl", "_xr", "_yr", "_xa", "_ya"];

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
    /// Sample index; converted with the experiment's sampling rate.
    #[serde(rename = "step")]
    Step,
}

/// Which input columns hold which gaze signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeColumns {
    pub time_column: Option<String>,
    pub time_unit: TimeUnit,
    pub pixel_columns: Option<Vec<String>>,
    pub position_columns: Option<Vec<String>>,
    pub velocity_columns: Option<Vec<String>>,
    pub acceleration_columns: Option<Vec<String>>,
    pub distance_column: Option<String>,
    /// Find `time` and `<component>_x`/`_y` style columns when not declared.
    pub auto_column_detect: bool,
}

impl GazeColumns {
    /// Layout of previously saved files: detected columns, times in milliseconds.
    pub fn detected() -> Self {
        Self {
            auto_column_detect: true,
            ..Self::default()
        }
    }

    fn declared_components(&self) -> [(&'static str, Option<&Vec<String>>); 4] {
        [
            ("pixel", self.pixel_columns.as_ref()),
            ("position", self.position_columns.as_ref()),
            ("velocity", self.velocity_columns.as_ref()),
            ("acceleration", self.acceleration_columns.as_ref()),
        ]
    }
}

// ---------------------------------------------------------------------------
// GazeFrame
// ---------------------------------------------------------------------------

/// One file's gaze samples in normalized form.
///
/// * `time` in milliseconds
/// * `pixel`, `position`, `velocity`, `acceleration` as list columns
/// * `distance` when a per-sample distance column is declared
#[derive(Debug, Clone, PartialEq)]
pub struct GazeFrame {
    pub frame: RecordBatch,
    pub experiment: Option<Experiment>,
    pub trial_columns: Vec<String>,
}

impl GazeFrame {
    pub fn new(
        batch: RecordBatch,
        columns: &GazeColumns,
        experiment: Option<Experiment>,
        trial_columns: Vec<String>,
    ) -> Result<Self> {
        let mut set = ColumnSet::from_batch(&batch);

        if let Some(missing) = trial_columns.iter().find(|c| set.index(c).is_none()) {
            return Err(GazeError::Configuration(format!(
                "trial column '{missing}' not found. Available columns are: {:?}",
                set.names()
            )));
        }

        // Time
        let time_column = match (&columns.time_column, columns.auto_column_detect) {
            (Some(name), _) => Some(name.clone()),
            (None, true) if set.index(TIME_COLUMN).is_some() => Some(TIME_COLUMN.to_string()),
            _ => None,
        };
        if let Some(name) = time_column {
            let array = set.get(&name).ok_or_else(|| {
                GazeError::Configuration(format!("time column '{name}' not found"))
            })?;
            let converted = time_to_milliseconds(&array, columns.time_unit, experiment.as_ref())?;
            set.replace(&name, converted);
            set.rename(&name, TIME_COLUMN)?;
        }

        // Components
        for (target, declared) in columns.declared_components() {
            let sources: Option<Vec<String>> = match declared {
                Some(cols) => Some(cols.clone()),
                None if columns.auto_column_detect => detect_components(&set, target),
                None => None,
            };
            if let Some(sources) = sources {
                set.nest(&sources, target)?;
            }
        }

        if let Some(name) = &columns.distance_column {
            if set.index(name).is_none() {
                return Err(GazeError::Configuration(format!(
                    "distance column '{name}' not found"
                )));
            }
            set.rename(name, DISTANCE_COLUMN)?;
        }

        Ok(Self {
            frame: set.into_batch()?,
            experiment,
            trial_columns,
        })
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn num_rows(&self) -> usize {
        self.frame.num_rows()
    }

    /// Number of components of a nested column (2 for monocular x/y).
    pub fn n_components(&self, column: &str) -> Option<usize> {
        let array = self.frame.column_by_name(column)?;
        list_width(array)
    }

    /// Split every list column into one scalar column per component.
    pub fn unnest(&self) -> Result<GazeFrame> {
        let mut set = ColumnSet::from_batch(&self.frame);
        let nested: Vec<String> = set
            .fields
            .iter()
            .filter(|f| is_list(f.data_type()))
            .map(|f| f.name().clone())
            .collect();
        for name in nested {
            set.unnest(&name)?;
        }
        Ok(GazeFrame {
            frame: set.into_batch()?,
            experiment: self.experiment.clone(),
            trial_columns: self.trial_columns.clone(),
        })
    }

    /// A copy without the named columns; names not present are ignored.
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<GazeFrame> {
        let frame = drop_columns(&self.frame, names)?;
        let trial_columns = self
            .trial_columns
            .iter()
            .filter(|c| !names.iter().any(|n| n.as_ref() == c.as_str()))
            .cloned()
            .collect();
        Ok(GazeFrame {
            frame,
            experiment: self.experiment.clone(),
            trial_columns,
        })
    }
}

// ---------------------------------------------------------------------------
// Event tables
// ---------------------------------------------------------------------------

/// Detected events of one file (`name`, `onset`, `offset`, `duration`, …).
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub frame: RecordBatch,
}

impl EventFrame {
    /// Wrap an event table, deriving `duration = offset - onset` when it is missing.
    pub fn new(batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let has = |name: &str| schema.index_of(name).is_ok();
        if has("duration") || !has("onset") || !has("offset") {
            return Ok(Self { frame: batch });
        }

        let mut set = ColumnSet::from_batch(&batch);
        let (Some(onset), Some(offset)) = (set.get("onset"), set.get("offset")) else {
            return Ok(Self { frame: batch });
        };
        let duration = sub(&offset, &onset)?;
        set.push("duration", duration);
        Ok(Self {
            frame: set.into_batch()?,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.frame.num_rows()
    }
}

/// Events shipped with a dataset, as published.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedEvents {
    pub frame: RecordBatch,
}

/// Reading measures shipped with a dataset, as published.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingMeasures {
    pub frame: RecordBatch,
}

// ---------------------------------------------------------------------------
// Batch helpers
// ---------------------------------------------------------------------------

/// A copy of `batch` without the named columns; names not present are ignored.
pub fn drop_columns<S: AsRef<str>>(batch: &RecordBatch, names: &[S]) -> Result<RecordBatch> {
    let mut set = ColumnSet::from_batch(batch);
    for name in names {
        set.remove(name.as_ref());
    }
    set.into_batch()
}

fn is_list(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _)
    )
}

fn float_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Float64, true)))
}

/// Width of the first non-null entry of a list column.
fn list_width(array: &ArrayRef) -> Option<usize> {
    if !is_list(array.data_type()) {
        return None;
    }
    let list = cast(array, &float_list_type()).ok()?;
    let list = list.as_list::<i32>();
    (0..list.len())
        .find(|&row| list.is_valid(row))
        .map(|row| list.value_length(row) as usize)
}

fn time_to_milliseconds(
    array: &ArrayRef,
    unit: TimeUnit,
    experiment: Option<&Experiment>,
) -> Result<ArrayRef> {
    let factor = match unit {
        TimeUnit::Milliseconds => return Ok(array.clone()),
        TimeUnit::Seconds => 1000.0,
        TimeUnit::Step => {
            let experiment = experiment.ok_or_else(|| {
                GazeError::Configuration(
                    "time unit 'step' requires an experiment with a sampling rate".to_string(),
                )
            })?;
            if experiment.sampling_rate <= 0.0 {
                return Err(GazeError::Configuration(format!(
                    "invalid sampling rate {}",
                    experiment.sampling_rate
                )));
            }
            1000.0 / experiment.sampling_rate
        }
    };
    let float = cast(array, &DataType::Float64)?;
    let scaled: Float64Array = float
        .as_primitive::<Float64Type>()
        .unary::<_, Float64Type>(|v| v * factor);
    Ok(Arc::new(scaled))
}

fn component_suffixes(n: usize) -> Vec<String> {
    match n {
        2 => SUFFIXES_2.iter().map(|s| s.to_string()).collect(),
        4 => SUFFIXES_4.iter().map(|s| s.to_string()).collect(),
        6 => SUFFIXES_6.iter().map(|s| s.to_string()).collect(),
        _ => (0..n).map(|i| format!("_{i}")).collect(),
    }
}

fn detect_components(set: &ColumnSet, target: &str) -> Option<Vec<String>> {
    [6, 4, 2].into_iter().find_map(|n| {
        let names: Vec<String> = component_suffixes(n)
            .into_iter()
            .map(|suffix| format!("{target}{suffix}"))
            .collect();
        names.iter().all(|name| set.index(name).is_some()).then_some(names)
    })
}

// ---------------------------------------------------------------------------
// ColumnSet – mutable working copy of a batch's columns
// ---------------------------------------------------------------------------

struct ColumnSet {
    fields: Vec<FieldRef>,
    arrays: Vec<ArrayRef>,
    num_rows: usize,
}

impl ColumnSet {
    fn from_batch(batch: &RecordBatch) -> Self {
        Self {
            fields: batch.schema().fields().iter().cloned().collect(),
            arrays: batch.columns().to_vec(),
            num_rows: batch.num_rows(),
        }
    }

    fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name().as_str()).collect()
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    fn get(&self, name: &str) -> Option<ArrayRef> {
        self.index(name).map(|i| self.arrays[i].clone())
    }

    fn remove(&mut self, name: &str) -> Option<(usize, ArrayRef)> {
        let i = self.index(name)?;
        self.fields.remove(i);
        Some((i, self.arrays.remove(i)))
    }

    fn insert(&mut self, at: usize, name: &str, array: ArrayRef) {
        let field = Field::new(name, array.data_type().clone(), true);
        self.fields.insert(at, Arc::new(field));
        self.arrays.insert(at, array);
    }

    fn push(&mut self, name: &str, array: ArrayRef) {
        let at = self.fields.len();
        self.insert(at, name, array);
    }

    fn replace(&mut self, name: &str, array: ArrayRef) {
        if let Some((at, _)) = self.remove(name) {
            self.insert(at, name, array);
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.index(to).is_some() {
            return Err(GazeError::Configuration(format!(
                "cannot rename column '{from}' to '{to}': column already exists"
            )));
        }
        if let Some((at, array)) = self.remove(from) {
            self.insert(at, to, array);
        }
        Ok(())
    }

    /// Replace `sources` by one list column `target` at the position of the first source.
    fn nest(&mut self, sources: &[String], target: &str) -> Result<()> {
        if sources.is_empty() {
            return Ok(());
        }
        let mut position = usize::MAX;
        let mut components = Vec::with_capacity(sources.len());
        for name in sources {
            let (at, array) = self.remove(name).ok_or_else(|| {
                GazeError::Configuration(format!(
                    "{target} column '{name}' not found. Available columns are: {:?}",
                    self.names()
                ))
            })?;
            position = position.min(at);
            components.push(cast(&array, &DataType::Float64)?);
        }
        if self.index(target).is_some() {
            return Err(GazeError::Configuration(format!(
                "cannot nest {sources:?} into '{target}': column already exists"
            )));
        }

        let components: Vec<&Float64Array> =
            components.iter().map(|a| a.as_primitive::<Float64Type>()).collect();
        let mut builder = ListBuilder::with_capacity(
            Float64Builder::with_capacity(self.num_rows * components.len()),
            self.num_rows,
        );
        for row in 0..self.num_rows {
            for component in &components {
                builder
                    .values()
                    .append_option(component.is_valid(row).then(|| component.value(row)));
            }
            builder.append(true);
        }
        self.insert(position, target, Arc::new(builder.finish()));
        Ok(())
    }

    /// Replace list column `name` by `<name>_x`, `<name>_y`, … at the same position.
    fn unnest(&mut self, name: &str) -> Result<()> {
        let Some(array) = self.get(name) else {
            return Ok(());
        };
        // no non-empty row to measure: assume an (x, y) pair
        let width = list_width(&array).filter(|&w| w > 0).unwrap_or(2);
        let list = cast(&array, &float_list_type())?;
        let list = list.as_list::<i32>();
        let values = list.values().as_primitive::<Float64Type>();
        let offsets = list.value_offsets();

        let Some((position, _)) = self.remove(name) else {
            return Ok(());
        };
        for (k, suffix) in component_suffixes(width).into_iter().enumerate() {
            let column: Float64Array = (0..list.len())
                .map(|row| {
                    let start = offsets[row] as usize + k;
                    let end = offsets[row + 1] as usize;
                    (list.is_valid(row) && start < end && values.is_valid(start))
                        .then(|| values.value(start))
                })
                .collect();
            self.insert(position + k, &format!("{name}{suffix}"), Arc::new(column));
        }
        Ok(())
    }

    fn into_batch(self) -> Result<RecordBatch> {
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(self.fields)),
            self.arrays,
            &options,
        )?)
    }
}
