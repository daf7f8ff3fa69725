use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{GazeError, Result};

/// Column names of the sample table read from an ASCII tracker log.
pub const ASC_TIME_COLUMN: &str = "time";
pub const ASC_PIXEL_COLUMNS: [&str; 2] = ["x_pix", "y_pix"];
pub const ASC_PUPIL_COLUMN: &str = "pupil";

/// Parse the sample lines of an EyeLink-style `.asc` file into
/// `time` (ms), `x_pix`, `y_pix` and `pupil`.
///
/// Sample lines start with a timestamp followed by x, y and pupil size;
/// a `.` marks a missing value (blinks). Messages, events and header
/// lines are skipped. `time` is Int64 when every stamp is a whole
/// millisecond and Float64 otherwise (recordings above 1000 Hz).
pub fn read_asc(path: &Path) -> Result<RecordBatch> {
    let text = std::fs::read_to_string(path)?;
    let parse_error = |line_no: usize, message: String| GazeError::Parse {
        path: path.to_path_buf(),
        message: format!("line {}: {message}", line_no + 1),
    };

    let mut time: Vec<f64> = Vec::new();
    let mut x: Vec<Option<f64>> = Vec::new();
    let mut y: Vec<Option<f64>> = Vec::new();
    let mut pupil: Vec<Option<f64>> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        // headers, messages and events; `SAMPLES ... RATE` is left to the definition
        if !first.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        let t: f64 = first
            .parse()
            .map_err(|_| parse_error(line_no, format!("invalid timestamp '{first}'")))?;
        let mut value = |name: &str| -> Result<Option<f64>> {
            match tokens.next() {
                None | Some(".") => Ok(None),
                Some(token) => token
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| parse_error(line_no, format!("invalid {name} '{token}'"))),
            }
        };
        let sx = value("x")?;
        let sy = value("y")?;
        let sp = value("pupil")?;

        time.push(t);
        x.push(sx);
        y.push(sy);
        pupil.push(sp);
    }

    debug!("{}: {} samples", path.display(), time.len());

    let time: ArrayRef = if time.iter().all(|t| t.fract() == 0.0) {
        Arc::new(time.into_iter().map(|t| t as i64).collect::<Int64Array>())
    } else {
        Arc::new(Float64Array::from(time))
    };
    let schema = Arc::new(Schema::new(vec![
        Field::new(ASC_TIME_COLUMN, time.data_type().clone(), false),
        Field::new(ASC_PIXEL_COLUMNS[0], DataType::Float64, true),
        Field::new(ASC_PIXEL_COLUMNS[1], DataType::Float64, true),
        Field::new(ASC_PUPIL_COLUMN, DataType::Float64, true),
    ]));
    Ok(RecordBatch::try_new(
        schema,
        vec![
            time,
            Arc::new(Float64Array::from(x)),
            Arc::new(Float64Array::from(y)),
            Arc::new(Float64Array::from(pupil)),
        ],
    )?)
}
