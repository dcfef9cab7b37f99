//! Persistence of aggregate records as the values and missing-values CSVs.

use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::AggregateRecord;
use crate::error::EtlError;
use crate::timing::timed;

pub const DEFAULT_VALUES_FILE: &str = "values.csv";
pub const DEFAULT_MISSING_FILE: &str = "missing_values.csv";

const VALUES_HEADER: [&str; 3] = ["id", "sum", "avg"];
const MISSING_HEADER: [&str; 2] = ["id", "missing_indices"];

/// Destination paths for the two output files.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub values: PathBuf,
    pub missing: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            values: PathBuf::from(DEFAULT_VALUES_FILE),
            missing: PathBuf::from(DEFAULT_MISSING_FILE),
        }
    }
}

#[derive(Serialize)]
struct ValuesRow {
    id: i64,
    sum: String,
    avg: String,
}

#[derive(Serialize)]
struct MissingRow {
    id: i64,
    missing_indices: String,
}

/// Shortest round-trip text, switching to `1e+16` / `1e-05` style exponents
/// below 1e-4 and from 1e16 upwards.
fn format_number(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{v:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format!("{v:?}");
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();

    if v == 0.0 || (-4..16).contains(&exponent) {
        // Debug keeps a trailing `.0` on whole numbers.
        format!("{v:?}")
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

fn values_row(record: &AggregateRecord) -> ValuesRow {
    // A row without numbers has nothing to average; both columns read `0`.
    let (sum, avg) = if record.value_count == 0 {
        ("0".to_string(), "0".to_string())
    } else {
        (format_number(record.sum), format_number(record.average))
    };
    ValuesRow {
        id: record.id,
        sum,
        avg,
    }
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn create_writer(path: &Path) -> Result<Writer<std::fs::File>, EtlError> {
    Ok(WriterBuilder::new().has_headers(false).from_path(path)?)
}

/// Writes every record to both output files in lockstep, returning the row count.
///
/// Both files are truncated first and always receive their header row, so an
/// empty record sequence still yields two header-only files.
///
/// # Errors
///
/// Fails on the first I/O or CSV error, or on the first error item in
/// `records`. Rows written before the failure stay on disk.
pub fn write_outputs<I>(records: I, paths: &OutputPaths) -> Result<usize, EtlError>
where
    I: IntoIterator<Item = Result<AggregateRecord, EtlError>>,
{
    debug!(
        values = %paths.values.display(),
        missing = %paths.missing.display(),
        "Opening output files"
    );

    let mut values = create_writer(&paths.values)?;
    let mut missing = create_writer(&paths.missing)?;

    values.write_record(VALUES_HEADER)?;
    missing.write_record(MISSING_HEADER)?;

    let mut rows = 0;
    for record in records {
        let record = record?;

        values.serialize(values_row(&record))?;
        missing.serialize(MissingRow {
            id: record.id,
            missing_indices: join_indices(&record.missing_indices),
        })?;

        rows += 1;
    }

    values.flush()?;
    missing.flush()?;

    Ok(rows)
}

/// [`write_outputs`] wrapped with start/end/elapsed timing logs.
pub fn save<I>(records: I, paths: &OutputPaths) -> Result<usize, EtlError>
where
    I: IntoIterator<Item = Result<AggregateRecord, EtlError>>,
{
    timed("save", || write_outputs(records, paths))
}
