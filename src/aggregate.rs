//! Per-row aggregation: sum, average, and missing-value positions.

use clap::ValueEnum;
use tracing::warn;

use crate::error::EtlError;
use crate::parser::RawRow;

/// Value markers treated as "missing" after trimming.
const MISSING_SENTINELS: &[&str] = &["", "-"];

/// Aggregates computed from one retained input row.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub id: i64,
    pub sum: f64,
    pub average: f64,
    /// 1-based positions among the value columns (the id column is not counted).
    pub missing_indices: Vec<usize>,
    /// How many values went into `sum`.
    pub value_count: usize,
}

/// What to do with a row whose id or values cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MalformedRowPolicy {
    /// Stop at the first malformed row and report it.
    #[default]
    Fail,
    /// Log the row, drop it, and keep going.
    Skip,
}

/// True for an empty or `-` field, ignoring surrounding whitespace.
pub fn is_missing(value: &str) -> bool {
    MISSING_SENTINELS.contains(&value.trim())
}

fn average(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Aggregates a single row.
///
/// Returns `Ok(None)` for rows with no fields or a blank id; such rows produce
/// no output at all.
///
/// # Errors
///
/// Returns [`EtlError::MalformedRow`] if the id is not an integer or a
/// non-missing value is not a number.
pub fn aggregate_row(row: &RawRow) -> Result<Option<AggregateRecord>, EtlError> {
    let id_text = match row.id_field().map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return Ok(None),
    };

    let id: i64 = id_text
        .parse()
        .map_err(|e| EtlError::malformed(row.line, format!("invalid id {id_text:?}: {e}")))?;

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut missing_indices = Vec::new();

    for (i, value) in row.value_fields().enumerate() {
        let position = i + 1;
        if is_missing(value) {
            missing_indices.push(position);
            continue;
        }

        let value = value.trim();
        let number: f64 = value.parse().map_err(|e| {
            EtlError::malformed(
                row.line,
                format!("invalid value {value:?} in column {position}: {e}"),
            )
        })?;
        sum += number;
        count += 1;
    }

    Ok(Some(AggregateRecord {
        id,
        sum,
        average: average(sum, count),
        missing_indices,
        value_count: count,
    }))
}

/// Lazy adapter turning raw rows into aggregate records, in input order.
pub struct Aggregator<I> {
    rows: I,
    policy: MalformedRowPolicy,
    skipped: usize,
}

impl<I> Aggregator<I> {
    /// Number of malformed rows dropped so far under [`MalformedRowPolicy::Skip`].
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<I> Iterator for Aggregator<I>
where
    I: Iterator<Item = Result<RawRow, EtlError>>,
{
    type Item = Result<AggregateRecord, EtlError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };

            match aggregate_row(&row) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => match self.policy {
                    MalformedRowPolicy::Fail => return Some(Err(e)),
                    MalformedRowPolicy::Skip => {
                        warn!(error = %e, "Skipping malformed row");
                        self.skipped += 1;
                    }
                },
            }
        }
    }
}

/// Wraps a raw row sequence in an [`Aggregator`].
pub fn aggregate<I>(rows: I, policy: MalformedRowPolicy) -> Aggregator<I::IntoIter>
where
    I: IntoIterator<Item = Result<RawRow, EtlError>>,
{
    Aggregator {
        rows: rows.into_iter(),
        policy,
        skipped: 0,
    }
}
