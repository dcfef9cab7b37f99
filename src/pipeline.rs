//! End-to-end composition: download, parse, aggregate, write.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::aggregate::{MalformedRowPolicy, aggregate};
use crate::error::EtlError;
use crate::fetch::{DEFAULT_DOWNLOAD_FILE, HttpClient, fetch};
use crate::output::{OutputPaths, save};
use crate::parser::read_rows;

pub const DEFAULT_SOURCE_URL: &str =
    "https://oleksandr-fedoruk.com/wp-content/uploads/2025/10/sample.csv";

/// Settings for a full download-and-transform run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub download_to: PathBuf,
    pub outputs: OutputPaths,
    pub policy: MalformedRowPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            download_to: PathBuf::from(DEFAULT_DOWNLOAD_FILE),
            outputs: OutputPaths::default(),
            policy: MalformedRowPolicy::default(),
        }
    }
}

/// Row counts reported after a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSummary {
    pub rows_written: usize,
    /// Malformed rows dropped under [`MalformedRowPolicy::Skip`].
    pub rows_skipped: usize,
}

/// Streams `input` through the aggregator into both output files.
///
/// # Errors
///
/// Returns an error if the input cannot be opened, an output cannot be
/// written, or (under [`MalformedRowPolicy::Fail`]) a row is malformed.
pub fn run_transform(
    input: impl AsRef<Path>,
    outputs: &OutputPaths,
    policy: MalformedRowPolicy,
) -> Result<TransformSummary, EtlError> {
    let input = input.as_ref();
    let mut records = aggregate(read_rows(input)?, policy);

    let rows_written = save(records.by_ref(), outputs)?;
    let summary = TransformSummary {
        rows_written,
        rows_skipped: records.skipped(),
    };

    info!(
        input = %input.display(),
        values = %outputs.values.display(),
        missing = %outputs.missing.display(),
        rows_written = summary.rows_written,
        rows_skipped = summary.rows_skipped,
        "Transform complete"
    );
    Ok(summary)
}

/// Downloads the source and transforms it.
///
/// Returns `Ok(None)` when the download failed; the failure has already been
/// logged and no output file has been touched.
pub async fn run<C: HttpClient>(
    client: &C,
    config: &RunConfig,
) -> Result<Option<TransformSummary>, EtlError> {
    let Some(input) = fetch(client, &config.url, &config.download_to).await else {
        return Ok(None);
    };

    run_transform(&input, &config.outputs, config.policy).map(Some)
}
