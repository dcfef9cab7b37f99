//! Streaming CSV row reader.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use tracing::debug;

use crate::error::EtlError;

/// One CSV record as read from disk, before any type conversion.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number where the record starts.
    pub line: u64,
    pub fields: StringRecord,
}

impl RawRow {
    /// The id column, if the row has any fields at all.
    pub fn id_field(&self) -> Option<&str> {
        self.fields.get(0)
    }

    /// All columns after the id, in file order.
    pub fn value_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().skip(1)
    }
}

/// Lazy, single-pass sequence of [`RawRow`]s backed by an open file.
///
/// The file handle lives inside the iterator and is closed when the iterator
/// is dropped, whether or not it was read to the end.
pub struct Rows {
    records: StringRecordsIntoIter<File>,
    header_pending: bool,
}

impl Iterator for Rows {
    type Item = Result<RawRow, EtlError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            // The reader never yields blank lines, so a first record past line 1
            // means line 1 was an empty header.
            if std::mem::take(&mut self.header_pending) && line == 1 {
                continue;
            }

            return Some(Ok(RawRow {
                line,
                fields: record,
            }));
        }
    }
}

/// Opens `path` and returns its data rows.
///
/// Line 1 is discarded unconditionally as a header, even when it is blank.
/// Records may have any number of fields.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Rows, EtlError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Opening CSV input");

    let reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    Ok(Rows {
        records: reader.into_records(),
        header_pending: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("input.csv");
        fs::write(&path, content).unwrap();
        path
    }

    fn collect_fields(path: &Path) -> Vec<Vec<String>> {
        read_rows(path)
            .unwrap()
            .map(|r| r.unwrap().fields.iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_header_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "id,a,b\n1,10,20\n2,3,4\n");

        let rows = collect_fields(&path);
        assert_eq!(rows, vec![vec!["1", "10", "20"], vec!["2", "3", "4"]]);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "");
        assert!(collect_fields(&path).is_empty());
    }

    #[test]
    fn test_header_only_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "id,a,b\n");
        assert!(collect_fields(&path).is_empty());
    }

    #[test]
    fn test_first_line_discarded_even_if_data() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "1,2,3\n4,5,6\n");
        assert_eq!(collect_fields(&path), vec![vec!["4", "5", "6"]]);
    }

    #[test]
    fn test_ragged_rows_and_quoting() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "id,a,b\n1,\"x,y\"\n2,-,5,\n");

        let rows = collect_fields(&path);
        assert_eq!(rows[0], vec!["1", "x,y"]);
        assert_eq!(rows[1], vec!["2", "-", "5", ""]);
    }

    #[test]
    fn test_line_numbers_follow_file() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "id,a\n1,2\n3,4\n");

        let lines: Vec<u64> = read_rows(&path).unwrap().map(|r| r.unwrap().line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = read_rows(dir.path().join("nope.csv"));
        assert!(matches!(result, Err(EtlError::Csv(_))));
    }

    #[test]
    fn test_blank_first_line_is_the_header() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "\n1,10\n2,20\n");

        let ids: Vec<String> = read_rows(&path)
            .unwrap()
            .map(|r| r.unwrap().id_field().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_blank_lines_after_header_are_not_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "id,a\n\n1,2\n\n3,4\n");
        assert_eq!(collect_fields(&path), vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn test_abandoned_sequence_can_be_reopened() {
        let dir = TempDir::new().unwrap();
        let path = write_input(&dir, "id,a\n1,2\n3,4\n");

        let mut rows = read_rows(&path).unwrap();
        let first = rows.next().unwrap().unwrap();
        assert_eq!(first.id_field(), Some("1"));
        drop(rows);

        assert_eq!(collect_fields(&path).len(), 2);
    }

    #[test]
    fn test_value_fields_exclude_id() {
        let row = RawRow {
            line: 2,
            fields: StringRecord::from(vec!["7", "1", "-"]),
        };
        let values: Vec<&str> = row.value_fields().collect();
        assert_eq!(values, vec!["1", "-"]);
    }
}
