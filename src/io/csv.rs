//! CSV record source.

use crate::models::{Record, normalize_column};
use crate::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of leading rows read by default.
pub const DEFAULT_SAMPLE_SIZE: usize = 50;

/// CSV record source.
///
/// The first row is the header. Rows may be shorter or longer than the header;
/// missing trailing fields read as [`crate::models::UNKNOWN`] and extra fields
/// are ignored.
pub struct CsvRecordSource<R: Read> {
    /// CSV reader.
    reader: csv::Reader<R>,
    /// Normalized column names, by position.
    columns: Vec<String>,
}

impl CsvRecordSource<File> {
    /// Opens a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`] if the path is not an existing file,
    /// or an error if the file or its header row cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|e| Error::OperationFailed {
            operation: "open_csv".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> CsvRecordSource<R> {
    /// Creates a record source over any reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the header row cannot be read.
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // Allow varying number of fields
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = csv_reader
            .headers()
            .map_err(|e| Error::OperationFailed {
                operation: "read_csv_headers".to_string(),
                cause: e.to_string(),
            })?
            .iter()
            .map(normalize_column)
            .collect();

        Ok(Self {
            reader: csv_reader,
            columns,
        })
    }

    /// Returns the normalized column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Reads the next record, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is malformed.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let mut row = csv::StringRecord::new();

        let has_record = self
            .reader
            .read_record(&mut row)
            .map_err(|e| Error::InvalidInput(format!("malformed CSV row: {e}")))?;
        if !has_record {
            return Ok(None);
        }

        let record = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.as_str(), row.get(i).unwrap_or_default()))
            .collect();
        Ok(Some(record))
    }

    /// Reads at most `limit` records from the start of the input.
    ///
    /// # Errors
    ///
    /// Returns an error if any row within the sample is malformed.
    pub fn read_sample(&mut self, limit: usize) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(limit.min(DEFAULT_SAMPLE_SIZE));
        while records.len() < limit {
            match self.next_record()? {
                Some(record) => records.push(record),
                None => break,
            }
        }
        tracing::debug!(count = records.len(), limit, "Read record sample");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNKNOWN;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ADMISSIONS: &str = "\
Subject ID,hadm_id,admission_type,Description,drug
1,100,URGENT,flu,oseltamivir
2,101,ELECTIVE,,NaN
3,102,URGENT,asthma
";

    #[test]
    fn test_headers_are_normalized() {
        let source = CsvRecordSource::from_reader(ADMISSIONS.as_bytes()).unwrap();
        assert_eq!(
            source.columns(),
            ["subject_id", "hadm_id", "admission_type", "description", "drug"]
        );
    }

    #[test]
    fn test_blank_and_nan_values_become_unknown() {
        let mut source = CsvRecordSource::from_reader(ADMISSIONS.as_bytes()).unwrap();
        let records = source.read_sample(DEFAULT_SAMPLE_SIZE).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("drug"), "oseltamivir");
        assert_eq!(records[1].get("description"), UNKNOWN);
        assert_eq!(records[1].get("drug"), UNKNOWN);
    }

    #[test]
    fn test_short_rows_fill_missing_columns() {
        let mut source = CsvRecordSource::from_reader(ADMISSIONS.as_bytes()).unwrap();
        let records = source.read_sample(10).unwrap();

        assert!(records[2].contains("drug"));
        assert_eq!(records[2].get("drug"), UNKNOWN);
    }

    #[test]
    fn test_read_sample_truncates() {
        let mut source = CsvRecordSource::from_reader(ADMISSIONS.as_bytes()).unwrap();
        let records = source.read_sample(2).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("subject_id"), "2");
    }

    #[test]
    fn test_header_only_input_yields_no_records() {
        let mut source = CsvRecordSource::from_reader("subject_id,drug\n".as_bytes()).unwrap();
        assert!(source.read_sample(50).unwrap().is_empty());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = CsvRecordSource::from_path(Path::new("/nonexistent/admissions.csv"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InputNotFound { .. }));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ADMISSIONS.as_bytes()).unwrap();

        let mut source = CsvRecordSource::from_path(file.path()).unwrap();
        assert_eq!(source.read_sample(50).unwrap().len(), 3);
    }
}
