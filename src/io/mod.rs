//! Record input.
//!
//! Clinical records arrive as a delimited text table with a header row. The
//! [`CsvRecordSource`] adapter normalizes headers and values into
//! [`crate::models::Record`]s and reads a bounded sample of them.
//!
//! # Example
//!
//! ```rust
//! use clinigraph::io::CsvRecordSource;
//!
//! let data = "subject_id,Description\n1,flu\n2,\n";
//! let mut source = CsvRecordSource::from_reader(data.as_bytes()).unwrap();
//! let records = source.read_sample(50).unwrap();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].get("description"), "Unknown");
//! ```

mod csv;

pub use self::csv::{CsvRecordSource, DEFAULT_SAMPLE_SIZE};
