use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Invalid head file header: {0}")]
    InvalidHeader(String),

    #[error("File truncated: expected {expected} bytes, got {actual}")]
    FileTruncated { expected: u64, actual: u64 },

    #[error("Record index {index} out of bounds (total records: {total})")]
    RecordOutOfBounds { index: usize, total: usize },

    #[error("No record matches {0}")]
    NoMatchingRecord(String),

    #[error("Record {index} has a {nrow}x{ncol} grid, expected {expected_nrow}x{expected_ncol}")]
    ShapeMismatch {
        index: usize,
        nrow: usize,
        ncol: usize,
        expected_nrow: usize,
        expected_ncol: usize,
    },

    #[error("Cell out of range: {0}")]
    CellOutOfRange(String),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Core(#[from] modflow_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn file_truncated_display() {
        let err = OutputError::FileTruncated {
            expected: 500,
            actual: 44,
        };
        assert_eq!(err.to_string(), "File truncated: expected 500 bytes, got 44");
    }

    #[test]
    fn record_out_of_bounds_display() {
        let err = OutputError::RecordOutOfBounds { index: 7, total: 3 };
        assert_eq!(err.to_string(), "Record index 7 out of bounds (total records: 3)");
    }

    #[test]
    fn shape_mismatch_display() {
        let err = OutputError::ShapeMismatch {
            index: 1,
            nrow: 10,
            ncol: 10,
            expected_nrow: 11,
            expected_ncol: 11,
        };
        assert_eq!(
            err.to_string(),
            "Record 1 has a 10x10 grid, expected 11x11"
        );
    }

    #[test]
    fn io_error_conversion() {
        let err = OutputError::from(IoError::new(ErrorKind::NotFound, "file not found"));
        assert_eq!(err.to_string(), "I/O error: file not found");
    }

    #[test]
    fn core_error_is_transparent() {
        let err = OutputError::from(modflow_core::CoreError::parse(3, "bad row"));
        assert_eq!(err.to_string(), "line 3: bad row");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OutputError>();
    }
}
