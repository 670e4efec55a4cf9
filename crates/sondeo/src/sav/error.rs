//! Error types for SPSS system file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing `.sav` files.
#[derive(Debug, Error)]
pub enum SavError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The file is not an SPSS system file or is malformed.
    #[error("invalid system file: {message}")]
    InvalidFormat {
        /// Description of the problem.
        message: String,
    },

    /// A dictionary record type that cannot appear at this point.
    #[error("unexpected record type {record_type} at offset {offset}")]
    UnexpectedRecord {
        /// The record type code.
        record_type: i32,
        /// Byte offset of the record.
        offset: usize,
    },

    /// Attempted to read past the end of the file.
    #[error("unexpected end of file at offset {offset} (needed {needed} bytes)")]
    UnexpectedEof {
        /// Byte offset of the read.
        offset: usize,
        /// Number of bytes requested.
        needed: usize,
    },

    /// A value label record refers to a slot that is not the start of a variable.
    #[error("value labels refer to invalid dictionary index {index}")]
    InvalidLabelIndex {
        /// The 1-based dictionary index.
        index: i32,
    },

    /// The case data ends in the middle of a case.
    #[error("case data is truncated: {slots} trailing slots do not form a full case")]
    TruncatedCase {
        /// Number of leftover 8-byte slots.
        slots: usize,
    },

    /// Column length does not match the number of cases.
    #[error("column '{name}' has {actual} values, expected {expected}")]
    ColumnLength {
        /// Variable name.
        name: String,
        /// Number of cases in the dataset.
        expected: usize,
        /// Number of values in the column.
        actual: usize,
    },

    /// Column storage does not match the variable type.
    #[error("column '{name}' does not match the declared variable type")]
    ColumnType {
        /// Variable name.
        name: String,
    },

    /// A feature of the format that is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Failed to inflate a zlib block.
    #[error("zlib block {block} failed to decompress: {source}")]
    Inflate {
        /// Index of the block in the trailer.
        block: usize,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for `.sav` operations.
pub type Result<T> = std::result::Result<T, SavError>;

impl SavError {
    /// Create an invalid format error.
    #[must_use]
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create an unsupported feature error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_format_display() {
        let err = SavError::invalid_format("bad magic");
        assert_eq!(err.to_string(), "invalid system file: bad magic");
    }

    #[test]
    fn test_unexpected_eof_display() {
        let err = SavError::UnexpectedEof {
            offset: 176,
            needed: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("176"));
        assert!(msg.contains("4 bytes"));
    }

    #[test]
    fn test_truncated_case_display() {
        let err = SavError::TruncatedCase { slots: 3 };
        assert!(err.to_string().contains("3 trailing slots"));
    }
}
