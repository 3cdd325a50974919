//! Error types for WuDB.

use thiserror::Error;

/// Result type alias using WudbError.
pub type Result<T> = std::result::Result<T, WudbError>;

/// Errors that can occur in WuDB operations.
#[derive(Debug, Error)]
pub enum WudbError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // File errors
    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Bad file magic: expected {expected:#010x}, got {actual:#010x}")]
    BadMagic { expected: u32, actual: u32 },

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    // Page errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: u32 },

    #[error("Page size mismatch: expected {expected}, got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    #[error("Offset out of range: {offset}+{len} exceeds {region} region")]
    OutOfRange {
        offset: usize,
        len: usize,
        region: &'static str,
    },

    #[error("Invalid page type: {0}")]
    InvalidPageType(u32),

    #[error("Page full, unable to insert record")]
    PageFull,

    #[error("Page underflow, record count below half-full")]
    PageUnderflow,

    // Record errors
    #[error("Key not found")]
    KeyNotFound,

    #[error("Duplicate key")]
    DuplicateKey,

    // Transaction errors
    #[error("Transaction not found: {txn_id}")]
    TransactionMissing { txn_id: u32 },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Catch-all for invariant violations
    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: WudbError = io_err.into();
        assert!(matches!(err, WudbError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_file_errors_display() {
        let err = WudbError::FileExists("test.wdb".to_string());
        assert_eq!(err.to_string(), "File already exists: test.wdb");

        let err = WudbError::FileNotFound("missing.wdb".to_string());
        assert_eq!(err.to_string(), "File not found: missing.wdb");

        let err = WudbError::BadMagic {
            expected: 0x5755_4442,
            actual: 0xdead_beef,
        };
        assert_eq!(
            err.to_string(),
            "Bad file magic: expected 0x57554442, got 0xdeadbeef"
        );
    }

    #[test]
    fn test_page_errors_display() {
        let err = WudbError::PageNotFound { page_id: 42 };
        assert_eq!(err.to_string(), "Page not found: 42");

        let err = WudbError::PageSizeMismatch {
            expected: 4096,
            actual: 100,
        };
        assert_eq!(err.to_string(), "Page size mismatch: expected 4096, got 100");

        let err = WudbError::OutOfRange {
            offset: 500,
            len: 64,
            region: "key",
        };
        assert_eq!(
            err.to_string(),
            "Offset out of range: 500+64 exceeds key region"
        );
    }

    #[test]
    fn test_record_errors_display() {
        assert_eq!(WudbError::KeyNotFound.to_string(), "Key not found");
        assert_eq!(WudbError::DuplicateKey.to_string(), "Duplicate key");
    }

    #[test]
    fn test_transaction_missing_display() {
        let err = WudbError::TransactionMissing { txn_id: 7 };
        assert_eq!(err.to_string(), "Transaction not found: 7");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(WudbError::Storage("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WudbError>();
    }
}
