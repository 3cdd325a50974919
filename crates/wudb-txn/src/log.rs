//! Append-only textual transaction log.
//!
//! The log is human-readable debug text, not a recovery log: one header
//! line per committed transaction followed by one line per operation.

use crate::transaction::{IsolationLevel, Operation, TxnId, TxnStatus};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use wudb_common::error::Result;
use wudb_common::time::unix_now_u32;

/// Per-transaction log record, mirroring the transaction's operations.
#[derive(Debug, Clone)]
pub struct TransactionLog {
    /// Owning transaction.
    pub txn_id: TxnId,
    /// Declared isolation level.
    pub isolation: IsolationLevel,
    /// Begin unix time (seconds).
    pub begin_time: u32,
    /// End unix time; 0 while active.
    pub end_time: u32,
    /// Lifecycle state at flush time.
    pub status: TxnStatus,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
}

impl TransactionLog {
    /// Creates an empty log record for an active transaction.
    pub fn new(txn_id: TxnId, isolation: IsolationLevel, begin_time: u32) -> Self {
        Self {
            txn_id,
            isolation,
            begin_time,
            end_time: 0,
            status: TxnStatus::Active,
            operations: Vec::new(),
        }
    }

    /// Appends an operation to the log record.
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Renders the transaction header line.
    pub fn header_line(&self) -> String {
        format!(
            "[{}] TransactionID: {}, TransactionLevel: {}, BeginTime: {}, EndTime: {}, Status: {}",
            unix_now_u32(),
            self.txn_id,
            self.isolation as u8,
            self.begin_time,
            self.end_time,
            self.status as u8,
        )
    }
}

/// Owns the append-only log file for one database.
pub struct LogManager {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogManager {
    /// Opens (or creates) the log file at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a committed transaction: one header line, then one line per
    /// operation. Flushed to disk before returning.
    pub fn write_transaction_log(&self, log: &TransactionLog) -> Result<()> {
        let mut file = self.file.lock();
        writeln!(file, "{}", log.header_line())?;
        for operation in &log.operations {
            writeln!(file, "{}", operation.log_line())?;
        }
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}
