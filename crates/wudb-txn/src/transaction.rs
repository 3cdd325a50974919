//! Transaction and operation descriptors.

use crate::log::TransactionLog;
use wudb_common::error::{Result, WudbError};
use wudb_common::record::Record;
use wudb_common::time::unix_now_u32;

/// Unique identifier for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(pub u32);

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a logged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationKind {
    Insert = 0,
    Delete = 1,
    Update = 2,
}

impl TryFrom<u8> for OperationKind {
    type Error = WudbError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(OperationKind::Insert),
            1 => Ok(OperationKind::Delete),
            2 => Ok(OperationKind::Update),
            other => Err(WudbError::Storage(format!(
                "invalid operation kind: {}",
                other
            ))),
        }
    }
}

/// Declared isolation level. Metadata only; no concurrency control is
/// implemented behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IsolationLevel {
    ReadUncommitted = 0,
    ReadCommitted = 1,
    RepeatableRead = 2,
    Serializable = 3,
}

/// Transaction lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TxnStatus {
    Active = 0,
    Committed = 1,
    Aborted = 2,
}

/// A single mutation descriptor.
///
/// Carries enough state to reverse the mutation: the inserted record for
/// inserts, the before-image for deletes, and both plus the leaf page id
/// for updates.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Owning transaction.
    pub txn_id: TxnId,
    /// What was done.
    pub kind: OperationKind,
    /// Leaf page the record lived on when the operation ran. Only updates
    /// rely on it, to re-apply the before-image in place.
    pub page_id: u32,
    /// The record as written (insert/update).
    pub record: Option<Record>,
    /// The before-image (delete/update).
    pub old_record: Option<Record>,
}

impl Operation {
    /// Renders the operation as one log line.
    pub fn log_line(&self) -> String {
        format!(
            "[{}] TransactionID: {}, OperationType: {}, PageID: {}, Record: {}, OldRecord: {}",
            unix_now_u32(),
            self.txn_id,
            self.kind as u8,
            self.page_id,
            display_record(&self.record),
            display_record(&self.old_record),
        )
    }
}

fn display_record(record: &Option<Record>) -> String {
    match record {
        Some(r) => r.to_string(),
        None => "none".to_string(),
    }
}

/// A transaction: a grouping of operations that can be reversed atomically.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: TxnId,
    /// Declared isolation level.
    pub isolation: IsolationLevel,
    /// Begin unix time (seconds).
    pub begin_time: u32,
    /// End unix time; 0 while active.
    pub end_time: u32,
    /// Lifecycle state.
    pub status: TxnStatus,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// Log record mirroring the operations, flushed on commit.
    pub log: TransactionLog,
}

impl Transaction {
    /// Creates a new active transaction.
    pub fn new(id: TxnId, isolation: IsolationLevel) -> Self {
        let begin_time = unix_now_u32();
        Self {
            id,
            isolation,
            begin_time,
            end_time: 0,
            status: TxnStatus::Active,
            operations: Vec::new(),
            log: TransactionLog::new(id, isolation, begin_time),
        }
    }

    /// Appends an operation to the transaction and its log record.
    pub fn add_operation(&mut self, operation: Operation) {
        self.log.add_operation(operation.clone());
        self.operations.push(operation);
    }

    /// Marks the transaction finished with the given status.
    pub fn finish(&mut self, status: TxnStatus) {
        self.status = status;
        self.end_time = unix_now_u32();
        self.log.status = status;
        self.log.end_time = self.end_time;
    }
}
