//! Transaction bookkeeping.

use crate::log::LogManager;
use crate::transaction::{IsolationLevel, Operation, Transaction, TxnId, TxnStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use wudb_common::error::{Result, WudbError};

struct ManagerState {
    transactions: HashMap<TxnId, Transaction>,
    next_id: u32,
}

/// Owns the id-to-transaction map and the log file.
///
/// The map sits behind a mutex so operation recording stays safe even
/// though the storage layer itself is single-threaded.
pub struct TransactionManager {
    state: Mutex<ManagerState>,
    log: LogManager,
}

impl TransactionManager {
    /// Creates a manager writing its log to the given path.
    pub fn open(log_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            state: Mutex::new(ManagerState {
                transactions: HashMap::new(),
                next_id: 0,
            }),
            log: LogManager::open(log_path)?,
        })
    }

    /// Starts a new transaction and returns its id.
    pub fn begin(&self, isolation: IsolationLevel) -> TxnId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TxnId(state.next_id);
        state.transactions.insert(id, Transaction::new(id, isolation));
        id
    }

    /// Records an operation against its transaction.
    ///
    /// An unknown transaction id is registered on the fly with the default
    /// ReadCommitted level.
    pub fn add_operation(&self, operation: Operation) {
        let mut state = self.state.lock();
        let txn = state
            .transactions
            .entry(operation.txn_id)
            .or_insert_with(|| {
                Transaction::new(operation.txn_id, IsolationLevel::ReadCommitted)
            });
        txn.add_operation(operation);
    }

    /// Commits a transaction: flushes its textual log record and marks it
    /// Committed.
    pub fn commit(&self, id: TxnId) -> Result<()> {
        let mut state = self.state.lock();
        let txn = state
            .transactions
            .get_mut(&id)
            .ok_or(WudbError::TransactionMissing { txn_id: id.0 })?;
        txn.finish(TxnStatus::Committed);
        self.log.write_transaction_log(&txn.log)?;
        debug!(txn = id.0, operations = txn.operations.len(), "txn.commit");
        Ok(())
    }

    /// Marks a transaction Aborted. Reverse-application of its operations
    /// is driven by the record manager, not here.
    pub fn rollback(&self, id: TxnId) -> Result<()> {
        let mut state = self.state.lock();
        let txn = state
            .transactions
            .get_mut(&id)
            .ok_or(WudbError::TransactionMissing { txn_id: id.0 })?;
        txn.finish(TxnStatus::Aborted);
        debug!(txn = id.0, "txn.rollback");
        Ok(())
    }

    /// Removes and returns the last operation of a transaction, or None if
    /// it has no operations left.
    pub fn undo(&self, id: TxnId) -> Result<Option<Operation>> {
        let mut state = self.state.lock();
        let txn = state
            .transactions
            .get_mut(&id)
            .ok_or(WudbError::TransactionMissing { txn_id: id.0 })?;
        txn.log.operations.pop();
        Ok(txn.operations.pop())
    }

    /// Returns a snapshot of a transaction's operations in execution order.
    pub fn operations(&self, id: TxnId) -> Result<Vec<Operation>> {
        let state = self.state.lock();
        let txn = state
            .transactions
            .get(&id)
            .ok_or(WudbError::TransactionMissing { txn_id: id.0 })?;
        Ok(txn.operations.clone())
    }

    /// Returns a transaction's current status.
    pub fn status(&self, id: TxnId) -> Result<TxnStatus> {
        let state = self.state.lock();
        let txn = state
            .transactions
            .get(&id)
            .ok_or(WudbError::TransactionMissing { txn_id: id.0 })?;
        Ok(txn.status)
    }
}
