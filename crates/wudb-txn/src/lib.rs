//! Transactions for WuDB.
//!
//! Provides per-transaction operation recording with before-images, a
//! textual append-only log flushed on commit, and the bookkeeping behind
//! rollback and single-step undo. The reverse-application of operations is
//! driven by the storage crate's record manager.

pub mod log;
pub mod manager;
pub mod transaction;

pub use log::{LogManager, TransactionLog};
pub use manager::TransactionManager;
pub use transaction::{IsolationLevel, Operation, OperationKind, Transaction, TxnId, TxnStatus};
