//! Configuration structures for WuDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File extension for WuDB data files.
pub const DATA_FILE_SUFFIX: &str = ".wdb";

/// File extension for WuDB transaction log files.
pub const LOG_FILE_SUFFIX: &str = ".log";

/// Storage configuration for a WuDB instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for data and log files.
    pub data_dir: PathBuf,
    /// Enable fsync after metadata and page writes.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./wudb-data"),
            fsync_enabled: true,
        }
    }
}
