//! Data file discovery under the configured directory.

use crate::handle::FileHandle;
use crate::header::FileHeader;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;
use wudb_common::config::{StorageConfig, DATA_FILE_SUFFIX};
use wudb_common::error::{Result, WudbError};

/// Creates, opens and destroys `.wdb` files under a fixed data directory.
pub struct FileCatalog {
    config: StorageConfig,
}

impl FileCatalog {
    /// Creates a catalog over the configured data directory.
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Returns the storage configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Creates a new data file with an initialized file header.
    ///
    /// Fails with `FileExists` if a file of that name already exists
    /// anywhere under the data directory.
    pub fn create(&self, name: &str) -> Result<()> {
        let file_name = with_suffix(name);
        std::fs::create_dir_all(&self.config.data_dir)?;

        if find_file(&self.config.data_dir, &file_name)?.is_some() {
            return Err(WudbError::FileExists(file_name));
        }

        let path = self.config.data_dir.join(&file_name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        let handle = FileHandle::new(file_name.clone(), file);
        FileHeader::new().write_to(&handle)?;
        debug!(file = %file_name, "catalog.create");
        Ok(())
    }

    /// Opens an existing data file by recursive walk for the exact name.
    pub fn open(&self, name: &str) -> Result<FileHandle> {
        let file_name = with_suffix(name);
        let path = find_file(&self.config.data_dir, &file_name)?
            .ok_or_else(|| WudbError::FileNotFound(file_name.clone()))?;

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(FileHandle::new(file_name, file))
    }

    /// Deletes the first file matching the name under the data directory.
    pub fn destroy(&self, name: &str) -> Result<()> {
        let file_name = with_suffix(name);
        let path = find_file(&self.config.data_dir, &file_name)?
            .ok_or_else(|| WudbError::FileNotFound(file_name.clone()))?;
        std::fs::remove_file(&path)?;
        debug!(file = %file_name, "catalog.destroy");
        Ok(())
    }

    /// Returns the path where a database's transaction log lives.
    pub fn log_path(&self, name: &str) -> PathBuf {
        let file_name = with_suffix(name);
        self.config
            .data_dir
            .join(format!("{}{}", file_name, wudb_common::LOG_FILE_SUFFIX))
    }
}

fn with_suffix(name: &str) -> String {
    if name.ends_with(DATA_FILE_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, DATA_FILE_SUFFIX)
    }
}

fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_file(&path, file_name)? {
                return Ok(Some(found));
            }
        } else if entry.file_name().to_string_lossy() == file_name {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
