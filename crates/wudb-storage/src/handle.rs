//! Positioned file I/O with a shared cursor.

use parking_lot::RwLock;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use wudb_common::error::{Result, WudbError};

struct Cursor {
    file: File,
    offset: u64,
}

/// Owns an open data file and its seek cursor.
///
/// Reads and writes start at the cursor and advance it by the number of
/// bytes transferred. The lock protects the cursor; the storage layer above
/// assumes a single mutator.
pub struct FileHandle {
    name: String,
    inner: RwLock<Cursor>,
}

impl FileHandle {
    /// Wraps an already-open file.
    pub fn new(name: impl Into<String>, file: File) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Cursor { file, offset: 0 }),
        }
    }

    /// Returns the file name this handle was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current cursor position.
    pub fn offset(&self) -> u64 {
        self.inner.read().offset
    }

    /// Moves the cursor to an absolute position.
    pub fn seek(&self, offset: u64) {
        self.inner.write().offset = offset;
    }

    /// Reads exactly `len` bytes at the cursor, advancing it.
    ///
    /// A short read is an error; the caller always knows the exact size of
    /// the structure it is loading.
    pub fn read(&self, len: usize) -> Result<Vec<u8>> {
        let mut cursor = self.inner.write();
        let offset = cursor.offset;
        cursor.file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = cursor.file.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(WudbError::ShortRead {
                    expected: len,
                    actual: filled,
                });
            }
            filled += n;
        }
        cursor.offset += len as u64;
        Ok(buf)
    }

    /// Writes the whole buffer at the cursor, advancing it.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut cursor = self.inner.write();
        let offset = cursor.offset;
        cursor.file.seek(SeekFrom::Start(offset))?;
        cursor.file.write_all(data)?;
        cursor.offset += data.len() as u64;
        Ok(data.len())
    }

    /// Flushes file contents and metadata to disk.
    pub fn sync(&self) -> Result<()> {
        self.inner.read().file.sync_all()?;
        Ok(())
    }

    /// Returns the current file size in bytes.
    pub fn len(&self) -> Result<u64> {
        Ok(self.inner.read().file.metadata()?.len())
    }

    /// Returns true if the file is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
