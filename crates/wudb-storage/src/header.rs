//! File header at offset 0 of every data file.

use crate::handle::FileHandle;
use wudb_common::error::{Result, WudbError};
use wudb_common::page::PAGE_SIZE;
use wudb_common::time::unix_now_i64;

/// Magic number identifying WuDB data files ("WUDB").
pub const WUDB_MAGIC: u32 = 0x5755_4442;

/// Current file format version.
pub const FILE_VERSION: u32 = 0;

/// Fixed-layout record at file offset 0.
///
/// Layout (64 bytes, little-endian):
/// - magic: 4 bytes
/// - version: 4 bytes
/// - page_size: 4 bytes
/// - page_count: 4 bytes
/// - first_free_page: 4 bytes (carried, never linked to disposed pages)
/// - last_page_id: 4 bytes
/// - create_time: 8 bytes
/// - update_time: 8 bytes
/// - checksum: 4 bytes (carried, never verified)
/// - file_size: 4 bytes
/// - reserved: 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub first_free_page: u32,
    pub last_page_id: u32,
    pub create_time: i64,
    pub update_time: i64,
    pub checksum: u32,
    pub file_size: u32,
}

impl FileHeader {
    /// Size of the file header in bytes.
    pub const SIZE: usize = 64;

    /// Creates a header for a freshly created file.
    pub fn new() -> Self {
        let now = unix_now_i64();
        Self {
            magic: WUDB_MAGIC,
            version: FILE_VERSION,
            page_size: PAGE_SIZE as u32,
            page_count: 0,
            first_free_page: 0,
            last_page_id: 0,
            create_time: now,
            update_time: now,
            checksum: 0,
            file_size: Self::SIZE as u32,
        }
    }

    /// Returns true if the magic number matches.
    pub fn validate_magic(&self) -> bool {
        self.magic == WUDB_MAGIC
    }

    /// Serializes the header to its 64-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.page_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.page_count.to_le_bytes());
        buf[16..20].copy_from_slice(&self.first_free_page.to_le_bytes());
        buf[20..24].copy_from_slice(&self.last_page_id.to_le_bytes());
        buf[24..32].copy_from_slice(&self.create_time.to_le_bytes());
        buf[32..40].copy_from_slice(&self.update_time.to_le_bytes());
        buf[40..44].copy_from_slice(&self.checksum.to_le_bytes());
        buf[44..48].copy_from_slice(&self.file_size.to_le_bytes());
        // bytes 48-63 are reserved (already zeroed)
        buf
    }

    /// Deserializes the header from bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(WudbError::ShortRead {
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }

        let u32_at = |off: usize| u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]);
        let i64_at = |off: usize| {
            i64::from_le_bytes([
                buf[off],
                buf[off + 1],
                buf[off + 2],
                buf[off + 3],
                buf[off + 4],
                buf[off + 5],
                buf[off + 6],
                buf[off + 7],
            ])
        };

        Ok(Self {
            magic: u32_at(0),
            version: u32_at(4),
            page_size: u32_at(8),
            page_count: u32_at(12),
            first_free_page: u32_at(16),
            last_page_id: u32_at(20),
            create_time: i64_at(24),
            update_time: i64_at(32),
            checksum: u32_at(40),
            file_size: u32_at(44),
        })
    }

    /// Writes the header at file offset 0 and syncs.
    pub fn write_to(&self, handle: &FileHandle) -> Result<()> {
        handle.seek(0);
        handle.write(&self.to_bytes())?;
        handle.sync()
    }

    /// Reads the header from file offset 0 and validates the magic.
    pub fn read_from(handle: &FileHandle) -> Result<Self> {
        handle.seek(0);
        let buf = handle.read(Self::SIZE)?;
        let header = Self::from_bytes(&buf)?;
        if !header.validate_magic() {
            return Err(WudbError::BadMagic {
                expected: WUDB_MAGIC,
                actual: header.magic,
            });
        }
        Ok(header)
    }

    /// Stamps the update time with the current unix time.
    pub fn touch(&mut self) {
        self.update_time = unix_now_i64();
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}
