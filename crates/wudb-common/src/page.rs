//! Page constants and header structures for WuDB storage.

use crate::error::{Result, WudbError};
use crate::time::unix_now_u32;
use serde::{Deserialize, Serialize};

/// Page size in bytes (4 KB). Also the I/O granule.
pub const PAGE_SIZE: usize = 4096;

/// Size of the page header in bytes.
pub const PAGE_HEADER_SIZE: usize = 64;

/// Size of the key area in bytes.
pub const KEY_AREA_SIZE: usize = 512;

/// Size of the value area in bytes.
pub const VALUE_AREA_SIZE: usize = 3520;

/// Offset of the key area within a page.
pub const KEY_AREA_OFFSET: usize = PAGE_HEADER_SIZE;

/// Offset of the value area within a page.
pub const VALUE_AREA_OFFSET: usize = PAGE_HEADER_SIZE + KEY_AREA_SIZE;

/// Page types in WuDB storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum PageType {
    /// The singular page holding tree-wide metadata.
    Meta = 0,
    /// B+tree internal page carrying separator keys and child pointers.
    Internal = 1,
    /// B+tree leaf page carrying user key-value records.
    Leaf = 2,
}

impl TryFrom<u32> for PageType {
    type Error = WudbError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(PageType::Meta),
            1 => Ok(PageType::Internal),
            2 => Ok(PageType::Leaf),
            other => Err(WudbError::InvalidPageType(other)),
        }
    }
}

/// Flags for page state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFlags(u8);

impl PageFlags {
    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Page has in-memory modifications not yet written back.
    pub const DIRTY: u8 = 0b0000_0001;
    /// Page has been disposed; the slot is a tombstone and is never reused.
    pub const DISPOSED: u8 = 0b0000_0010;

    /// Returns true if the dirty flag is set.
    pub fn is_dirty(&self) -> bool {
        self.0 & Self::DIRTY != 0
    }

    /// Sets the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            self.0 |= Self::DIRTY;
        } else {
            self.0 &= !Self::DIRTY;
        }
    }

    /// Returns true if the disposed flag is set.
    pub fn is_disposed(&self) -> bool {
        self.0 & Self::DISPOSED != 0
    }

    /// Sets the disposed flag.
    pub fn set_disposed(&mut self, disposed: bool) {
        if disposed {
            self.0 |= Self::DISPOSED;
        } else {
            self.0 &= !Self::DISPOSED;
        }
    }
}

/// Header structure at the beginning of every page.
///
/// Layout (64 bytes, little-endian, packed in declaration order):
/// - page_type: 4 bytes
/// - page_id: 4 bytes
/// - prev_page_id: 4 bytes
/// - next_page_id: 4 bytes
/// - lsn: 4 bytes
/// - free_space_start: 4 bytes
/// - free_space_end: 4 bytes
/// - record_count: 4 bytes
/// - checksum: 4 bytes (carried, never verified)
/// - record_size: 4 bytes
/// - max_record_count: 4 bytes
/// - flags: 1 byte
/// - reserved: 3 bytes
/// - transaction_id: 4 bytes
/// - create_time: 4 bytes
/// - modify_time: 4 bytes
/// - record_id: 4 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Type of this page.
    pub page_type: PageType,
    /// Page identifier; the page sits at file offset `64 + page_id * 4096`.
    pub page_id: u32,
    /// Previous page in the sibling chain (0 = none).
    pub prev_page_id: u32,
    /// Next page in the sibling chain (0 = none).
    pub next_page_id: u32,
    /// Log sequence number. Carried, never enforced.
    pub lsn: u32,
    /// Page-relative offset of the first free byte in the value area.
    pub free_space_start: u32,
    /// Page-relative offset one past the last usable byte.
    pub free_space_end: u32,
    /// Number of logically occupied record slots.
    pub record_count: u32,
    /// Checksum of the page contents. Carried, never verified.
    pub checksum: u32,
    /// Width of a single record on this page in bytes.
    pub record_size: u32,
    /// Maximum number of records this page can hold.
    pub max_record_count: u32,
    /// Page flags (dirty, disposed).
    pub flags: PageFlags,
    /// Transaction that last touched this page.
    pub transaction_id: u32,
    /// Creation unix time (seconds).
    pub create_time: u32,
    /// Last-modification unix time (seconds).
    pub modify_time: u32,
    /// Sequence counter for record ids. Carried for inspection only.
    pub record_id: u32,
}

impl PageHeader {
    /// Size of the page header in bytes.
    pub const SIZE: usize = PAGE_HEADER_SIZE;

    /// Creates a new page header for the given page id and type.
    ///
    /// `max_record_count` is derived from the record size rather than
    /// trusted from disk: a page can hold at most `KEY_AREA_SIZE / 32`
    /// key slots and `VALUE_AREA_SIZE / record_size` record slots.
    pub fn new(page_id: u32, page_type: PageType, record_size: u32) -> Self {
        let now = unix_now_u32();
        Self {
            page_type,
            page_id,
            prev_page_id: 0,
            next_page_id: 0,
            lsn: 0,
            free_space_start: VALUE_AREA_OFFSET as u32,
            free_space_end: PAGE_SIZE as u32,
            record_count: 0,
            checksum: 0,
            record_size,
            max_record_count: derive_max_record_count(record_size),
            flags: PageFlags::empty(),
            transaction_id: 0,
            create_time: now,
            modify_time: now,
            record_id: 0,
        }
    }

    /// Serializes the header to its 64-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&(self.page_type as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.page_id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.prev_page_id.to_le_bytes());
        buf[12..16].copy_from_slice(&self.next_page_id.to_le_bytes());
        buf[16..20].copy_from_slice(&self.lsn.to_le_bytes());
        buf[20..24].copy_from_slice(&self.free_space_start.to_le_bytes());
        buf[24..28].copy_from_slice(&self.free_space_end.to_le_bytes());
        buf[28..32].copy_from_slice(&self.record_count.to_le_bytes());
        buf[32..36].copy_from_slice(&self.checksum.to_le_bytes());
        buf[36..40].copy_from_slice(&self.record_size.to_le_bytes());
        buf[40..44].copy_from_slice(&self.max_record_count.to_le_bytes());
        buf[44] = self.flags.0;
        // bytes 45-47 are reserved (already zeroed)
        buf[48..52].copy_from_slice(&self.transaction_id.to_le_bytes());
        buf[52..56].copy_from_slice(&self.create_time.to_le_bytes());
        buf[56..60].copy_from_slice(&self.modify_time.to_le_bytes());
        buf[60..64].copy_from_slice(&self.record_id.to_le_bytes());
        buf
    }

    /// Deserializes the header from bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(WudbError::PageSizeMismatch {
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }

        let u32_at = |off: usize| u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]);

        Ok(Self {
            page_type: PageType::try_from(u32_at(0))?,
            page_id: u32_at(4),
            prev_page_id: u32_at(8),
            next_page_id: u32_at(12),
            lsn: u32_at(16),
            free_space_start: u32_at(20),
            free_space_end: u32_at(24),
            record_count: u32_at(28),
            checksum: u32_at(32),
            record_size: u32_at(36),
            max_record_count: u32_at(40),
            flags: PageFlags(buf[44]),
            transaction_id: u32_at(48),
            create_time: u32_at(52),
            modify_time: u32_at(56),
            record_id: u32_at(60),
        })
    }

    /// Stamps the modification time with the current unix time.
    pub fn touch(&mut self) {
        self.modify_time = unix_now_u32();
    }
}

/// Derives the maximum record count for a page from its record width.
///
/// Bounded by both the key area (one 32-byte key slot per record) and the
/// value area (one `record_size` slot per record).
pub fn derive_max_record_count(record_size: u32) -> u32 {
    let by_keys = (KEY_AREA_SIZE / crate::record::KEY_SIZE) as u32;
    let by_values = VALUE_AREA_SIZE as u32 / record_size;
    by_keys.min(by_values)
}
