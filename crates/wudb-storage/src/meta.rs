//! The meta page: tree-wide metadata at page id 0.

use wudb_common::error::{Result, WudbError};
use wudb_common::page::{PageHeader, PageType, PAGE_SIZE};
use wudb_common::record::RECORD_SIZE;

/// Page id of the meta page.
pub const META_PAGE_ID: u32 = 0;

/// The singular page holding B+tree metadata, stored at file offset 64.
///
/// Layout: 64-byte page header followed by five u32 fields; the remainder
/// of the 4096-byte slot is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaPage {
    /// Page header (type Meta, page id 0).
    pub header: PageHeader,
    /// Root of the B+tree; 0 while the tree is uninitialized.
    pub root_page_id: u32,
    /// First leaf in key order.
    pub first_leaf_id: u32,
    /// Last leaf in key order.
    pub last_leaf_id: u32,
    /// Total allocated pages, the meta page included.
    pub page_count: u32,
    /// Number of page levels on a root-to-leaf path; 0 while uninitialized.
    pub tree_height: u32,
}

impl MetaPage {
    /// Creates the meta page for a fresh file.
    pub fn new() -> Self {
        Self {
            header: PageHeader::new(META_PAGE_ID, PageType::Meta, RECORD_SIZE as u32),
            root_page_id: 0,
            first_leaf_id: 0,
            last_leaf_id: 0,
            page_count: 1,
            tree_height: 0,
        }
    }

    /// Serializes the meta page to its 4096-byte on-disk form.
    pub fn serialize(&self) -> [u8; PAGE_SIZE] {
        let mut buf = [0u8; PAGE_SIZE];
        buf[..PageHeader::SIZE].copy_from_slice(&self.header.to_bytes());
        let mut off = PageHeader::SIZE;
        for field in [
            self.root_page_id,
            self.first_leaf_id,
            self.last_leaf_id,
            self.page_count,
            self.tree_height,
        ] {
            buf[off..off + 4].copy_from_slice(&field.to_le_bytes());
            off += 4;
        }
        buf
    }

    /// Deserializes the meta page from exactly 4096 bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() != PAGE_SIZE {
            return Err(WudbError::PageSizeMismatch {
                expected: PAGE_SIZE,
                actual: data.len(),
            });
        }
        let header = PageHeader::from_bytes(&data[..PageHeader::SIZE])?;
        if header.page_type != PageType::Meta {
            return Err(WudbError::InvalidPageType(header.page_type as u32));
        }

        let u32_at = |off: usize| {
            u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
        };
        let base = PageHeader::SIZE;
        Ok(Self {
            header,
            root_page_id: u32_at(base),
            first_leaf_id: u32_at(base + 4),
            last_leaf_id: u32_at(base + 8),
            page_count: u32_at(base + 12),
            tree_height: u32_at(base + 16),
        })
    }
}

impl Default for MetaPage {
    fn default() -> Self {
        Self::new()
    }
}
