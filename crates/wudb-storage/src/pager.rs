//! Page allocation and I/O by page id.

use crate::handle::FileHandle;
use crate::header::FileHeader;
use crate::meta::{MetaPage, META_PAGE_ID};
use crate::page::Page;
use tracing::debug;
use wudb_common::error::{Result, WudbError};
use wudb_common::page::{PageType, PAGE_SIZE};

/// Allocates, reads, writes and disposes pages of one data file.
///
/// Page `k` sits at file offset `64 + k * 4096`; page 0 is the meta page,
/// user pages start at 1. The meta page is cached for the manager's
/// lifetime; meta and file-header writes always flush through.
pub struct PageManager {
    handle: FileHandle,
    file_header: FileHeader,
    meta: MetaPage,
    fsync_enabled: bool,
}

impl PageManager {
    /// Opens a manager over a data file, initializing the meta page on
    /// first open.
    pub fn open(handle: FileHandle, fsync_enabled: bool) -> Result<Self> {
        let file_header = FileHeader::read_from(&handle)?;
        let mut manager = Self {
            handle,
            file_header,
            meta: MetaPage::new(),
            fsync_enabled,
        };

        if manager.handle.len()? <= FileHeader::SIZE as u64 {
            manager.init_meta_page()?;
        } else {
            manager.meta = manager.read_meta_page()?;
        }
        Ok(manager)
    }

    fn page_offset(page_id: u32) -> u64 {
        FileHeader::SIZE as u64 + page_id as u64 * PAGE_SIZE as u64
    }

    /// Writes the initial meta page and updates the file header.
    fn init_meta_page(&mut self) -> Result<()> {
        self.meta = MetaPage::new();
        self.handle.seek(Self::page_offset(META_PAGE_ID));
        self.handle.write(&self.meta.serialize())?;

        self.file_header.page_count = 1;
        self.file_header.last_page_id = META_PAGE_ID;
        self.file_header.file_size = (FileHeader::SIZE + PAGE_SIZE) as u32;
        self.file_header.touch();
        self.file_header.write_to(&self.handle)?;
        Ok(())
    }

    fn read_meta_page(&self) -> Result<MetaPage> {
        self.handle.seek(Self::page_offset(META_PAGE_ID));
        let data = self.handle.read(PAGE_SIZE)?;
        MetaPage::deserialize(&data)
    }

    /// Returns the cached meta page.
    pub fn meta(&self) -> &MetaPage {
        &self.meta
    }

    /// Returns the cached meta page for mutation. Call `write_meta_page`
    /// to persist changes.
    pub fn meta_mut(&mut self) -> &mut MetaPage {
        &mut self.meta
    }

    /// Persists the cached meta page.
    pub fn write_meta_page(&mut self) -> Result<()> {
        self.meta.header.touch();
        self.handle.seek(Self::page_offset(META_PAGE_ID));
        self.handle.write(&self.meta.serialize())?;
        if self.fsync_enabled {
            self.handle.sync()?;
        }
        Ok(())
    }

    /// Returns the cached file header.
    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// Reads and deserializes a page by id.
    pub fn get_page(&self, page_id: u32) -> Result<Page> {
        if page_id == META_PAGE_ID || page_id > self.file_header.last_page_id {
            return Err(WudbError::PageNotFound { page_id });
        }
        self.handle.seek(Self::page_offset(page_id));
        let data = self.handle.read(PAGE_SIZE)?;
        Page::deserialize(&data)
    }

    /// Allocates a new page by appending to the file.
    pub fn create_page(&mut self, page_type: PageType) -> Result<Page> {
        let page_id = self.file_header.last_page_id + 1;
        let page = Page::new(page_id, page_type);

        self.handle.seek(Self::page_offset(page_id));
        self.handle.write(&page.serialize())?;

        self.file_header.last_page_id = page_id;
        self.file_header.page_count += 1;
        self.file_header.file_size =
            (Self::page_offset(page_id) + PAGE_SIZE as u64) as u32;
        self.file_header.touch();
        self.file_header.write_to(&self.handle)?;

        self.meta.page_count += 1;
        self.write_meta_page()?;

        debug!(page = page_id, page_type = ?page_type, "pager.create_page");
        Ok(page)
    }

    /// Re-serializes a page and writes it back in place.
    pub fn update_page(&mut self, page: &Page) -> Result<()> {
        let page_id = page.id();
        if page_id == META_PAGE_ID || page_id > self.file_header.last_page_id {
            return Err(WudbError::PageNotFound { page_id });
        }
        self.handle.seek(Self::page_offset(page_id));
        self.handle.write(&page.serialize())?;
        Ok(())
    }

    /// Marks a page disposed and rewrites it. The slot is a tombstone;
    /// space is not reclaimed.
    pub fn dispose_page(&mut self, page: &mut Page) -> Result<()> {
        page.header.flags.set_disposed(true);
        page.header.touch();
        self.update_page(page)?;
        debug!(page = page.id(), "pager.dispose_page");
        Ok(())
    }

    /// Flushes file contents to disk.
    pub fn sync(&self) -> Result<()> {
        self.handle.sync()
    }
}
