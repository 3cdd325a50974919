//! B+tree record manager.
//!
//! The tree is laid out over fixed-size pages: leaves hold user records and
//! form a doubly-linked list in key order; internal pages hold separator
//! records carrying two child pointers each, threaded into the same kind of
//! prev/next list per level. Descent routes keys strictly below a separator
//! through its front pointer and everything else through its next pointer,
//! so a split's middle key stays in the right-hand sibling.
//!
//! Every mutating call records an operation descriptor (with before-image
//! where one exists) against its transaction; rollback and undo replay the
//! descriptors in reverse through non-recording internal paths.

use crate::files::FileCatalog;
use crate::handle::FileHandle;
use crate::page::Page;
use crate::pager::PageManager;
use std::fmt::Write as _;
use tracing::debug;
use wudb_common::error::{Result, WudbError};
use wudb_common::page::PageType;
use wudb_common::record::{InternalRecord, Key, Record};
use wudb_txn::{IsolationLevel, Operation, OperationKind, TransactionManager, TxnId};

/// Result of a delete step indicating whether the caller must rebalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteOutcome {
    /// Subtree satisfied the half-full invariant after the delete.
    Done,
    /// The child handled the delete but fell below half-full.
    Underflow,
}

/// Minimum records on a non-root page before it underflows.
fn min_record_count(max_record_count: u32) -> u32 {
    (max_record_count + 1) / 2
}

/// The record manager: B+tree operations over a page manager, with
/// per-operation transaction recording.
pub struct BTree {
    pager: PageManager,
    txns: TransactionManager,
}

impl BTree {
    /// Opens the tree for a named database in the catalog, creating its
    /// transaction log next to the data file.
    pub fn open(catalog: &FileCatalog, name: &str) -> Result<Self> {
        let handle = catalog.open(name)?;
        let fsync = catalog.config().fsync_enabled;
        let log_path = catalog.log_path(name);
        Self::with_parts(handle, fsync, log_path)
    }

    /// Opens the tree over an explicit handle and log path.
    pub fn with_parts(
        handle: FileHandle,
        fsync_enabled: bool,
        log_path: impl AsRef<std::path::Path>,
    ) -> Result<Self> {
        Ok(Self {
            pager: PageManager::open(handle, fsync_enabled)?,
            txns: TransactionManager::open(log_path)?,
        })
    }

    /// Returns the page manager.
    pub fn pager(&self) -> &PageManager {
        &self.pager
    }

    /// Returns the transaction manager.
    pub fn transactions(&self) -> &TransactionManager {
        &self.txns
    }

    /// Current tree height; 0 until the first insert.
    pub fn tree_height(&self) -> u32 {
        self.pager.meta().tree_height
    }

    /// Starts a new transaction.
    pub fn begin_transaction(&self, isolation: IsolationLevel) -> TxnId {
        self.txns.begin(isolation)
    }

    /// Commits a transaction, flushing its textual log record.
    pub fn commit(&self, txn: TxnId) -> Result<()> {
        self.txns.commit(txn)
    }

    // ---------------------------------------------------------------
    // Public record operations
    // ---------------------------------------------------------------

    /// Inserts a record. Fails with `DuplicateKey` if the key exists.
    pub fn insert(&mut self, record: &Record, txn: TxnId) -> Result<()> {
        let mut record = *record;
        record.header.transaction_id = txn.0;
        self.put_record(&record)?;
        self.txns.add_operation(Operation {
            txn_id: txn,
            kind: OperationKind::Insert,
            page_id: 0,
            record: Some(record),
            old_record: None,
        });
        Ok(())
    }

    /// Looks a record up by key. Read-only; nothing is recorded.
    pub fn find(&self, key: &Key) -> Result<Record> {
        if self.pager.meta().root_page_id == 0 {
            return Err(WudbError::KeyNotFound);
        }
        let leaf = self.find_leaf(key)?;
        leaf.find_record(key)
    }

    /// Returns all records with keys in `[low, high]`, in ascending key
    /// order. Read-only; nothing is recorded.
    pub fn range(&self, low: &Key, high: &Key) -> Result<Vec<Record>> {
        if self.pager.meta().root_page_id == 0 {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut page = self.find_leaf(low)?;
        loop {
            results.extend(page.range_query(low, high)?);
            match page.max_key() {
                Some(max) if max < *high => {}
                // Max key at or past the upper bound, or an empty leaf:
                // nothing further right can qualify.
                _ => break,
            }
            if page.header.next_page_id == 0 {
                break;
            }
            page = self.pager.get_page(page.header.next_page_id)?;
        }
        Ok(results)
    }

    /// Rewrites the value of an existing record in place. The before-image
    /// and the leaf page id are recorded for rollback.
    pub fn update(&mut self, record: &Record, txn: TxnId) -> Result<()> {
        if self.pager.meta().root_page_id == 0 {
            return Err(WudbError::KeyNotFound);
        }
        let mut record = *record;
        record.header.transaction_id = txn.0;

        let mut leaf = self.find_leaf(&record.key)?;
        let old = leaf.update_record(&record)?;
        self.pager.update_page(&leaf)?;

        self.txns.add_operation(Operation {
            txn_id: txn,
            kind: OperationKind::Update,
            page_id: leaf.id(),
            record: Some(record),
            old_record: Some(old),
        });
        Ok(())
    }

    /// Deletes a record by key. The before-image is recorded for rollback.
    pub fn delete(&mut self, key: &Key, txn: TxnId) -> Result<()> {
        let old = self.find(key)?;
        self.remove_key(key)?;
        self.txns.add_operation(Operation {
            txn_id: txn,
            kind: OperationKind::Delete,
            page_id: 0,
            record: None,
            old_record: Some(old),
        });
        Ok(())
    }

    /// Reverses every operation of the transaction, newest first, then
    /// marks it Aborted.
    pub fn rollback(&mut self, txn: TxnId) -> Result<()> {
        let operations = self.txns.operations(txn)?;
        for operation in operations.iter().rev() {
            self.apply_inverse(operation)?;
        }
        self.txns.rollback(txn)
    }

    /// Reverses the last operation of the transaction only, removing it
    /// from the operation list.
    pub fn undo(&mut self, txn: TxnId) -> Result<()> {
        match self.txns.undo(txn)? {
            Some(operation) => self.apply_inverse(&operation),
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------
    // Descent
    // ---------------------------------------------------------------

    /// Child page to descend into for `key`: the front pointer when the
    /// located separator is strictly greater, else the next pointer.
    fn next_child(&self, page: &Page, key: &Key) -> Result<u32> {
        let (_, record) = page.find_internal_record(key).ok_or_else(|| {
            WudbError::Storage(format!("internal page {} has no records", page.id()))
        })?;
        if record.key > *key {
            Ok(record.front_pointer)
        } else {
            Ok(record.next_pointer)
        }
    }

    /// Descends from the root to the leaf owning `key`.
    fn find_leaf(&self, key: &Key) -> Result<Page> {
        let mut page_id = self.pager.meta().root_page_id;
        loop {
            let page = self.pager.get_page(page_id)?;
            match page.header.page_type {
                PageType::Leaf => return Ok(page),
                PageType::Internal => page_id = self.next_child(&page, key)?,
                PageType::Meta => {
                    return Err(WudbError::InvalidPageType(PageType::Meta as u32))
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Insert path (non-recording)
    // ---------------------------------------------------------------

    /// Inserts without transaction recording. Also the rollback inverse of
    /// a delete.
    fn put_record(&mut self, record: &Record) -> Result<()> {
        if self.pager.meta().root_page_id == 0 {
            self.init_tree()?;
        }
        let root = self.pager.meta().root_page_id;
        if self.insert_into(root, record)?.is_some() {
            return Err(WudbError::Storage(
                "split separator left unabsorbed above the root".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates the first leaf and points the meta page at it.
    fn init_tree(&mut self) -> Result<()> {
        let page = self.pager.create_page(PageType::Leaf)?;
        let meta = self.pager.meta_mut();
        meta.root_page_id = page.id();
        meta.first_leaf_id = page.id();
        meta.last_leaf_id = page.id();
        meta.tree_height = 1;
        self.pager.write_meta_page()?;
        debug!(root = page.id(), "btree.init");
        Ok(())
    }

    /// Recursive insert. Returns the separator record for the caller to
    /// absorb when the page split; root splits are absorbed here.
    fn insert_into(&mut self, page_id: u32, record: &Record) -> Result<Option<InternalRecord>> {
        let mut page = self.pager.get_page(page_id)?;
        match page.header.page_type {
            PageType::Internal => {
                let child = self.next_child(&page, &record.key)?;
                match self.insert_into(child, record)? {
                    Some(bubbled) => self.place_separator(&mut page, &bubbled),
                    None => Ok(None),
                }
            }
            PageType::Leaf => match page.insert_record(record) {
                Ok(()) => {
                    self.pager.update_page(&page)?;
                    Ok(None)
                }
                Err(WudbError::PageFull) => self.split_leaf(&mut page, record),
                Err(e) => Err(e),
            },
            PageType::Meta => Err(WudbError::InvalidPageType(PageType::Meta as u32)),
        }
    }

    /// Absorbs a separator bubbled up from a split child.
    fn place_separator(
        &mut self,
        page: &mut Page,
        record: &InternalRecord,
    ) -> Result<Option<InternalRecord>> {
        match page.insert_internal_record(record) {
            Ok(()) => {
                self.pager.update_page(page)?;
                Ok(None)
            }
            Err(WudbError::PageFull) => self.split_internal(page, record),
            Err(e) => Err(e),
        }
    }

    /// Splits a full leaf, splices the sibling into the leaf list and
    /// places the incoming record on the side its key dictates.
    fn split_leaf(&mut self, page: &mut Page, record: &Record) -> Result<Option<InternalRecord>> {
        let mut sibling = self.pager.create_page(PageType::Leaf)?;
        let middle = page.split_records(&mut sibling)?;

        sibling.header.next_page_id = page.header.next_page_id;
        sibling.header.prev_page_id = page.id();
        page.header.next_page_id = sibling.id();
        if sibling.header.next_page_id != 0 {
            let mut right = self.pager.get_page(sibling.header.next_page_id)?;
            right.header.prev_page_id = sibling.id();
            self.pager.update_page(&right)?;
        }

        if record.key < middle {
            page.insert_record(record)?;
        } else {
            sibling.insert_record(record)?;
        }

        self.pager.update_page(page)?;
        self.pager.update_page(&sibling)?;

        if self.pager.meta().last_leaf_id == page.id() {
            self.pager.meta_mut().last_leaf_id = sibling.id();
            self.pager.write_meta_page()?;
        }

        debug!(page = page.id(), sibling = sibling.id(), "btree.split_leaf");
        self.promote_separator(page.id(), sibling.id(), middle)
    }

    /// Splits a full internal page, threading the sibling into the
    /// per-level prev/next list.
    fn split_internal(
        &mut self,
        page: &mut Page,
        record: &InternalRecord,
    ) -> Result<Option<InternalRecord>> {
        let mut sibling = self.pager.create_page(PageType::Internal)?;
        let middle = page.split_records(&mut sibling)?;

        sibling.header.next_page_id = page.header.next_page_id;
        sibling.header.prev_page_id = page.id();
        page.header.next_page_id = sibling.id();
        if sibling.header.next_page_id != 0 {
            let mut right = self.pager.get_page(sibling.header.next_page_id)?;
            right.header.prev_page_id = sibling.id();
            self.pager.update_page(&right)?;
        }

        if record.key < middle {
            page.insert_internal_record(record)?;
        } else {
            sibling.insert_internal_record(record)?;
        }

        self.pager.update_page(page)?;
        self.pager.update_page(&sibling)?;

        debug!(page = page.id(), sibling = sibling.id(), "btree.split_internal");
        self.promote_separator(page.id(), sibling.id(), middle)
    }

    /// Promotes a split's middle key: grows a new root in place when the
    /// split page was the root, otherwise hands the separator to the
    /// caller.
    fn promote_separator(
        &mut self,
        left: u32,
        right: u32,
        middle: Key,
    ) -> Result<Option<InternalRecord>> {
        if left == self.pager.meta().root_page_id {
            self.create_new_root(left, right, middle)?;
            Ok(None)
        } else {
            Ok(Some(InternalRecord::new(middle, left, right)))
        }
    }

    /// Allocates a new internal root over the two halves of a root split.
    fn create_new_root(&mut self, left: u32, right: u32, key: Key) -> Result<()> {
        let mut root = self.pager.create_page(PageType::Internal)?;
        root.insert_internal_record(&InternalRecord::new(key, left, right))?;
        self.pager.update_page(&root)?;

        let meta = self.pager.meta_mut();
        meta.root_page_id = root.id();
        meta.tree_height += 1;
        self.pager.write_meta_page()?;

        debug!(
            root = root.id(),
            height = self.pager.meta().tree_height,
            "btree.new_root"
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // Delete path (non-recording)
    // ---------------------------------------------------------------

    /// Deletes without transaction recording. Also the rollback inverse of
    /// an insert.
    fn remove_key(&mut self, key: &Key) -> Result<()> {
        let root = self.pager.meta().root_page_id;
        if root == 0 {
            return Err(WudbError::KeyNotFound);
        }
        // The root is exempt from the half-full invariant; an underflow
        // outcome surfacing here needs no further work.
        self.delete_from(root, key, None)?;
        Ok(())
    }

    /// Recursive delete. A leaf below half-full reports underflow for its
    /// parent to rebalance.
    ///
    /// `lower` is the inclusive start of the key window routed into this
    /// page; the parent needs it to tell a node's real first child apart
    /// from the dead front window a split leaves behind.
    fn delete_from(
        &mut self,
        page_id: u32,
        key: &Key,
        lower: Option<Key>,
    ) -> Result<DeleteOutcome> {
        let mut page = self.pager.get_page(page_id)?;
        match page.header.page_type {
            PageType::Leaf => {
                page.delete_record(key)?;
                self.pager.update_page(&page)?;

                let is_root = page_id == self.pager.meta().root_page_id;
                let below_half = (page.record_count() as u32)
                    < min_record_count(page.header.max_record_count);
                if !is_root && below_half {
                    Ok(DeleteOutcome::Underflow)
                } else {
                    Ok(DeleteOutcome::Done)
                }
            }
            PageType::Internal => {
                let (_, record) = page.find_internal_record(key).ok_or_else(|| {
                    WudbError::Storage(format!("internal page {} has no records", page_id))
                })?;
                // A front descent only happens below the first separator,
                // so the child window start carries over; a next descent
                // starts at the separator itself.
                let (child, child_lower) = if record.key > *key {
                    (record.front_pointer, lower)
                } else {
                    (record.next_pointer, Some(record.key))
                };
                match self.delete_from(child, key, child_lower)? {
                    DeleteOutcome::Done => Ok(DeleteOutcome::Done),
                    DeleteOutcome::Underflow => self.rebalance_child(&mut page, child, lower),
                }
            }
            PageType::Meta => Err(WudbError::InvalidPageType(PageType::Meta as u32)),
        }
    }

    /// Real children of an internal page in key order: the first record's
    /// front pointer when its window is live, then every next pointer.
    ///
    /// The front window is dead when the page's first separator equals its
    /// own routing window start, which is what a split leaves behind; the
    /// pointer then duplicates a cousin's tail child and must not be
    /// treated as a child of this page.
    fn live_children(page: &Page, lower: Option<Key>) -> Result<Vec<u32>> {
        let records = page.all_internal_records()?;
        let first = records.first().ok_or_else(|| {
            WudbError::Storage(format!("internal page {} has no records", page.id()))
        })?;
        let mut children = Vec::with_capacity(records.len() + 1);
        if lower.map_or(true, |lo| lo < first.key) {
            children.push(first.front_pointer);
        }
        children.extend(records.iter().map(|r| r.next_pointer));
        Ok(children)
    }

    /// Rebalances a deficient child: borrow from an adjacent sibling when
    /// one is above half-full, merge otherwise. The left sibling is
    /// preferred; only siblings under the same parent are eligible, so the
    /// separator fixup stays local.
    fn rebalance_child(
        &mut self,
        parent: &mut Page,
        child_id: u32,
        parent_lower: Option<Key>,
    ) -> Result<DeleteOutcome> {
        let mut child = self.pager.get_page(child_id)?;

        let children = Self::live_children(parent, parent_lower)?;
        let position = children.iter().position(|&id| id == child_id).ok_or_else(|| {
            WudbError::Storage(format!(
                "page {} is not a child of parent {}",
                child_id,
                parent.id()
            ))
        })?;
        let (sibling_id, is_left) = if position > 0 {
            (children[position - 1], true)
        } else if children.len() > 1 {
            (children[position + 1], false)
        } else {
            return Err(WudbError::Storage(format!(
                "page {} has no sibling under parent {}",
                child_id,
                parent.id()
            )));
        };
        let mut sibling = self.pager.get_page(sibling_id)?;

        let half = sibling.header.max_record_count / 2;
        if sibling.record_count() as u32 > half {
            self.borrow_from_sibling(parent, &mut child, &mut sibling, is_left)?;
            Ok(DeleteOutcome::Done)
        } else {
            self.merge_with_sibling(parent, child, sibling, is_left)
        }
    }

    /// Moves one boundary record from the sibling into the deficient child
    /// and rewrites the separator between them.
    fn borrow_from_sibling(
        &mut self,
        parent: &mut Page,
        child: &mut Page,
        sibling: &mut Page,
        is_left: bool,
    ) -> Result<()> {
        let (left_id, right_id) = if is_left {
            (sibling.id(), child.id())
        } else {
            (child.id(), sibling.id())
        };
        let slot = parent.find_separator_slot(left_id, right_id).ok_or_else(|| {
            WudbError::Storage(format!(
                "parent {} has no separator for children {} and {}",
                parent.id(),
                left_id,
                right_id
            ))
        })?;
        let old_sep = parent.get_internal_record(slot)?.key;

        if child.is_leaf() {
            if is_left {
                let moved = sibling.remove_last_record()?;
                child.insert_record(&moved)?;
                parent.set_internal_key(slot, &moved.key)?;
            } else {
                let moved = sibling.remove_first_record()?;
                child.insert_record(&moved)?;
                let new_sep = sibling.min_key().ok_or(WudbError::PageUnderflow)?;
                parent.set_internal_key(slot, &new_sep)?;
            }
        } else if is_left {
            // The moved record's next child changes hands. When the
            // child's first separator equals the parent separator, its
            // front window is dead and the moved record splices in as-is;
            // otherwise the parent separator descends as a bridge carrying
            // the moved child.
            let moved = sibling.remove_last_internal_record()?;
            let child_first = child.first_internal_record()?;
            if child_first.key == old_sep {
                child.insert_internal_record(&moved)?;
            } else {
                child.insert_internal_record(&InternalRecord::new(
                    old_sep,
                    moved.next_pointer,
                    child_first.front_pointer,
                ))?;
            }
            parent.set_internal_key(slot, &moved.key)?;
        } else {
            // Mirror case: the sibling's first record gives up its front
            // child unless that window is dead, in which case its next
            // child moves instead and the separator advances one key
            // further into the sibling.
            let moved = sibling.remove_first_internal_record()?;
            let child_last = child.last_internal_record()?;
            if moved.key == old_sep {
                child.insert_internal_record(&InternalRecord::new(
                    old_sep,
                    child_last.next_pointer,
                    moved.next_pointer,
                ))?;
                let new_sep = sibling.first_internal_record()?.key;
                parent.set_internal_key(slot, &new_sep)?;
            } else {
                child.insert_internal_record(&InternalRecord::new(
                    old_sep,
                    child_last.next_pointer,
                    moved.front_pointer,
                ))?;
                parent.set_internal_key(slot, &moved.key)?;
            }
        }

        self.pager.update_page(child)?;
        self.pager.update_page(sibling)?;
        self.pager.update_page(parent)?;
        debug!(
            child = child.id(),
            sibling = sibling.id(),
            from_left = is_left,
            "btree.borrow"
        );
        Ok(())
    }

    /// Merges the deficient child with its sibling (right half into left),
    /// removes the separator between them from the parent and disposes the
    /// emptied page.
    fn merge_with_sibling(
        &mut self,
        parent: &mut Page,
        child: Page,
        sibling: Page,
        is_left: bool,
    ) -> Result<DeleteOutcome> {
        let (mut target, mut source) = if is_left {
            (sibling, child)
        } else {
            (child, sibling)
        };

        let slot = parent
            .find_separator_slot(target.id(), source.id())
            .ok_or_else(|| {
                WudbError::Storage(format!(
                    "parent {} has no separator for children {} and {}",
                    parent.id(),
                    target.id(),
                    source.id()
                ))
            })?;
        let old_sep = parent.get_internal_record(slot)?.key;

        if target.is_leaf() {
            for record in source.all_records()? {
                target.insert_record(&record)?;
            }
        } else {
            // The source's leading front window is dead when its first key
            // equals the separator; otherwise the separator descends as a
            // bridge so the window between the halves keeps routing to the
            // source's first child.
            let records = source.all_internal_records()?;
            let first = records
                .first()
                .copied()
                .ok_or(WudbError::PageUnderflow)?;
            let tail_next = target.last_internal_record()?.next_pointer;
            if first.key == old_sep {
                let mut grafted = first;
                grafted.front_pointer = tail_next;
                target.insert_internal_record(&grafted)?;
            } else {
                target.insert_internal_record(&InternalRecord::new(
                    old_sep,
                    tail_next,
                    first.front_pointer,
                ))?;
                target.insert_internal_record(&first)?;
            }
            for record in &records[1..] {
                target.insert_internal_record(record)?;
            }
        }

        // Unlink the source from the per-level sibling chain.
        target.header.next_page_id = source.header.next_page_id;
        if source.header.next_page_id != 0 {
            let mut right = self.pager.get_page(source.header.next_page_id)?;
            right.header.prev_page_id = target.id();
            self.pager.update_page(&right)?;
        }

        parent.remove_internal_record_at(slot)?;

        self.pager.update_page(&target)?;
        self.pager.update_page(parent)?;
        self.pager.dispose_page(&mut source)?;

        if target.is_leaf() {
            let meta = self.pager.meta_mut();
            let mut dirty = false;
            if meta.last_leaf_id == source.id() {
                meta.last_leaf_id = target.id();
                dirty = true;
            }
            if meta.first_leaf_id == source.id() {
                meta.first_leaf_id = target.id();
                dirty = true;
            }
            if dirty {
                self.pager.write_meta_page()?;
            }
        }

        debug!(
            target = target.id(),
            disposed = source.id(),
            "btree.merge"
        );

        let is_root = parent.id() == self.pager.meta().root_page_id;
        if is_root && parent.record_count() == 0 {
            self.decrease_tree_height(parent, target.id())?;
            return Ok(DeleteOutcome::Done);
        }
        if !is_root
            && (parent.record_count() as u32) < min_record_count(parent.header.max_record_count)
        {
            return Ok(DeleteOutcome::Underflow);
        }
        Ok(DeleteOutcome::Done)
    }

    /// Promotes the root's only remaining child after a merge emptied the
    /// root, shrinking the tree by one level.
    fn decrease_tree_height(&mut self, old_root: &mut Page, child_id: u32) -> Result<()> {
        let meta = self.pager.meta_mut();
        meta.root_page_id = child_id;
        meta.tree_height -= 1;
        self.pager.write_meta_page()?;
        self.pager.dispose_page(old_root)?;
        debug!(
            root = child_id,
            height = self.pager.meta().tree_height,
            "btree.decrease_height"
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // Rollback / undo
    // ---------------------------------------------------------------

    /// Applies the inverse of one operation through non-recording paths.
    fn apply_inverse(&mut self, operation: &Operation) -> Result<()> {
        match operation.kind {
            OperationKind::Insert => {
                let record = operation.record.ok_or_else(|| {
                    WudbError::Storage("insert operation without a record".to_string())
                })?;
                self.remove_key(&record.key)
            }
            OperationKind::Delete => {
                let old = operation.old_record.ok_or_else(|| {
                    WudbError::Storage("delete operation without a before-image".to_string())
                })?;
                self.put_record(&old)
            }
            OperationKind::Update => self.apply_before_image(operation),
        }
    }

    /// Re-applies an update's before-image onto the recorded leaf page,
    /// falling back to a fresh descent when the record has migrated off it
    /// through later splits or merges. A disposed page may still hold stale
    /// bytes for the key and must not be written.
    fn apply_before_image(&mut self, operation: &Operation) -> Result<()> {
        let old = operation.old_record.ok_or_else(|| {
            WudbError::Storage("update operation without a before-image".to_string())
        })?;

        let mut page = self.pager.get_page(operation.page_id)?;
        if page.is_leaf() && !page.header.flags.is_disposed() {
            match page.update_record(&old) {
                Ok(_) => return self.pager.update_page(&page),
                Err(WudbError::KeyNotFound) => {}
                Err(e) => return Err(e),
            }
        }

        let mut leaf = self.find_leaf(&old.key)?;
        leaf.update_record(&old)?;
        self.pager.update_page(&leaf)
    }

    // ---------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------

    /// Renders a breadth-first dump of the tree: one line per page with its
    /// type, record count and (for leaves) sibling links.
    pub fn tree_walk(&self) -> Result<String> {
        use std::collections::VecDeque;

        let meta = self.pager.meta();
        let mut out = String::new();
        if meta.root_page_id == 0 {
            out.push_str("empty tree\n");
            return Ok(out);
        }

        let _ = writeln!(out, "b+tree (height {})", meta.tree_height);
        let mut queue: VecDeque<(u32, u32, Option<Key>)> =
            VecDeque::from([(meta.root_page_id, 1, None)]);
        let mut current_level = 1;

        while let Some((page_id, level, lower)) = queue.pop_front() {
            if level > current_level {
                let _ = writeln!(out, "----");
                current_level = level;
            }

            let page = self.pager.get_page(page_id)?;
            match page.header.page_type {
                PageType::Leaf => {
                    let _ = writeln!(
                        out,
                        "leaf {} records={} prev={} next={}",
                        page_id,
                        page.record_count(),
                        page.header.prev_page_id,
                        page.header.next_page_id,
                    );
                }
                PageType::Internal => {
                    let _ = writeln!(
                        out,
                        "internal {} records={}",
                        page_id,
                        page.record_count()
                    );
                    let records = page.all_internal_records()?;
                    if let Some(first) = records.first() {
                        if lower.map_or(true, |lo| lo < first.key) {
                            queue.push_back((first.front_pointer, level + 1, lower));
                        }
                    }
                    for record in &records {
                        queue.push_back((record.next_pointer, level + 1, Some(record.key)));
                    }
                }
                PageType::Meta => {
                    return Err(WudbError::InvalidPageType(PageType::Meta as u32))
                }
            }
        }
        debug!(height = meta.tree_height, "btree.tree_walk");
        Ok(out)
    }
}
