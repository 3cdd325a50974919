//! In-memory page with leaf and internal record operations.
//!
//! A page is the 4096-byte I/O granule: a 64-byte header, a 512-byte key
//! area and a 3520-byte value area. Records occupy parallel arrays: key
//! slot `i` sits at key-area offset `i * 32`, the full 192-byte record at
//! value-area offset `i * record_size`. Internal pages share the layout;
//! their slots hold separator records with two child pointers each.

use std::cmp::Ordering;
use wudb_common::error::{Result, WudbError};
use wudb_common::page::{
    PageHeader, PageType, KEY_AREA_SIZE, PAGE_SIZE, VALUE_AREA_OFFSET, VALUE_AREA_SIZE,
};
use wudb_common::record::{
    InternalRecord, Key, Record, KEY_SIZE, RECORD_HEADER_SIZE, RECORD_SIZE,
};

/// Value-area offset of an internal record's front pointer.
const FRONT_POINTER_OFFSET: usize = RECORD_HEADER_SIZE + KEY_SIZE;
/// Value-area offset of an internal record's next pointer.
const NEXT_POINTER_OFFSET: usize = FRONT_POINTER_OFFSET + 4;

/// A materialized page.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    /// Page header.
    pub header: PageHeader,
    keys: [u8; KEY_AREA_SIZE],
    values: [u8; VALUE_AREA_SIZE],
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Creates an empty page of the given type.
    pub fn new(page_id: u32, page_type: PageType) -> Self {
        Self {
            header: PageHeader::new(page_id, page_type, RECORD_SIZE as u32),
            keys: [0u8; KEY_AREA_SIZE],
            values: [0u8; VALUE_AREA_SIZE],
        }
    }

    /// Page id shorthand.
    pub fn id(&self) -> u32 {
        self.header.page_id
    }

    /// Number of occupied record slots.
    pub fn record_count(&self) -> usize {
        self.header.record_count as usize
    }

    /// Maximum record slots on this page.
    pub fn max_records(&self) -> usize {
        self.header.max_record_count as usize
    }

    /// Record width in bytes.
    fn record_size(&self) -> usize {
        self.header.record_size as usize
    }

    /// Returns true if this is a leaf page.
    pub fn is_leaf(&self) -> bool {
        self.header.page_type == PageType::Leaf
    }

    /// Returns true if this is an internal page.
    pub fn is_internal(&self) -> bool {
        self.header.page_type == PageType::Internal
    }

    // ---------------------------------------------------------------
    // Byte-level region access
    // ---------------------------------------------------------------

    /// Reads `len` bytes at `offset` within the key area.
    pub fn read_key(&self, offset: usize, len: usize) -> Result<&[u8]> {
        if offset + len > KEY_AREA_SIZE {
            return Err(WudbError::OutOfRange {
                offset,
                len,
                region: "key",
            });
        }
        Ok(&self.keys[offset..offset + len])
    }

    /// Writes bytes at `offset` within the key area.
    pub fn write_key(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        if offset + data.len() > KEY_AREA_SIZE {
            return Err(WudbError::OutOfRange {
                offset,
                len: data.len(),
                region: "key",
            });
        }
        self.keys[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Reads `len` bytes at `offset` within the value area.
    pub fn read_value(&self, offset: usize, len: usize) -> Result<&[u8]> {
        if offset + len > VALUE_AREA_SIZE {
            return Err(WudbError::OutOfRange {
                offset,
                len,
                region: "value",
            });
        }
        Ok(&self.values[offset..offset + len])
    }

    /// Writes bytes at `offset` within the value area.
    pub fn write_value(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        if offset + data.len() > VALUE_AREA_SIZE {
            return Err(WudbError::OutOfRange {
                offset,
                len: data.len(),
                region: "value",
            });
        }
        self.values[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------

    /// Serializes the page to its 4096-byte on-disk form.
    pub fn serialize(&self) -> [u8; PAGE_SIZE] {
        let mut buf = [0u8; PAGE_SIZE];
        buf[..PageHeader::SIZE].copy_from_slice(&self.header.to_bytes());
        buf[PageHeader::SIZE..VALUE_AREA_OFFSET].copy_from_slice(&self.keys);
        buf[VALUE_AREA_OFFSET..].copy_from_slice(&self.values);
        buf
    }

    /// Deserializes a page from exactly 4096 bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() != PAGE_SIZE {
            return Err(WudbError::PageSizeMismatch {
                expected: PAGE_SIZE,
                actual: data.len(),
            });
        }
        let header = PageHeader::from_bytes(&data[..PageHeader::SIZE])?;
        let mut keys = [0u8; KEY_AREA_SIZE];
        keys.copy_from_slice(&data[PageHeader::SIZE..VALUE_AREA_OFFSET]);
        let mut values = [0u8; VALUE_AREA_SIZE];
        values.copy_from_slice(&data[VALUE_AREA_OFFSET..]);
        Ok(Self {
            header,
            keys,
            values,
        })
    }

    // ---------------------------------------------------------------
    // Slot helpers
    // ---------------------------------------------------------------

    fn key_at(&self, i: usize) -> &[u8] {
        &self.keys[i * KEY_SIZE..(i + 1) * KEY_SIZE]
    }

    fn set_key_at(&mut self, i: usize, key: &Key) {
        self.keys[i * KEY_SIZE..(i + 1) * KEY_SIZE].copy_from_slice(key);
    }

    fn record_bytes_at(&self, i: usize) -> &[u8] {
        let rs = self.record_size();
        &self.values[i * rs..(i + 1) * rs]
    }

    fn set_record_bytes_at(&mut self, i: usize, bytes: &[u8]) {
        let rs = self.record_size();
        self.values[i * rs..(i + 1) * rs].copy_from_slice(bytes);
    }

    /// Binary search over the parallel key array.
    fn search_keys(&self, key: &Key) -> std::result::Result<usize, usize> {
        let mut lo = 0usize;
        let mut hi = self.record_count();
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.key_at(mid).cmp(&key[..]) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }

    /// Opens a gap at `idx` by shifting subsequent slots right by one.
    fn shift_right_from(&mut self, idx: usize) {
        let n = self.record_count();
        let rs = self.record_size();
        self.keys
            .copy_within(idx * KEY_SIZE..n * KEY_SIZE, (idx + 1) * KEY_SIZE);
        self.values.copy_within(idx * rs..n * rs, (idx + 1) * rs);
    }

    /// Closes the gap at `idx` by shifting subsequent slots left by one and
    /// zeroing the vacated slot.
    fn remove_slot(&mut self, idx: usize) {
        let n = self.record_count();
        let rs = self.record_size();
        self.keys
            .copy_within((idx + 1) * KEY_SIZE..n * KEY_SIZE, idx * KEY_SIZE);
        self.values.copy_within((idx + 1) * rs..n * rs, idx * rs);
        self.keys[(n - 1) * KEY_SIZE..n * KEY_SIZE].fill(0);
        self.values[(n - 1) * rs..n * rs].fill(0);
        self.header.record_count -= 1;
        self.sync_free_space();
        self.header.touch();
    }

    fn place_slot(&mut self, idx: usize, key: &Key, bytes: &[u8]) {
        self.shift_right_from(idx);
        self.set_key_at(idx, key);
        self.set_record_bytes_at(idx, bytes);
        self.header.record_count += 1;
        self.sync_free_space();
        self.header.touch();
    }

    fn sync_free_space(&mut self) {
        let used = self.record_count() * self.record_size();
        self.header.free_space_start = (VALUE_AREA_OFFSET + used) as u32;
        self.header.free_space_end = PAGE_SIZE as u32;
    }

    fn check_slot(&self, i: usize) -> Result<()> {
        if i >= self.record_count() {
            return Err(WudbError::Storage(format!(
                "record slot {} out of bounds (count {})",
                i,
                self.record_count()
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Leaf record operations
    // ---------------------------------------------------------------

    /// Inserts a record in key order.
    pub fn insert_record(&mut self, record: &Record) -> Result<()> {
        let idx = match self.search_keys(&record.key) {
            Ok(_) => return Err(WudbError::DuplicateKey),
            Err(idx) => idx,
        };
        if self.record_count() == self.max_records() {
            return Err(WudbError::PageFull);
        }
        self.place_slot(idx, &record.key, &record.to_bytes());
        Ok(())
    }

    /// Returns the record at slot `i`.
    pub fn get_record(&self, i: usize) -> Result<Record> {
        self.check_slot(i)?;
        Record::from_bytes(self.record_bytes_at(i))
    }

    /// Finds a record by key. Linear scan over occupied slots.
    pub fn find_record(&self, key: &Key) -> Result<Record> {
        for i in 0..self.record_count() {
            if self.key_at(i) == &key[..] {
                return self.get_record(i);
            }
        }
        Err(WudbError::KeyNotFound)
    }

    /// Returns records with keys in `[low, high]`, in slot order.
    pub fn range_query(&self, low: &Key, high: &Key) -> Result<Vec<Record>> {
        let mut results = Vec::new();
        for i in 0..self.record_count() {
            let key = self.key_at(i);
            if key >= &low[..] && key <= &high[..] {
                results.push(self.get_record(i)?);
            }
        }
        Ok(results)
    }

    /// Deletes a record by key.
    pub fn delete_record(&mut self, key: &Key) -> Result<()> {
        match self.search_keys(key) {
            Ok(idx) => {
                self.remove_slot(idx);
                Ok(())
            }
            Err(_) => Err(WudbError::KeyNotFound),
        }
    }

    /// Rewrites the value of an existing record in place, returning the
    /// previous version. The key never changes through this path.
    pub fn update_record(&mut self, record: &Record) -> Result<Record> {
        match self.search_keys(&record.key) {
            Ok(idx) => {
                let old = self.get_record(idx)?;
                self.set_record_bytes_at(idx, &record.to_bytes());
                self.header.touch();
                Ok(old)
            }
            Err(_) => Err(WudbError::KeyNotFound),
        }
    }

    /// Returns all records in slot order.
    pub fn all_records(&self) -> Result<Vec<Record>> {
        (0..self.record_count()).map(|i| self.get_record(i)).collect()
    }

    /// Smallest key on the page.
    pub fn min_key(&self) -> Option<Key> {
        if self.record_count() == 0 {
            return None;
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(self.key_at(0));
        Some(key)
    }

    /// Largest key on the page.
    pub fn max_key(&self) -> Option<Key> {
        let n = self.record_count();
        if n == 0 {
            return None;
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(self.key_at(n - 1));
        Some(key)
    }

    /// Removes and returns the first record.
    pub fn remove_first_record(&mut self) -> Result<Record> {
        let record = self.get_record(0)?;
        self.remove_slot(0);
        Ok(record)
    }

    /// Removes and returns the last record.
    pub fn remove_last_record(&mut self) -> Result<Record> {
        let n = self.record_count();
        let record = self.get_record(n.wrapping_sub(1))?;
        self.remove_slot(n - 1);
        Ok(record)
    }

    /// Moves the upper half of the records (`count / 2` onward) to `other`
    /// and returns the first key moved. Works for both leaf and internal
    /// pages; slots are moved as opaque 192-byte blobs.
    pub fn split_records(&mut self, other: &mut Page) -> Result<Key> {
        let n = self.record_count();
        if n < 2 {
            return Err(WudbError::Storage(
                "cannot split a page with fewer than two records".to_string(),
            ));
        }
        let mid = n / 2;
        let rs = self.record_size();
        let dst = other.record_count();

        for (j, i) in (mid..n).enumerate() {
            let slot = dst + j;
            other.keys[slot * KEY_SIZE..(slot + 1) * KEY_SIZE]
                .copy_from_slice(self.key_at(i));
            other.values[slot * rs..(slot + 1) * rs]
                .copy_from_slice(self.record_bytes_at(i));
        }
        other.header.record_count += (n - mid) as u32;
        other.sync_free_space();
        other.header.touch();

        self.keys[mid * KEY_SIZE..n * KEY_SIZE].fill(0);
        self.values[mid * rs..n * rs].fill(0);
        self.header.record_count = mid as u32;
        self.sync_free_space();
        self.header.touch();

        let mut middle = [0u8; KEY_SIZE];
        middle.copy_from_slice(other.key_at(dst));
        Ok(middle)
    }

    // ---------------------------------------------------------------
    // Internal record operations
    // ---------------------------------------------------------------

    /// Returns the internal record at slot `i`.
    pub fn get_internal_record(&self, i: usize) -> Result<InternalRecord> {
        self.check_slot(i)?;
        InternalRecord::from_bytes(self.record_bytes_at(i))
    }

    /// First internal record on the page.
    pub fn first_internal_record(&self) -> Result<InternalRecord> {
        self.get_internal_record(0)
    }

    /// Last internal record on the page.
    pub fn last_internal_record(&self) -> Result<InternalRecord> {
        let n = self.record_count();
        if n == 0 {
            return Err(WudbError::Storage(
                "internal page has no records".to_string(),
            ));
        }
        self.get_internal_record(n - 1)
    }

    /// Locates the separator whose key window contains `key` and returns
    /// its slot and record.
    ///
    /// With separators `K_0 < ... < K_{n-1}`: keys below `K_0` map to slot
    /// 0, keys at or above `K_{n-1}` to slot `n-1`, anything else to the
    /// unique `i` with `K_i <= key < K_{i+1}`.
    pub fn find_internal_record(&self, key: &Key) -> Option<(usize, InternalRecord)> {
        let n = self.record_count();
        if n == 0 {
            return None;
        }
        // First slot whose separator is strictly greater than the key.
        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.key_at(mid) <= &key[..] {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let i = if lo == 0 { 0 } else { (lo - 1).min(n - 1) };
        self.get_internal_record(i).ok().map(|record| (i, record))
    }

    /// Inserts a separator record in key order.
    ///
    /// Neighboring slots are patched so that `next_pointer` of slot `i`
    /// stays equal to `front_pointer` of slot `i + 1`: a bubbled-up record
    /// `(K, left, right)` retargets the successor separator that still
    /// points at the pre-split child.
    pub fn insert_internal_record(&mut self, record: &InternalRecord) -> Result<()> {
        let idx = match self.search_keys(&record.key) {
            Ok(_) => return Err(WudbError::DuplicateKey),
            Err(idx) => idx,
        };
        if self.record_count() == self.max_records() {
            return Err(WudbError::PageFull);
        }
        self.place_slot(idx, &record.key, &record.to_bytes());

        if idx > 0 {
            self.set_internal_next_pointer(idx - 1, record.front_pointer);
        }
        if idx + 1 < self.record_count() {
            self.set_internal_front_pointer(idx + 1, record.next_pointer);
        }
        Ok(())
    }

    /// Removes and returns the first internal record.
    pub fn remove_first_internal_record(&mut self) -> Result<InternalRecord> {
        let record = self.get_internal_record(0)?;
        self.remove_slot(0);
        Ok(record)
    }

    /// Removes and returns the last internal record.
    pub fn remove_last_internal_record(&mut self) -> Result<InternalRecord> {
        let n = self.record_count();
        if n == 0 {
            return Err(WudbError::Storage(
                "internal page has no records".to_string(),
            ));
        }
        let record = self.get_internal_record(n - 1)?;
        self.remove_slot(n - 1);
        Ok(record)
    }

    /// Removes the separator at slot `i`, retargeting the successor slot's
    /// front pointer at the removed record's front child so the pointer
    /// adjacency across the gap survives.
    pub fn remove_internal_record_at(&mut self, i: usize) -> Result<InternalRecord> {
        let record = self.get_internal_record(i)?;
        self.remove_slot(i);
        if i < self.record_count() {
            self.set_internal_front_pointer(i, record.front_pointer);
        }
        Ok(record)
    }

    /// Returns all internal records in slot order.
    pub fn all_internal_records(&self) -> Result<Vec<InternalRecord>> {
        (0..self.record_count())
            .map(|i| self.get_internal_record(i))
            .collect()
    }

    /// Rewrites the separator key of slot `i` in both parallel arrays.
    pub fn set_internal_key(&mut self, i: usize, key: &Key) -> Result<()> {
        self.check_slot(i)?;
        self.set_key_at(i, key);
        let rs = self.record_size();
        let off = i * rs + RECORD_HEADER_SIZE;
        self.values[off..off + KEY_SIZE].copy_from_slice(key);
        self.header.touch();
        Ok(())
    }

    /// Rewrites the front pointer of slot `i`.
    pub fn set_internal_front_pointer(&mut self, i: usize, page_id: u32) {
        let rs = self.record_size();
        let off = i * rs + FRONT_POINTER_OFFSET;
        self.values[off..off + 4].copy_from_slice(&page_id.to_le_bytes());
    }

    /// Rewrites the next pointer of slot `i`.
    pub fn set_internal_next_pointer(&mut self, i: usize, page_id: u32) {
        let rs = self.record_size();
        let off = i * rs + NEXT_POINTER_OFFSET;
        self.values[off..off + 4].copy_from_slice(&page_id.to_le_bytes());
    }

    /// Slot of the separator routing the pair `(left, right)` of adjacent
    /// children, if present.
    pub fn find_separator_slot(&self, left: u32, right: u32) -> Option<usize> {
        for i in 0..self.record_count() {
            if let Ok(record) = self.get_internal_record(i) {
                if record.front_pointer == left && record.next_pointer == right {
                    return Some(i);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wudb_common::record::{key_from_slice, value_from_slice};

    fn leaf() -> Page {
        Page::new(1, PageType::Leaf)
    }

    fn internal() -> Page {
        Page::new(2, PageType::Internal)
    }

    fn record(key_byte: u8) -> Record {
        Record::new(key_from_slice(&[key_byte]), value_from_slice(&[key_byte]))
    }

    #[test]
    fn test_region_bounds() {
        let mut page = leaf();
        assert!(page.write_key(0, &[1, 2, 3]).is_ok());
        assert!(page.write_key(509, &[1, 2, 3]).is_ok());
        assert!(matches!(
            page.write_key(510, &[1, 2, 3]),
            Err(WudbError::OutOfRange { region: "key", .. })
        ));

        assert!(page.write_value(3517, &[1, 2, 3]).is_ok());
        assert!(matches!(
            page.read_value(3520, 1),
            Err(WudbError::OutOfRange { region: "value", .. })
        ));

        assert_eq!(page.read_key(0, 3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_serialize_is_page_sized() {
        let page = leaf();
        assert_eq!(page.serialize().len(), PAGE_SIZE);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut page = leaf();
        for i in [3u8, 1, 2] {
            page.insert_record(&record(i)).unwrap();
        }
        page.header.prev_page_id = 9;
        page.header.next_page_id = 10;

        let bytes = page.serialize();
        let decoded = Page::deserialize(&bytes).unwrap();
        assert_eq!(decoded, page);
    }

    #[test]
    fn test_deserialize_rejects_wrong_size() {
        assert!(matches!(
            Page::deserialize(&[0u8; 100]),
            Err(WudbError::PageSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_insert_keeps_key_order() {
        let mut page = leaf();
        for i in [5u8, 1, 9, 3, 7] {
            page.insert_record(&record(i)).unwrap();
        }
        assert_eq!(page.record_count(), 5);

        let keys: Vec<u8> = page.all_records().unwrap().iter().map(|r| r.key[0]).collect();
        assert_eq!(keys, vec![1, 3, 5, 7, 9]);
        assert_eq!(page.min_key().unwrap()[0], 1);
        assert_eq!(page.max_key().unwrap()[0], 9);
    }

    #[test]
    fn test_insert_duplicate_key() {
        let mut page = leaf();
        page.insert_record(&record(4)).unwrap();
        assert!(matches!(
            page.insert_record(&record(4)),
            Err(WudbError::DuplicateKey)
        ));
        assert_eq!(page.record_count(), 1);
    }

    #[test]
    fn test_insert_page_full() {
        let mut page = leaf();
        for i in 0..16u8 {
            page.insert_record(&record(i)).unwrap();
        }
        assert_eq!(page.record_count(), page.max_records());
        assert!(matches!(
            page.insert_record(&record(100)),
            Err(WudbError::PageFull)
        ));
    }

    #[test]
    fn test_find_record() {
        let mut page = leaf();
        page.insert_record(&record(2)).unwrap();
        page.insert_record(&record(8)).unwrap();

        let found = page.find_record(&key_from_slice(&[8])).unwrap();
        assert_eq!(found.value[0], 8);
        assert!(matches!(
            page.find_record(&key_from_slice(&[3])),
            Err(WudbError::KeyNotFound)
        ));
    }

    #[test]
    fn test_delete_record_shifts_slots() {
        let mut page = leaf();
        for i in 1..=5u8 {
            page.insert_record(&record(i)).unwrap();
        }
        page.delete_record(&key_from_slice(&[3])).unwrap();
        assert_eq!(page.record_count(), 4);

        let keys: Vec<u8> = page.all_records().unwrap().iter().map(|r| r.key[0]).collect();
        assert_eq!(keys, vec![1, 2, 4, 5]);

        assert!(matches!(
            page.delete_record(&key_from_slice(&[3])),
            Err(WudbError::KeyNotFound)
        ));
    }

    #[test]
    fn test_delete_zeroes_vacated_slot() {
        let mut page = leaf();
        page.insert_record(&record(1)).unwrap();
        page.delete_record(&key_from_slice(&[1])).unwrap();

        assert!(page.keys.iter().all(|&b| b == 0));
        assert!(page.values.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_update_record_returns_before_image() {
        let mut page = leaf();
        page.insert_record(&record(5)).unwrap();

        let replacement = Record::new(key_from_slice(&[5]), value_from_slice(&[0xee]));
        let old = page.update_record(&replacement).unwrap();
        assert_eq!(old.value[0], 5);

        let found = page.find_record(&key_from_slice(&[5])).unwrap();
        assert_eq!(found.value[0], 0xee);

        let missing = Record::new(key_from_slice(&[6]), value_from_slice(&[1]));
        assert!(matches!(
            page.update_record(&missing),
            Err(WudbError::KeyNotFound)
        ));
    }

    #[test]
    fn test_range_query_inclusive() {
        let mut page = leaf();
        for i in 0..10u8 {
            page.insert_record(&record(i)).unwrap();
        }
        let results = page
            .range_query(&key_from_slice(&[2]), &key_from_slice(&[6]))
            .unwrap();
        let keys: Vec<u8> = results.iter().map(|r| r.key[0]).collect();
        assert_eq!(keys, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_split_records_at_midpoint() {
        let mut page = leaf();
        for i in 0..10u8 {
            page.insert_record(&record(i)).unwrap();
        }

        let mut sibling = Page::new(3, PageType::Leaf);
        let middle = page.split_records(&mut sibling).unwrap();

        assert_eq!(page.record_count(), 5);
        assert_eq!(sibling.record_count(), 5);
        assert_eq!(middle, key_from_slice(&[5]));
        assert_eq!(page.max_key().unwrap()[0], 4);
        assert_eq!(sibling.min_key().unwrap()[0], 5);

        // Vacated upper half of the original is zeroed.
        assert!(page.keys[5 * KEY_SIZE..].iter().all(|&b| b == 0));
        assert!(page.values[5 * RECORD_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_split_refuses_tiny_page() {
        let mut page = leaf();
        page.insert_record(&record(1)).unwrap();
        let mut sibling = Page::new(3, PageType::Leaf);
        assert!(page.split_records(&mut sibling).is_err());
    }

    #[test]
    fn test_remove_first_and_last() {
        let mut page = leaf();
        for i in 1..=4u8 {
            page.insert_record(&record(i)).unwrap();
        }
        let first = page.remove_first_record().unwrap();
        assert_eq!(first.key[0], 1);
        let last = page.remove_last_record().unwrap();
        assert_eq!(last.key[0], 4);
        assert_eq!(page.record_count(), 2);
        assert_eq!(page.min_key().unwrap()[0], 2);
        assert_eq!(page.max_key().unwrap()[0], 3);
    }

    #[test]
    fn test_free_space_tracks_record_count() {
        let mut page = leaf();
        assert_eq!(page.header.free_space_start as usize, VALUE_AREA_OFFSET);
        page.insert_record(&record(1)).unwrap();
        assert_eq!(
            page.header.free_space_start as usize,
            VALUE_AREA_OFFSET + RECORD_SIZE
        );
        page.delete_record(&key_from_slice(&[1])).unwrap();
        assert_eq!(page.header.free_space_start as usize, VALUE_AREA_OFFSET);
    }

    #[test]
    fn test_find_internal_record_windows() {
        let mut page = internal();
        // Separators 10, 20, 30 over children 1|2|3|4.
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[10]), 1, 2))
            .unwrap();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[20]), 2, 3))
            .unwrap();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[30]), 3, 4))
            .unwrap();

        // Below the first separator: slot 0.
        let (i, r) = page.find_internal_record(&key_from_slice(&[5])).unwrap();
        assert_eq!((i, r.key[0]), (0, 10));

        // Window [10, 20): slot 0; [20, 30): slot 1.
        let (i, _) = page.find_internal_record(&key_from_slice(&[15])).unwrap();
        assert_eq!(i, 0);
        let (i, _) = page.find_internal_record(&key_from_slice(&[20])).unwrap();
        assert_eq!(i, 1);
        let (i, _) = page.find_internal_record(&key_from_slice(&[25])).unwrap();
        assert_eq!(i, 1);

        // At or above the last separator: slot n-1.
        let (i, _) = page.find_internal_record(&key_from_slice(&[30])).unwrap();
        assert_eq!(i, 2);
        let (i, _) = page.find_internal_record(&key_from_slice(&[99])).unwrap();
        assert_eq!(i, 2);
    }

    #[test]
    fn test_find_internal_record_empty_page() {
        let page = internal();
        assert!(page.find_internal_record(&key_from_slice(&[1])).is_none());
    }

    #[test]
    fn test_insert_internal_record_patches_neighbors() {
        let mut page = internal();
        // Children 1|2|5 with separators 10 and 30.
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[10]), 1, 2))
            .unwrap();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[30]), 2, 5))
            .unwrap();

        // Child 2 split into 2 and 4 at separator 20.
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[20]), 2, 4))
            .unwrap();

        let records = page.all_internal_records().unwrap();
        assert_eq!(records.len(), 3);
        // Slot adjacency holds: next of slot i equals front of slot i+1.
        assert_eq!(records[0].next_pointer, records[1].front_pointer);
        assert_eq!(records[1].next_pointer, records[2].front_pointer);
        // The stale reference to the pre-split child was retargeted.
        assert_eq!(records[2].front_pointer, 4);
    }

    #[test]
    fn test_remove_internal_record_at_patches_front() {
        let mut page = internal();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[10]), 1, 2))
            .unwrap();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[20]), 2, 3))
            .unwrap();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[30]), 3, 4))
            .unwrap();

        // Children 2 and 3 merged into 2: drop the separator between them.
        let removed = page.remove_internal_record_at(1).unwrap();
        assert_eq!(removed.key[0], 20);

        let records = page.all_internal_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].front_pointer, removed.front_pointer);
        assert_eq!(records[0].next_pointer, records[1].front_pointer);
    }

    #[test]
    fn test_set_internal_key_updates_both_arrays() {
        let mut page = internal();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[10]), 1, 2))
            .unwrap();
        page.set_internal_key(0, &key_from_slice(&[15])).unwrap();

        let record = page.get_internal_record(0).unwrap();
        assert_eq!(record.key[0], 15);
        let (_, found) = page.find_internal_record(&key_from_slice(&[15])).unwrap();
        assert_eq!(found.key[0], 15);
    }

    #[test]
    fn test_find_separator_slot() {
        let mut page = internal();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[10]), 1, 2))
            .unwrap();
        page.insert_internal_record(&InternalRecord::new(key_from_slice(&[20]), 2, 3))
            .unwrap();

        assert_eq!(page.find_separator_slot(1, 2), Some(0));
        assert_eq!(page.find_separator_slot(2, 3), Some(1));
        assert_eq!(page.find_separator_slot(1, 3), None);
    }

    #[test]
    fn test_internal_split_shares_slot_mechanics() {
        let mut page = internal();
        for i in 0..8u8 {
            page.insert_internal_record(&InternalRecord::new(
                key_from_slice(&[(i + 1) * 10]),
                i as u32 + 1,
                i as u32 + 2,
            ))
            .unwrap();
        }
        let mut sibling = Page::new(9, PageType::Internal);
        let middle = page.split_records(&mut sibling).unwrap();

        assert_eq!(page.record_count(), 4);
        assert_eq!(sibling.record_count(), 4);
        assert_eq!(middle[0], 50);
        assert_eq!(sibling.first_internal_record().unwrap().key[0], 50);
    }
}
