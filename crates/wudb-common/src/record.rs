//! Record structures stored on WuDB pages.
//!
//! A leaf record is a 32-byte header, a 32-byte key and a 128-byte value.
//! An internal record replaces the value with two child page pointers; the
//! remainder of the 192-byte slot is reserved.

use crate::error::{Result, WudbError};
use crate::time::unix_now_u32;
use bytes::{Buf, BufMut};

/// Fixed key width in bytes.
pub const KEY_SIZE: usize = 32;

/// Fixed value width in bytes.
pub const VALUE_SIZE: usize = 128;

/// Size of the record header in bytes.
pub const RECORD_HEADER_SIZE: usize = 32;

/// Total on-disk width of a leaf record.
pub const RECORD_SIZE: usize = RECORD_HEADER_SIZE + KEY_SIZE + VALUE_SIZE;

/// Total on-disk width of an internal record. Identical to the leaf width
/// so both page kinds share one slot layout.
pub const INTERNAL_RECORD_SIZE: usize = RECORD_SIZE;

/// Fixed-width key, compared lexicographically as unsigned bytes.
pub type Key = [u8; KEY_SIZE];

/// Fixed-width opaque value payload.
pub type Value = [u8; VALUE_SIZE];

/// Header preceding every record slot.
///
/// Layout (32 bytes, little-endian):
/// - is_deleted: 1 byte
/// - record_length: 4 bytes
/// - key_size: 4 bytes
/// - value_size: 4 bytes
/// - transaction_id: 4 bytes
/// - timestamp: 4 bytes
/// - reserved: 11 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Tombstone marker; records are physically removed from pages, the
    /// flag exists for disposed-page inspection.
    pub is_deleted: u8,
    /// Total record width in bytes.
    pub record_length: u32,
    /// Key width in bytes.
    pub key_size: u32,
    /// Value width in bytes.
    pub value_size: u32,
    /// Transaction that produced this record version.
    pub transaction_id: u32,
    /// Creation unix time (seconds).
    pub timestamp: u32,
}

impl RecordHeader {
    /// Size of the record header in bytes.
    pub const SIZE: usize = RECORD_HEADER_SIZE;

    /// Creates a header describing a standard leaf record.
    pub fn new() -> Self {
        Self {
            is_deleted: 0,
            record_length: RECORD_SIZE as u32,
            key_size: KEY_SIZE as u32,
            value_size: VALUE_SIZE as u32,
            transaction_id: 0,
            timestamp: unix_now_u32(),
        }
    }

    fn put(&self, buf: &mut &mut [u8]) {
        buf.put_u8(self.is_deleted);
        buf.put_u32_le(self.record_length);
        buf.put_u32_le(self.key_size);
        buf.put_u32_le(self.value_size);
        buf.put_u32_le(self.transaction_id);
        buf.put_u32_le(self.timestamp);
        buf.put_bytes(0, 11);
    }

    fn get(buf: &mut &[u8]) -> Self {
        let header = Self {
            is_deleted: buf.get_u8(),
            record_length: buf.get_u32_le(),
            key_size: buf.get_u32_le(),
            value_size: buf.get_u32_le(),
            transaction_id: buf.get_u32_le(),
            timestamp: buf.get_u32_le(),
        };
        buf.advance(11);
        header
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// A user key-value record as stored on leaf pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Record header.
    pub header: RecordHeader,
    /// 32-byte key.
    pub key: Key,
    /// 128-byte value.
    pub value: Value,
}

impl Record {
    /// Creates a record with a fresh header.
    pub fn new(key: Key, value: Value) -> Self {
        Self {
            header: RecordHeader::new(),
            key,
            value,
        }
    }

    /// Creates a record stamped with the originating transaction id.
    pub fn with_transaction(txn_id: u32, key: Key, value: Value) -> Self {
        let mut record = Self::new(key, value);
        record.header.transaction_id = txn_id;
        record
    }

    /// Serializes this record to its 192-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let mut cursor = &mut buf[..];
        self.header.put(&mut cursor);
        cursor.put_slice(&self.key);
        cursor.put_slice(&self.value);
        buf
    }

    /// Deserializes a record from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < RECORD_SIZE {
            return Err(WudbError::ShortRead {
                expected: RECORD_SIZE,
                actual: data.len(),
            });
        }
        let mut cursor = data;
        let header = RecordHeader::get(&mut cursor);
        let mut key = [0u8; KEY_SIZE];
        cursor.copy_to_slice(&mut key);
        let mut value = [0u8; VALUE_SIZE];
        cursor.copy_to_slice(&mut value);
        Ok(Self { header, key, value })
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{key: {}, value: {}}}", hex(&self.key), hex(&self.value))
    }
}

/// A separator record as stored on internal pages.
///
/// Keys strictly below the separator descend through `front_pointer`, keys
/// at or above it through `next_pointer`. Neighboring slots on a page keep
/// `next_pointer` of slot `i` equal to `front_pointer` of slot `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalRecord {
    /// Record header.
    pub header: RecordHeader,
    /// 32-byte separator key.
    pub key: Key,
    /// Child covering keys below the separator.
    pub front_pointer: u32,
    /// Child covering keys at or above the separator.
    pub next_pointer: u32,
}

impl InternalRecord {
    /// Creates an internal record with a fresh header.
    pub fn new(key: Key, front_pointer: u32, next_pointer: u32) -> Self {
        Self {
            header: RecordHeader::new(),
            key,
            front_pointer,
            next_pointer,
        }
    }

    /// Serializes this record to its 192-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; INTERNAL_RECORD_SIZE] {
        let mut buf = [0u8; INTERNAL_RECORD_SIZE];
        let mut cursor = &mut buf[..];
        self.header.put(&mut cursor);
        cursor.put_slice(&self.key);
        cursor.put_u32_le(self.front_pointer);
        cursor.put_u32_le(self.next_pointer);
        buf
    }

    /// Deserializes an internal record from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < INTERNAL_RECORD_SIZE {
            return Err(WudbError::ShortRead {
                expected: INTERNAL_RECORD_SIZE,
                actual: data.len(),
            });
        }
        let mut cursor = data;
        let header = RecordHeader::get(&mut cursor);
        let mut key = [0u8; KEY_SIZE];
        cursor.copy_to_slice(&mut key);
        let front_pointer = cursor.get_u32_le();
        let next_pointer = cursor.get_u32_le();
        Ok(Self {
            header,
            key,
            front_pointer,
            next_pointer,
        })
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Builds a key from a short byte prefix, zero-padded to 32 bytes.
pub fn key_from_slice(prefix: &[u8]) -> Key {
    let mut key = [0u8; KEY_SIZE];
    let n = prefix.len().min(KEY_SIZE);
    key[..n].copy_from_slice(&prefix[..n]);
    key
}

/// Builds a value from a short byte prefix, zero-padded to 128 bytes.
pub fn value_from_slice(prefix: &[u8]) -> Value {
    let mut value = [0u8; VALUE_SIZE];
    let n = prefix.len().min(VALUE_SIZE);
    value[..n].copy_from_slice(&prefix[..n]);
    value
}
