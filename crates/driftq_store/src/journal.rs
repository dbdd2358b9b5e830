//! Journal record framing for the file backend.
//!
//! Each mutation of the queue is one framed, append-only record:
//!
//! ```text
//! magic (4) | version (2, LE) | type (1) | len (4, LE) | payload | crc32 (4, LE)
//! ```
//!
//! The payload is the CBOR encoding of the record body. The CRC covers
//! everything before it. On replay, a truncated record at the end of the
//! journal is treated as a torn write and dropped; a CRC or framing
//! mismatch anywhere else is corruption.

use crate::error::{StoreError, StoreResult};
use driftq_core::{ItemId, SyncItem, TenantId};
use serde::{Deserialize, Serialize};

/// Magic bytes identifying a DriftQ journal record.
pub(crate) const JOURNAL_MAGIC: [u8; 4] = *b"DQJL";

/// Current journal format version.
pub(crate) const JOURNAL_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + type (1) + length (4).
const HEADER_SIZE: usize = 11;

/// CRC trailer size.
const CRC_SIZE: usize = 4;

/// Type of journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum JournalRecordType {
    /// A new item was appended.
    Append = 1,
    /// An existing item was replaced.
    Update = 2,
    /// An item was deleted.
    Delete = 3,
}

impl JournalRecordType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Append),
            2 => Some(Self::Update),
            3 => Some(Self::Delete),
            _ => None,
        }
    }

    const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Key of a deleted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DeleteKey {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
}

/// One journaled mutation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JournalRecord {
    /// A new item was appended.
    Append(SyncItem),
    /// An existing item was replaced.
    Update(SyncItem),
    /// An item was deleted.
    Delete(DeleteKey),
}

impl JournalRecord {
    fn record_type(&self) -> JournalRecordType {
        match self {
            Self::Append(_) => JournalRecordType::Append,
            Self::Update(_) => JournalRecordType::Update,
            Self::Delete(_) => JournalRecordType::Delete,
        }
    }

    fn encode_payload(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Append(item) | Self::Update(item) => ciborium::into_writer(item, &mut buf)?,
            Self::Delete(key) => ciborium::into_writer(key, &mut buf)?,
        }
        Ok(buf)
    }

    /// Serializes the record with its full envelope.
    pub(crate) fn encode(&self) -> StoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::corrupted("journal record payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }
}

/// Streaming reader over a journal byte buffer.
///
/// Yields records in write order. Stops silently at a torn trailing record;
/// yields an error for corruption before the tail.
pub(crate) struct JournalReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> JournalReader<'a> {
    /// Creates a reader over the full journal contents.
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl Iterator for JournalReader<'_> {
    type Item = StoreResult<JournalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = &self.data[self.offset..];
        if remaining.is_empty() {
            return None;
        }
        // A header that doesn't fit is a torn tail, not corruption.
        if remaining.len() < HEADER_SIZE + CRC_SIZE {
            return None;
        }

        if remaining[0..4] != JOURNAL_MAGIC {
            return Some(Err(StoreError::corrupted(format!(
                "bad magic at offset {}",
                self.offset
            ))));
        }
        let version = u16::from_le_bytes([remaining[4], remaining[5]]);
        if version != JOURNAL_VERSION {
            return Some(Err(StoreError::corrupted(format!(
                "unsupported journal version {version}"
            ))));
        }
        let Some(record_type) = JournalRecordType::from_byte(remaining[6]) else {
            return Some(Err(StoreError::corrupted(format!(
                "unknown record type {} at offset {}",
                remaining[6], self.offset
            ))));
        };
        let payload_len =
            u32::from_le_bytes([remaining[7], remaining[8], remaining[9], remaining[10]]) as usize;

        let total = HEADER_SIZE + payload_len + CRC_SIZE;
        if remaining.len() < total {
            // Torn write at the tail.
            return None;
        }

        let body = &remaining[..HEADER_SIZE + payload_len];
        let stored_crc = u32::from_le_bytes([
            remaining[HEADER_SIZE + payload_len],
            remaining[HEADER_SIZE + payload_len + 1],
            remaining[HEADER_SIZE + payload_len + 2],
            remaining[HEADER_SIZE + payload_len + 3],
        ]);
        let actual_crc = compute_crc32(body);
        if stored_crc != actual_crc {
            return Some(Err(StoreError::corrupted(format!(
                "crc mismatch at offset {}: expected {stored_crc:08x}, got {actual_crc:08x}",
                self.offset
            ))));
        }

        let payload = &remaining[HEADER_SIZE..HEADER_SIZE + payload_len];
        let record = match record_type {
            JournalRecordType::Append => ciborium::from_reader(payload).map(JournalRecord::Append),
            JournalRecordType::Update => ciborium::from_reader(payload).map(JournalRecord::Update),
            JournalRecordType::Delete => ciborium::from_reader(payload).map(JournalRecord::Delete),
        };

        self.offset += total;
        Some(record.map_err(StoreError::from))
    }
}

/// Computes a CRC32 checksum (IEEE polynomial).
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use driftq_core::{SyncAction, SyncItemDraft};
    use serde_json::json;

    fn make_item(entity: &str, sequence: u64) -> SyncItem {
        let draft =
            SyncItemDraft::new("assets", entity, SyncAction::Update).with_payload(json!({"v": 1}));
        SyncItem::from_draft(
            ItemId::generate(),
            TenantId::new("acme"),
            sequence,
            Utc::now(),
            draft,
        )
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0x0000_0000);
    }

    #[test]
    fn record_roundtrip() {
        let records = vec![
            JournalRecord::Append(make_item("a-1", 1)),
            JournalRecord::Update(make_item("a-2", 2)),
            JournalRecord::Delete(DeleteKey {
                tenant_id: TenantId::new("acme"),
                item_id: ItemId::generate(),
            }),
        ];

        let mut data = Vec::new();
        for record in &records {
            data.extend_from_slice(&record.encode().unwrap());
        }

        let decoded: Vec<_> = JournalReader::new(&data)
            .collect::<StoreResult<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn torn_tail_is_dropped() {
        let first = JournalRecord::Append(make_item("a-1", 1)).encode().unwrap();
        let second = JournalRecord::Append(make_item("a-2", 2)).encode().unwrap();

        let mut data = first.clone();
        // Half of the second record made it to disk
        data.extend_from_slice(&second[..second.len() / 2]);

        let decoded: Vec<_> = JournalReader::new(&data)
            .collect::<StoreResult<Vec<_>>>()
            .unwrap();
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut data = JournalRecord::Append(make_item("a-1", 1)).encode().unwrap();
        data[0] = b'X';

        let result: StoreResult<Vec<_>> = JournalReader::new(&data).collect();
        assert!(matches!(result, Err(StoreError::Corrupted { .. })));
    }

    #[test]
    fn flipped_payload_byte_fails_crc() {
        let mut data = JournalRecord::Append(make_item("a-1", 1)).encode().unwrap();
        let mid = data.len() / 2;
        data[mid] ^= 0xFF;

        let result: StoreResult<Vec<_>> = JournalReader::new(&data).collect();
        assert!(matches!(result, Err(StoreError::Corrupted { .. })));
    }

    #[test]
    fn empty_journal_yields_nothing() {
        assert_eq!(JournalReader::new(&[]).count(), 0);
    }
}
