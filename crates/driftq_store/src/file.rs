//! Journaled file backend for persistent queues.

use crate::backend::{QueueBackend, ScanFilter};
use crate::error::{StoreError, StoreResult};
use crate::journal::{DeleteKey, JournalReader, JournalRecord};
use driftq_core::{ItemId, SyncItem, TenantId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A file-backed queue backend.
///
/// Every mutation is one framed record appended to a journal file; the full
/// working state is rebuilt by replaying the journal on open, so the queue
/// survives process restarts. [`compact`](FileBackend::compact) rewrites the
/// journal from live state to reclaim space taken by superseded records.
///
/// # Durability
///
/// With `sync_on_write` (the default) every record is followed by
/// `File::sync_all`, so an acknowledged enqueue is on disk. Turning it off
/// trades durability of the most recent records for throughput.
///
/// # Recovery
///
/// A truncated record at the end of the journal (torn write) is dropped
/// silently. A framing or checksum error anywhere else fails `open`.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    items: RwLock<HashMap<TenantId, HashMap<ItemId, SyncItem>>>,
    sync_on_write: bool,
}

impl FileBackend {
    /// Opens or creates a journal at the given path and replays it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the journal is
    /// corrupted before its tail.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with_durability(path, true)
    }

    /// Opens a journal, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the journal
    /// cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Opens a journal with explicit durability behavior.
    ///
    /// # Errors
    ///
    /// Same as [`open`](FileBackend::open).
    pub fn open_with_durability(path: &Path, sync_on_write: bool) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let data = std::fs::read(path)?;
        let mut items: HashMap<TenantId, HashMap<ItemId, SyncItem>> = HashMap::new();
        let mut replayed = 0usize;
        for record in JournalReader::new(&data) {
            match record? {
                JournalRecord::Append(item) | JournalRecord::Update(item) => {
                    items
                        .entry(item.tenant_id.clone())
                        .or_default()
                        .insert(item.id, item);
                }
                JournalRecord::Delete(key) => {
                    if let Some(tenant) = items.get_mut(&key.tenant_id) {
                        tenant.remove(&key.item_id);
                    }
                }
            }
            replayed += 1;
        }
        tracing::debug!(path = %path.display(), records = replayed, "journal replayed");

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            items: RwLock::new(items),
            sync_on_write,
        })
    }

    /// Returns the path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the total number of live items across all tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().values().map(HashMap::len).sum()
    }

    /// Returns true if no live items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_record(&self, file: &mut File, record: &JournalRecord) -> StoreResult<()> {
        let data = record.encode()?;
        file.write_all(&data)?;
        if self.sync_on_write {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Rewrites the journal from live state, dropping superseded records.
    ///
    /// Writes a fresh journal to a temporary file, syncs it, and renames it
    /// over the old one. Returns the number of live records kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite or rename fails; the original
    /// journal is untouched in that case.
    pub fn compact(&self) -> StoreResult<usize> {
        let mut file = self.file.lock();
        let items = self.items.read();

        let tmp_path = self.path.with_extension("compact");
        let mut tmp = File::create(&tmp_path)?;
        let mut kept = 0usize;
        for tenant in items.values() {
            for item in tenant.values() {
                let data = JournalRecord::Append(item.clone()).encode()?;
                tmp.write_all(&data)?;
                kept += 1;
            }
        }
        tmp.sync_all()?;
        drop(tmp);

        std::fs::rename(&tmp_path, &self.path)?;
        *file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        tracing::debug!(path = %self.path.display(), kept, "journal compacted");
        Ok(kept)
    }
}

impl QueueBackend for FileBackend {
    fn append(&self, item: &SyncItem) -> StoreResult<()> {
        let mut file = self.file.lock();
        let mut items = self.items.write();

        let tenant = items.entry(item.tenant_id.clone()).or_default();
        if tenant.contains_key(&item.id) {
            return Err(StoreError::Duplicate { item_id: item.id });
        }
        self.write_record(&mut file, &JournalRecord::Append(item.clone()))?;
        tenant.insert(item.id, item.clone());
        Ok(())
    }

    fn get(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<Option<SyncItem>> {
        Ok(self
            .items
            .read()
            .get(tenant_id)
            .and_then(|tenant| tenant.get(&item_id))
            .cloned())
    }

    fn scan(&self, tenant_id: &TenantId, filter: &ScanFilter) -> StoreResult<Vec<SyncItem>> {
        let items = self.items.read();
        let mut matching = items
            .get(tenant_id)
            .map(|tenant| {
                tenant
                    .values()
                    .filter(|item| filter.matches(item))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        matching.sort_by_key(|item| (item.enqueued_at, item.sequence));
        Ok(matching)
    }

    fn update(&self, item: &SyncItem) -> StoreResult<()> {
        let mut file = self.file.lock();
        let mut items = self.items.write();

        let stored = items
            .get_mut(&item.tenant_id)
            .and_then(|tenant| tenant.get_mut(&item.id))
            .ok_or_else(|| StoreError::not_found(item.tenant_id.clone(), item.id))?;
        self.write_record(&mut file, &JournalRecord::Update(item.clone()))?;
        *stored = item.clone();
        Ok(())
    }

    fn delete(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<bool> {
        let mut file = self.file.lock();
        let mut items = self.items.write();

        let exists = items
            .get(tenant_id)
            .is_some_and(|tenant| tenant.contains_key(&item_id));
        if !exists {
            return Ok(false);
        }

        let record = JournalRecord::Delete(DeleteKey {
            tenant_id: tenant_id.clone(),
            item_id,
        });
        self.write_record(&mut file, &record)?;
        if let Some(tenant) = items.get_mut(tenant_id) {
            tenant.remove(&item_id);
        }
        Ok(true)
    }

    fn max_sequence(&self) -> StoreResult<u64> {
        Ok(self
            .items
            .read()
            .values()
            .flat_map(HashMap::values)
            .map(|item| item.sequence)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use driftq_core::{SyncAction, SyncItemDraft, SyncStatus};
    use serde_json::json;
    use tempfile::tempdir;

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
    fn open_creates_empty_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn items_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");
        let tenant = TenantId::new("acme");
        let item = make_item("a-1", 1);

        {
            let backend = FileBackend::open(&path).unwrap();
            backend.append(&item).unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        let fetched = backend.get(&tenant, item.id).unwrap().unwrap();
        assert_eq!(fetched, item);
        assert_eq!(backend.max_sequence().unwrap(), 1);
    }

    #[test]
    fn updates_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");
        let tenant = TenantId::new("acme");
        let mut item = make_item("a-1", 1);

        {
            let backend = FileBackend::open(&path).unwrap();
            backend.append(&item).unwrap();
            item.begin_attempt(Utc::now()).unwrap();
            item.fail("remote unavailable", None).unwrap();
            backend.update(&item).unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        let fetched = backend.get(&tenant, item.id).unwrap().unwrap();
        assert_eq!(fetched.status, SyncStatus::Failed);
        assert_eq!(fetched.metadata.attempt_count, 1);
    }

    #[test]
    fn deletes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");
        let tenant = TenantId::new("acme");
        let item = make_item("a-1", 1);

        {
            let backend = FileBackend::open(&path).unwrap();
            backend.append(&item).unwrap();
            assert!(backend.delete(&tenant, item.id).unwrap());
        }

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.get(&tenant, item.id).unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn torn_tail_is_recovered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");
        let item = make_item("a-1", 1);

        {
            let backend = FileBackend::open(&path).unwrap();
            backend.append(&item).unwrap();
        }

        // Simulate a torn write: half a record at the tail
        let garbage = JournalRecord::Append(make_item("a-2", 2)).encode().unwrap();
        let mut data = std::fs::read(&path).unwrap();
        data.extend_from_slice(&garbage[..garbage.len() / 2]);
        std::fs::write(&path, &data).unwrap();

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn mid_journal_corruption_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");

        {
            let backend = FileBackend::open(&path).unwrap();
            backend.append(&make_item("a-1", 1)).unwrap();
            backend.append(&make_item("a-2", 2)).unwrap();
        }

        let mut data = std::fs::read(&path).unwrap();
        data[20] ^= 0xFF;
        std::fs::write(&path, &data).unwrap();

        assert!(matches!(
            FileBackend::open(&path),
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[test]
    fn compact_drops_superseded_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");
        let tenant = TenantId::new("acme");
        let mut item = make_item("a-1", 1);
        let other = make_item("a-2", 2);

        let backend = FileBackend::open(&path).unwrap();
        backend.append(&item).unwrap();
        backend.append(&other).unwrap();
        item.begin_attempt(Utc::now()).unwrap();
        item.fail("boom", None).unwrap();
        backend.update(&item).unwrap();
        backend.delete(&tenant, other.id).unwrap();

        let size_before = std::fs::metadata(&path).unwrap().len();
        let kept = backend.compact().unwrap();
        assert_eq!(kept, 1);
        assert!(std::fs::metadata(&path).unwrap().len() < size_before);

        // State intact after compaction, both in memory and on reopen
        assert_eq!(backend.get(&tenant, item.id).unwrap().unwrap().status, SyncStatus::Failed);
        drop(backend);
        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn writes_after_compaction_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.dq");

        let backend = FileBackend::open(&path).unwrap();
        backend.append(&make_item("a-1", 1)).unwrap();
        backend.compact().unwrap();
        backend.append(&make_item("a-2", 2)).unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("queues").join("queue.dq");

        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        assert!(backend.is_empty());
        assert!(path.exists());
    }
}
