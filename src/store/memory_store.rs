use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::models::{RecordStatus, WorkRecord};
use crate::store::RecordStore;

/// 进程内存储，语义与 `SqliteStore` 一致
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<i64, WorkRecord>,
    next_id: i64,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前所有记录（按身份排序）
    pub fn snapshot(&self) -> Vec<WorkRecord> {
        self.inner
            .lock()
            .map(|inner| inner.records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: i64) -> Option<WorkRecord> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.records.get(&id).cloned())
    }

    /// 成功写回的次数
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.writes).unwrap_or(0)
    }

    pub fn count_with_status(&self, status: RecordStatus) -> usize {
        self.snapshot()
            .iter()
            .filter(|r| r.status == status)
            .count()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_unprocessed(&self, offset: usize, limit: usize) -> StoreResult<Vec<WorkRecord>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("内存存储锁已中毒".to_string()))?;
        Ok(inner
            .records
            .values()
            .skip(offset)
            .take(limit)
            .filter(|r| r.status != RecordStatus::Processed)
            .cloned()
            .collect())
    }

    async fn upsert_outcome(&self, record: &WorkRecord) -> StoreResult<()> {
        let id = record.id.ok_or_else(|| StoreError::MissingIdentity {
            address: record.address(),
        })?;
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::write(Some(id), "内存存储锁已中毒"))?;
        let entry = inner
            .records
            .entry(id)
            .or_insert_with(|| record.clone());
        entry.owner_name = record.owner_name.clone();
        entry.book_page = record.book_page.clone();
        entry.transaction_date = record.transaction_date.clone();
        entry.status = record.status;
        inner.next_id = inner.next_id.max(id);
        inner.writes += 1;
        Ok(())
    }

    async fn insert_many(&self, records: &[WorkRecord]) -> StoreResult<Vec<i64>> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::write(None, "内存存储锁已中毒"))?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            if inner
                .records
                .values()
                .any(|r| r.full_address == record.full_address)
            {
                continue;
            }
            inner.next_id += 1;
            let id = inner.next_id;
            inner.records.insert(id, record.clone().with_id(id));
            ids.push(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_address_line, SessionOutcome};

    #[tokio::test]
    async fn test_same_semantics_as_sqlite() {
        let store = MemoryStore::new();
        store
            .insert_many(&[parse_address_line("1 A"), parse_address_line("2 B")])
            .await
            .unwrap();

        let mut records = store.fetch_unprocessed(0, 10).await.unwrap();
        records[0].apply_outcome(&SessionOutcome::Matched {
            owner_name: "Owner".into(),
            book_page: "1/2".into(),
            transaction_date: "2020-01-01".into(),
        });
        store.upsert_outcome(&records[0]).await.unwrap();
        store.upsert_outcome(&records[0]).await.unwrap();

        let remaining = store.fetch_unprocessed(0, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].house_number, "2");
        assert_eq!(store.count_with_status(RecordStatus::Processed), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_insert_skips_known_addresses() {
        let store = MemoryStore::new();
        let first = store
            .insert_many(&[parse_address_line("1 A"), parse_address_line("2 B")])
            .await
            .unwrap();
        let second = store
            .insert_many(&[parse_address_line("2 B"), parse_address_line("3 C")])
            .await
            .unwrap();

        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![3]);
        assert_eq!(store.snapshot().len(), 3);
    }
}
