use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{RecordStatus, WorkRecord};
use crate::store::RecordStore;

/// 基于 SQLite 的记录存储
///
/// 每次写入都在自己的隐式事务中提交，`upsert_outcome` 返回即已持久化。
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// 按连接串打开存储（文件路径或 `:memory:`）
    pub fn open(connection_string: &str) -> StoreResult<Self> {
        let conn = if connection_string == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(Path::new(connection_string))
        }
        .map_err(|e| StoreError::Unavailable(format!("{}: {}", connection_string, e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        info!("记录存储已打开: {}", connection_string);
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(":memory:")
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             CREATE TABLE IF NOT EXISTS work_records (
                 id               INTEGER PRIMARY KEY AUTOINCREMENT,
                 house_number     TEXT NOT NULL,
                 street           TEXT NOT NULL,
                 full_address     TEXT NOT NULL,
                 owner_name       TEXT,
                 book_page        TEXT,
                 transaction_date TEXT,
                 status           TEXT NOT NULL DEFAULT 'unprocessed'
             );
             CREATE UNIQUE INDEX IF NOT EXISTS idx_work_records_full_address
                 ON work_records(full_address);",
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// 在阻塞线程池上使用连接，不占用异步运行时的工作线程
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("存储连接锁已中毒".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("存储任务异常退出: {}", e)))?
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("存储连接锁已中毒".to_string()))
    }

    /// 读取单条记录（不区分状态）
    pub fn get(&self, id: i64) -> StoreResult<Option<WorkRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, house_number, street, full_address, owner_name, book_page,
                        transaction_date, status
                 FROM work_records WHERE id = ?1",
            )
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut rows = stmt
            .query_map(params![id], row_to_raw)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        match rows.next() {
            Some(row) => {
                let raw = row.map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok(Some(raw.into_record()?))
            }
            None => Ok(None),
        }
    }
}

struct RawRow {
    id: i64,
    house_number: String,
    street: String,
    full_address: String,
    owner_name: Option<String>,
    book_page: Option<String>,
    transaction_date: Option<String>,
    status: String,
}

impl RawRow {
    fn into_record(self) -> StoreResult<WorkRecord> {
        let status: RecordStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("记录 {}: {}", self.id, e)))?;
        Ok(WorkRecord {
            id: Some(self.id),
            house_number: self.house_number,
            street: self.street,
            full_address: self.full_address,
            owner_name: self.owner_name,
            book_page: self.book_page,
            transaction_date: self.transaction_date,
            status,
        })
    }
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        house_number: row.get(1)?,
        street: row.get(2)?,
        full_address: row.get(3)?,
        owner_name: row.get(4)?,
        book_page: row.get(5)?,
        transaction_date: row.get(6)?,
        status: row.get(7)?,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn fetch_unprocessed(&self, offset: usize, limit: usize) -> StoreResult<Vec<WorkRecord>> {
        let records = self
            .with_conn(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, house_number, street, full_address, owner_name, book_page,
                                transaction_date, status
                         FROM (SELECT * FROM work_records ORDER BY id LIMIT ?1 OFFSET ?2)
                         WHERE status != 'processed'
                         ORDER BY id",
                    )
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;

                let rows = stmt
                    .query_map(params![limit as i64, offset as i64], row_to_raw)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;

                let mut records = Vec::new();
                for row in rows {
                    let raw = row.map_err(|e| StoreError::Corrupt(e.to_string()))?;
                    records.push(raw.into_record()?);
                }
                Ok(records)
            })
            .await?;
        debug!("读取到 {} 条未处理记录 (offset={}, limit={})", records.len(), offset, limit);
        Ok(records)
    }

    async fn upsert_outcome(&self, record: &WorkRecord) -> StoreResult<()> {
        let id = record.id.ok_or_else(|| StoreError::MissingIdentity {
            address: record.address(),
        })?;
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO work_records
                     (id, house_number, street, full_address, owner_name, book_page,
                      transaction_date, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     owner_name       = excluded.owner_name,
                     book_page        = excluded.book_page,
                     transaction_date = excluded.transaction_date,
                     status           = excluded.status",
                params![
                    id,
                    record.house_number,
                    record.street,
                    record.full_address,
                    record.owner_name,
                    record.book_page,
                    record.transaction_date,
                    record.status.as_str(),
                ],
            )
            .map_err(|e| StoreError::write(Some(id), e))?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            StoreError::Unavailable(message) => StoreError::write(Some(id), message),
            other => other,
        })
    }

    async fn insert_many(&self, records: &[WorkRecord]) -> StoreResult<Vec<i64>> {
        let records = records.to_vec();
        let total = records.len();
        let ids = self
            .with_conn(move |conn| {
                let tx = conn.transaction().map_err(|e| StoreError::write(None, e))?;
                let mut ids = Vec::with_capacity(records.len());
                {
                    // 已存在的地址保持原样（包括处理状态）
                    let mut stmt = tx
                        .prepare(
                            "INSERT OR IGNORE INTO work_records
                                 (house_number, street, full_address, owner_name, book_page,
                                  transaction_date, status)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        )
                        .map_err(|e| StoreError::write(None, e))?;
                    for record in &records {
                        let inserted = stmt
                            .execute(params![
                                record.house_number,
                                record.street,
                                record.full_address,
                                record.owner_name,
                                record.book_page,
                                record.transaction_date,
                                record.status.as_str(),
                            ])
                            .map_err(|e| StoreError::write(None, e))?;
                        if inserted > 0 {
                            ids.push(tx.last_insert_rowid());
                        }
                    }
                }
                tx.commit().map_err(|e| StoreError::write(None, e))?;
                Ok(ids)
            })
            .await?;
        info!("已导入 {} 条记录, 跳过 {} 条已存在的地址", ids.len(), total - ids.len());
        Ok(ids)
    }
}
