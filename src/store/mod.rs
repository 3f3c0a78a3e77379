//! 记录存储
//!
//! 只暴露三种能力：读取未处理记录、按身份写回结果、批量导入。
//! 按身份写入是幂等的，不同身份之间可以并发写入。

pub mod memory_store;
pub mod sqlite_store;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::WorkRecord;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 按身份顺序取出 `[offset, offset + limit)` 范围内的记录，再过滤掉已处理的
    ///
    /// 不修改任何状态。
    async fn fetch_unprocessed(&self, offset: usize, limit: usize) -> StoreResult<Vec<WorkRecord>>;

    /// 写回 `owner_name` / `book_page` / `transaction_date` / `status`
    ///
    /// 返回前写入必须已经落盘。
    async fn upsert_outcome(&self, record: &WorkRecord) -> StoreResult<()>;

    /// 批量导入新记录，返回新分配的身份
    ///
    /// 按 `full_address` 去重：已经存在的地址跳过，不改动它的状态。
    async fn insert_many(&self, records: &[WorkRecord]) -> StoreResult<Vec<i64>>;
}
