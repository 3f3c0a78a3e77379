//! 记录处理上下文
//!
//! 封装"我正在处理哪个批次的第几条记录"这一信息

use std::fmt::Display;

use crate::models::WorkRecord;

/// 记录处理上下文
#[derive(Debug, Clone)]
pub struct RecordCtx {
    /// 批次编号（从1开始）
    pub batch_index: usize,

    /// 记录在批次中的位置（从1开始）
    pub record_index: usize,

    /// 地址（仅用于日志显示）
    pub address: String,
}

impl RecordCtx {
    pub fn new(batch_index: usize, record_index: usize, record: &WorkRecord) -> Self {
        Self {
            batch_index,
            record_index,
            address: record.address(),
        }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 {} 记录 {}]", self.batch_index, self.record_index)
    }
}
