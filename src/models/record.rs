use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 记录处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Unprocessed,
    Processed,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Unprocessed => "unprocessed",
            RecordStatus::Processed => "processed",
            RecordStatus::Error => "error",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprocessed" => Ok(RecordStatus::Unprocessed),
            "processed" => Ok(RecordStatus::Processed),
            "error" => Ok(RecordStatus::Error),
            other => Err(format!("未知的记录状态: {}", other)),
        }
    }
}

/// 一条待查询的地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkRecord {
    /// 持久化身份，只有存储中的记录才有
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub house_number: String,
    pub street: String,
    /// 原始地址行
    pub full_address: String,
    pub owner_name: Option<String>,
    pub book_page: Option<String>,
    pub transaction_date: Option<String>,
    pub status: RecordStatus,
}

impl WorkRecord {
    /// 新建一条未处理的记录
    pub fn new(
        house_number: impl Into<String>,
        street: impl Into<String>,
        full_address: impl Into<String>,
    ) -> Self {
        Self {
            house_number: house_number.into(),
            street: street.into(),
            full_address: full_address.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// 用于日志的地址
    pub fn address(&self) -> String {
        format!("{} {}", self.house_number, self.street)
    }

    /// 将一次查询结果写回记录
    ///
    /// `Matched` → `Processed`，其余结果一律 → `Error`。
    pub fn apply_outcome(&mut self, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Matched {
                owner_name,
                book_page,
                transaction_date,
            } => {
                self.owner_name = Some(owner_name.clone());
                self.book_page = Some(book_page.clone());
                self.transaction_date = Some(transaction_date.clone());
                self.status = RecordStatus::Processed;
            }
            SessionOutcome::NoResult
            | SessionOutcome::ExtractionFailed { .. }
            | SessionOutcome::TransientError { .. } => {
                self.status = RecordStatus::Error;
            }
        }
    }

    /// `Processed` 的记录三个字段都必须非空
    pub fn is_consistent(&self) -> bool {
        if self.status != RecordStatus::Processed {
            return true;
        }
        [&self.owner_name, &self.book_page, &self.transaction_date]
            .iter()
            .all(|f| f.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

/// 单条记录的查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Matched {
        owner_name: String,
        book_page: String,
        transaction_date: String,
    },
    /// 门户没有返回结果行
    NoResult,
    /// 有结果但详情字段无法解析
    ExtractionFailed { reason: String },
    /// 自动化步骤失败（超时、找不到元素、frame 丢失）
    TransientError { cause: String },
}

impl SessionOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, SessionOutcome::Matched { .. })
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Matched {
                owner_name,
                book_page,
                ..
            } => write!(f, "匹配: {} - {}", owner_name, book_page),
            SessionOutcome::NoResult => write!(f, "无结果"),
            SessionOutcome::ExtractionFailed { reason } => write!(f, "解析失败: {}", reason),
            SessionOutcome::TransientError { cause } => write!(f, "自动化错误: {}", cause),
        }
    }
}
