//! # Paytax Lookup
//!
//! 断点续跑的地址批量查询：驱动浏览器在税务门户上逐条查询地址，
//! 提取业主姓名和 book/page 信息并立即写回存储。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器会话），只暴露能力
//! - `AutomationSession` - 导航、点击、输入、读取文档、按名字查找 frame
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `browser/` - 浏览器运行时解析和启动
//! - `store/` - 记录存储（读取未处理、按身份写回、批量导入）
//!
//! ### ② 业务能力层（Services）
//! - `LocatorScript` - 门户的固定操作序列（纯数据）
//! - `result_parser` - 结果行统计、详情字段解析
//!
//! ### ③ 流程层（Workflow）
//! - `RecordCtx` - 上下文封装（批次 + 记录位置）
//! - `RecordFlow` - 单条记录的状态机（搜索 → 检查 → 展开 → 解析）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 流水线驱动，管理生命周期
//! - `orchestrator/batch_processor` - 批量调度，控制并发
//! - `orchestrator/session_runner` - 单批次处理，逐条写回

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{AdmissionMode, Config};
pub use error::{AutomationError, ConfigError, StoreError};
pub use infrastructure::{AutomationSession, FrameHandle, JsExecutor, SessionFactory};
pub use models::{RecordStatus, SessionOutcome, WorkRecord};
pub use orchestrator::{App, BatchScheduler, RunStats};
pub use store::{MemoryStore, RecordStore, SqliteStore};
pub use workflow::{RecordCtx, RecordFlow};
