//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `pipeline` - 流水线驱动
//! - 打开存储、导入地址、读取未处理记录
//! - 确认浏览器可用后交给调度器
//! - 调度结束后进入心跳，直到取消
//!
//! ### `batch_processor` - 批量调度器
//! - 把记录切成固定大小的批次
//! - 控制同时运行的浏览器会话数（窗口或 Semaphore）
//! - 汇总统计
//!
//! ### `session_runner` - 单批次处理器
//! - 独占一个浏览器会话，顺序处理批次内的记录
//! - 每条记录分类后立即写回存储
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (App)
//!     ↓
//! batch_processor (处理 Vec<Batch>)
//!     ↓
//! session_runner (处理 Vec<WorkRecord>)
//!     ↓
//! workflow::RecordFlow (处理单条记录)
//!     ↓
//! services (能力层：locator script / result parser)
//!     ↓
//! infrastructure (基础设施：AutomationSession / JsExecutor)
//! ```

pub mod batch_processor;
pub mod pipeline;
pub mod session_runner;

pub use batch_processor::{partition, BatchScheduler, RunStats};
pub use pipeline::{heartbeat, App};
pub use session_runner::{process_batch, Batch, BatchReport};
