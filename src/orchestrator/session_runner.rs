//! 单批次处理器 - 编排层
//!
//! ## 职责
//!
//! 独占一个浏览器会话，按顺序处理一个批次里的每条记录。
//!
//! ## 核心功能
//!
//! 1. **会话复用**：整个批次只打开一次浏览器
//! 2. **逐条写回**：每条记录分类后立即写入存储，再处理下一条
//! 3. **错误隔离**：单条记录的失败、写入失败都不会中断批次
//! 4. **协作取消**：在两条记录之间检查取消信号
//! 5. **统计输出**：记录各类结果数量

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::infrastructure::SessionFactory;
use crate::models::{SessionOutcome, WorkRecord};
use crate::store::RecordStore;
use crate::workflow::{RecordCtx, RecordFlow};

/// 一个批次：分区后连续的一段记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 批次编号（从1开始）
    pub index: usize,
    pub records: Vec<WorkRecord>,
}

/// 批次处理结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_index: usize,
    pub total: usize,
    pub matched: usize,
    pub no_result: usize,
    pub extraction_failed: usize,
    pub transient: usize,
    pub write_failures: usize,
    /// 没有得到分类的记录（会话打不开、会话断开或被取消），保持未处理
    pub abandoned: usize,
}

impl BatchReport {
    fn tally(&mut self, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Matched { .. } => self.matched += 1,
            SessionOutcome::NoResult => self.no_result += 1,
            SessionOutcome::ExtractionFailed { .. } => self.extraction_failed += 1,
            SessionOutcome::TransientError { .. } => self.transient += 1,
        }
    }

    /// 已分类的记录数
    pub fn classified(&self) -> usize {
        self.matched + self.no_result + self.extraction_failed + self.transient
    }
}

/// 处理单个批次
///
/// # 参数
/// - `factory`: 会话工厂（本批次独占一个会话）
/// - `store`: 记录存储
/// - `flow`: 单条记录的处理流程
/// - `batch`: 批次数据
/// - `cancel`: 取消信号
pub async fn process_batch(
    factory: &dyn SessionFactory,
    store: &dyn RecordStore,
    flow: &RecordFlow,
    batch: Batch,
    cancel: &CancellationToken,
) -> BatchReport {
    let Batch { index, mut records } = batch;
    let total = records.len();
    let mut report = BatchReport {
        batch_index: index,
        total,
        ..Default::default()
    };

    info!("[批次 {}] 开始处理, 共 {} 条记录", index, total);

    let mut session = match factory.open_session().await {
        Ok(session) => session,
        Err(e) => {
            error!("[批次 {}] ❌ 打开浏览器会话失败: {}", index, e);
            report.abandoned = total;
            return report;
        }
    };

    for (position, record) in records.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            report.abandoned += total - position;
            warn!(
                "[批次 {}] ⏹️ 收到取消信号, 剩余 {} 条记录留待下次运行",
                index,
                total - position
            );
            break;
        }

        let ctx = RecordCtx::new(index, position + 1, record);
        let outcome = match flow.run(session.as_mut(), record, &ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                report.abandoned += total - position;
                error!(
                    "[批次 {}] ❌ 会话不可用, 剩余 {} 条记录留待下次运行: {}",
                    index,
                    total - position,
                    e
                );
                break;
            }
        };

        record.apply_outcome(&outcome);
        report.tally(&outcome);

        if let Err(e) = store.upsert_outcome(record).await {
            report.write_failures += 1;
            error!("{} ❌ 写入结果失败, 地址: {}: {}", ctx, ctx.address, e);
        }
    }

    if let Err(e) = session.close().await {
        warn!("[批次 {}] 关闭浏览器会话失败: {}", index, e);
    }

    log_batch_complete(&report);
    report
}

fn log_batch_complete(report: &BatchReport) {
    info!(
        "[批次 {}] ✅ 完成: 匹配 {}, 无结果 {}, 解析失败 {}, 出错 {}, 写入失败 {}, 未处理 {}",
        report.batch_index,
        report.matched,
        report.no_result,
        report.extraction_failed,
        report.transient,
        report.write_failures,
        report.abandoned
    );
}
