//! 批量调度器 - 编排层
//!
//! ## 职责
//!
//! 把全部记录切成固定大小的批次，每个批次交给一个独占浏览器会话的任务，
//! 并把同时运行的会话数限制在上限以内。
//!
//! ## 准入方式
//!
//! - **Windowed**：每启动 `ceiling` 个批次（或最后一个批次）后，等待这一窗口
//!   全部完成再继续。慢批次会拖住下一个窗口。
//! - **Pooled**：Semaphore 控制，任一批次结束立即放行下一个。
//!
//! 两种方式都在取消后停止放行新批次；已经在跑的批次自己在记录之间停下。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::AdmissionMode;
use crate::infrastructure::SessionFactory;
use crate::models::WorkRecord;
use crate::orchestrator::session_runner::{self, Batch, BatchReport};
use crate::store::RecordStore;
use crate::utils::logging;
use crate::workflow::RecordFlow;

/// 按固定大小切分记录，最后一个批次可以不满
///
/// 批次按顺序拼接等于输入，批次数为 ⌈n / batch_size⌉。
pub fn partition(records: Vec<WorkRecord>, batch_size: usize) -> Vec<Batch> {
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(size));
    let mut iter = records.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<WorkRecord> = iter.by_ref().take(size).collect();
        batches.push(Batch {
            index: batches.len() + 1,
            records: chunk,
        });
    }
    batches
}

/// 调度统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub batches: usize,
    pub records: usize,
    pub matched: usize,
    pub no_result: usize,
    pub extraction_failed: usize,
    pub transient: usize,
    pub write_failures: usize,
    pub abandoned: usize,
    /// 因取消而没有启动的批次中的记录数
    pub not_admitted: usize,
    /// 任务本身 panic 的批次数
    pub crashed_batches: usize,
}

impl RunStats {
    fn absorb(&mut self, report: &BatchReport) {
        self.matched += report.matched;
        self.no_result += report.no_result;
        self.extraction_failed += report.extraction_failed;
        self.transient += report.transient;
        self.write_failures += report.write_failures;
        self.abandoned += report.abandoned;
    }

    /// 标记为 Error 的记录数
    pub fn errors(&self) -> usize {
        self.no_result + self.extraction_failed + self.transient
    }
}

/// 批量调度器
pub struct BatchScheduler {
    factory: Arc<dyn SessionFactory>,
    store: Arc<dyn RecordStore>,
    flow: Arc<RecordFlow>,
    mode: AdmissionMode,
}

impl BatchScheduler {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        store: Arc<dyn RecordStore>,
        flow: Arc<RecordFlow>,
        mode: AdmissionMode,
    ) -> Self {
        Self {
            factory,
            store,
            flow,
            mode,
        }
    }

    /// 调度全部记录，所有批次结束后返回
    pub async fn schedule(
        &self,
        records: Vec<WorkRecord>,
        batch_size: usize,
        ceiling: usize,
        cancel: &CancellationToken,
    ) -> RunStats {
        let ceiling = ceiling.max(1);
        let mut stats = RunStats {
            records: records.len(),
            ..Default::default()
        };
        let batches = partition(records, batch_size);
        stats.batches = batches.len();

        match self.mode {
            AdmissionMode::Windowed => self.run_windowed(batches, ceiling, cancel, &mut stats).await,
            AdmissionMode::Pooled => self.run_pooled(batches, ceiling, cancel, &mut stats).await,
        }

        stats
    }

    async fn run_windowed(
        &self,
        batches: Vec<Batch>,
        ceiling: usize,
        cancel: &CancellationToken,
        stats: &mut RunStats,
    ) {
        let total = batches.len();
        let total_windows = total.div_ceil(ceiling);
        let mut window = Vec::with_capacity(ceiling);

        for (launched, batch) in (1..).zip(batches) {
            if cancel.is_cancelled() {
                stats.not_admitted += batch.records.len();
                continue;
            }

            window.push(self.spawn_batch(batch, cancel.clone(), None));

            if launched % ceiling == 0 || launched == total {
                let window_num = launched.div_ceil(ceiling);
                logging::log_window_start(window_num, total_windows, window.len());
                // 等待本窗口所有任务完成
                drain(&mut window, stats).await;
                logging::log_window_complete(window_num, stats);
            }
        }

        // 取消后可能留下未满的窗口
        drain(&mut window, stats).await;
    }

    async fn run_pooled(
        &self,
        batches: Vec<Batch>,
        ceiling: usize,
        cancel: &CancellationToken,
        stats: &mut RunStats,
    ) {
        let semaphore = Arc::new(Semaphore::new(ceiling));
        let mut handles = Vec::with_capacity(batches.len());

        for batch in batches {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                stats.not_admitted += batch.records.len();
                continue;
            };
            handles.push(self.spawn_batch(batch, cancel.clone(), Some(permit)));
        }

        drain(&mut handles, stats).await;
    }

    fn spawn_batch(
        &self,
        batch: Batch,
        cancel: CancellationToken,
        permit: Option<OwnedSemaphorePermit>,
    ) -> (usize, JoinHandle<BatchReport>) {
        let index = batch.index;
        let factory = Arc::clone(&self.factory);
        let store = Arc::clone(&self.store);
        let flow = Arc::clone(&self.flow);

        let handle = tokio::spawn(async move {
            let _permit = permit;
            session_runner::process_batch(
                factory.as_ref(),
                store.as_ref(),
                flow.as_ref(),
                batch,
                &cancel,
            )
            .await
        });
        (index, handle)
    }
}

/// 等待所有已启动的批次结束并汇总
async fn drain(handles: &mut Vec<(usize, JoinHandle<BatchReport>)>, stats: &mut RunStats) {
    for (index, handle) in handles.drain(..) {
        match handle.await {
            Ok(report) => {
                if report.classified() + report.abandoned != report.total {
                    warn!("[批次 {}] 统计不一致: {:?}", index, report);
                }
                stats.absorb(&report);
            }
            Err(e) => {
                error!("[批次 {}] 任务执行失败: {}", index, e);
                stats.crashed_batches += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_address_line;

    fn records(n: usize) -> Vec<WorkRecord> {
        (1..=n)
            .map(|i| parse_address_line(&format!("{} Main St", i)).with_id(i as i64))
            .collect()
    }

    #[test]
    fn test_partition_is_complete_and_ordered() {
        for n in [0usize, 1, 9, 10, 11, 25, 100] {
            for b in [1usize, 3, 10, 12] {
                let input = records(n);
                let batches = partition(input.clone(), b);

                assert_eq!(batches.len(), n.div_ceil(b), "n={} b={}", n, b);
                assert!(batches.iter().all(|batch| batch.records.len() <= b));

                let flattened: Vec<WorkRecord> =
                    batches.iter().flat_map(|batch| batch.records.clone()).collect();
                assert_eq!(flattened, input);

                let indices: Vec<usize> = batches.iter().map(|batch| batch.index).collect();
                assert_eq!(indices, (1..=batches.len()).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_last_batch_may_be_short() {
        let batches = partition(records(23), 10);
        let sizes: Vec<usize> = batches.iter().map(|b| b.records.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
    }

    #[test]
    fn test_partition_is_deterministic() {
        assert_eq!(partition(records(37), 10), partition(records(37), 10));
    }

    #[test]
    fn test_zero_batch_size_treated_as_one() {
        assert_eq!(partition(records(3), 0).len(), 3);
    }
}
