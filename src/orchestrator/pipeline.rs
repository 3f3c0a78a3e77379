//! 流水线驱动 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开记录存储
//! 2. **初始导入**：配置了平面文件时先批量导入（已存在的地址跳过，重启不会重复导入）
//! 3. **断点续跑**：只读取尚未处理的记录
//! 4. **浏览器准备**：调度前确认浏览器可用（只做一次）
//! 5. **批量调度**：委托 `BatchScheduler`，等待全部批次结束
//! 6. **心跳**：调度结束后保持进程存活，直到收到取消信号

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser::{BrowserRuntime, LaunchOptions};
use crate::config::Config;
use crate::infrastructure::{ChromeSessionFactory, SessionFactory};
use crate::models::load_flat_file;
use crate::orchestrator::batch_processor::{BatchScheduler, RunStats};
use crate::store::{RecordStore, SqliteStore};
use crate::utils::logging;
use crate::workflow::RecordFlow;

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<dyn RecordStore>,
    runtime: BrowserRuntime,
    factory: Option<Arc<dyn SessionFactory>>,
}

impl App {
    /// 初始化应用：存储打不开时直接失败，此时还没有任何进度
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        logging::log_startup(&config);

        let store = SqliteStore::open(config.connection_string()?)
            .context("无法打开记录存储")?;

        Ok(Self {
            runtime: BrowserRuntime::new(config.chrome_executable.clone()),
            config,
            store: Arc::new(store),
            factory: None,
        })
    }

    /// 使用外部提供的存储和会话工厂
    pub fn with_components(
        config: Config,
        store: Arc<dyn RecordStore>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            runtime: BrowserRuntime::new(config.chrome_executable.clone()),
            config,
            store,
            factory: Some(factory),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// 运行应用主逻辑：处理全部记录，然后进入心跳直到取消
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunStats> {
        let stats = self.process(&cancel).await?;

        if cancel.is_cancelled() {
            info!("⏹️ 已取消，跳过心跳");
        } else {
            heartbeat(self.config.heartbeat_interval(), &cancel).await;
        }

        info!("👋 程序退出");
        Ok(stats)
    }

    /// 导入、读取、调度，全部批次结束后返回
    pub async fn process(&self, cancel: &CancellationToken) -> Result<RunStats> {
        if let Some(path) = &self.config.input_file {
            self.seed_from_file(path).await?;
        }

        info!("\n📁 正在读取未处理的记录...");
        let records = self
            .store
            .fetch_unprocessed(self.config.fetch_offset, self.config.fetch_limit)
            .await
            .context("读取未处理记录失败")?;

        logging::log_records_loaded(records.len(), &self.config);
        if records.is_empty() {
            warn!("⚠️ 没有待处理的记录");
            return Ok(RunStats::default());
        }

        let factory = self.session_factory().await?;
        let scheduler = BatchScheduler::new(
            factory,
            Arc::clone(&self.store),
            Arc::new(RecordFlow::new(&self.config)),
            self.config.admission_mode,
        );

        let stats = scheduler
            .schedule(
                records,
                self.config.batch_size,
                self.config.max_concurrent_sessions,
                cancel,
            )
            .await;

        logging::print_final_stats(&stats);
        Ok(stats)
    }

    async fn seed_from_file(&self, path: &std::path::Path) -> Result<()> {
        let records = load_flat_file(path).await?;
        if records.is_empty() {
            warn!("⚠️ 地址文件为空: {}", path.display());
            return Ok(());
        }
        let ids = self
            .store
            .insert_many(&records)
            .await
            .context("导入地址失败")?;
        info!(
            "✓ 已导入 {} 条新地址, {} 条已在存储中",
            ids.len(),
            records.len() - ids.len()
        );
        Ok(())
    }

    /// 会话工厂：外部提供的优先，否则在确认浏览器可用后创建 Chrome 工厂
    async fn session_factory(&self) -> Result<Arc<dyn SessionFactory>> {
        if let Some(factory) = &self.factory {
            return Ok(Arc::clone(factory));
        }
        let executable = self.runtime.ensure().await?;
        Ok(Arc::new(ChromeSessionFactory::new(LaunchOptions {
            executable,
            headless: self.config.headless,
            request_timeout: self.config.request_timeout(),
        })))
    }
}

/// 心跳：每个间隔输出一次存活日志，收到取消信号立即返回
///
/// 返回输出的心跳次数
pub async fn heartbeat(interval: Duration, cancel: &CancellationToken) -> u64 {
    let mut beats = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {
                beats += 1;
                info!("Worker running at: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"));
            }
        }
    }
    beats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_heartbeat_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(60)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let beats = heartbeat(Duration::from_millis(10), &cancel).await;
        assert!(beats >= 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_heartbeat_returns_immediately_when_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(heartbeat(Duration::from_secs(3600), &cancel).await, 0);
    }
}
