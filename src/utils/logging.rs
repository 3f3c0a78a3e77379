/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{AdmissionMode, Config};
use crate::orchestrator::RunStats;

/// 初始化日志（`RUST_LOG` 控制级别，默认 info），重复调用无副作用
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 地址批量查询模式");
    info!("🌐 门户: {}", config.portal_url);
    info!(
        "📊 每批 {} 条, 最多 {} 个浏览器会话",
        config.batch_size, config.max_concurrent_sessions
    );
    info!("{}", "=".repeat(60));
}

/// 记录待处理记录数量
pub fn log_records_loaded(total: usize, config: &Config) {
    info!("✓ 找到 {} 条待处理的记录", total);
    info!(
        "📋 将切分为 {} 个批次",
        total.div_ceil(config.batch_size.max(1))
    );
    match config.admission_mode {
        AdmissionMode::Windowed => info!(
            "💡 每 {} 个批次为一个窗口，窗口完成后再开始下一窗口\n",
            config.max_concurrent_sessions
        ),
        AdmissionMode::Pooled => info!("💡 任一会话空出后立即开始下一个批次\n"),
    }
}

/// 记录窗口开始等待
pub fn log_window_start(window_num: usize, total_windows: usize, batches: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 第 {}/{} 个窗口: 已启动 {} 个批次, 等待完成", window_num, total_windows, batches);
    info!("{}", "=".repeat(60));
}

/// 记录窗口完成（统计为累计值）
pub fn log_window_complete(window_num: usize, stats: &RunStats) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 个窗口完成: 累计匹配 {}, 累计出错 {}",
        window_num,
        stats.matched,
        stats.errors()
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &RunStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部批次处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 记录: {} / 批次: {}", stats.records, stats.batches);
    info!("✅ 匹配: {}", stats.matched);
    info!("🔍 无结果: {}", stats.no_result);
    info!("⚠️ 解析失败: {}", stats.extraction_failed);
    info!("❌ 自动化出错: {}", stats.transient);
    info!("💾 写入失败: {}", stats.write_failures);
    info!("⏸️ 未处理: {}", stats.abandoned + stats.not_admitted);
    if stats.crashed_batches > 0 {
        info!("💥 异常退出的批次: {}", stats.crashed_batches);
    }
    info!("{}", "=".repeat(60));
}
