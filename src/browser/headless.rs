use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AutomationError, AutomationResult};

/// 启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub executable: PathBuf,
    pub headless: bool,
    pub request_timeout: Duration,
}

/// 启动一个独立的浏览器进程并打开空白页
///
/// `profile_dir` 必须在并发会话之间互不相同。
pub async fn launch_browser(
    options: &LaunchOptions,
    profile_dir: PathBuf,
) -> AutomationResult<(Browser, Page, JoinHandle<()>)> {
    info!("🚀 启动浏览器...");
    debug!(
        "可执行文件: {}, 用户目录: {}",
        options.executable.display(),
        profile_dir.display()
    );

    let builder = BrowserConfig::builder()
        .chrome_executable(&options.executable)
        .user_data_dir(profile_dir)
        .request_timeout(options.request_timeout)
        .viewport(None)
        .args(vec![
            "--disable-gpu",           // Windows 无头模式必须禁用 GPU
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
        ]);
    let builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        AutomationError::Launch(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AutomationError::Launch(format!("启动浏览器失败: {}", e))
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        AutomationError::Launch(format!("创建页面失败: {}", e))
    })?;

    Ok((browser, page, handler_task))
}
