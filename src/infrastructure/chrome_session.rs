use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::Browser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::browser::{launch_browser, LaunchOptions};
use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::session::{AutomationSession, FrameHandle, SessionFactory};

/// chromiumoxide 驱动的会话：一个浏览器进程 + 一个页面
pub struct ChromeSession {
    browser: Browser,
    executor: JsExecutor,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromeSession {
    async fn element(&self, locator: &str) -> AutomationResult<Element> {
        self.executor
            .page()
            .find_element(locator)
            .await
            .map_err(|e| match AutomationError::from(e) {
                lost @ AutomationError::SessionLost(_) => lost,
                _ => AutomationError::LocatorNotFound(locator.to_string()),
            })
    }
}

#[async_trait]
impl AutomationSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> AutomationResult<()> {
        debug!("导航到: {}", url);
        self.executor.page().goto(url).await?;
        Ok(())
    }

    async fn click(&mut self, locator: &str) -> AutomationResult<()> {
        self.element(locator).await?.click().await?;
        Ok(())
    }

    async fn select_all(&mut self, locator: &str) -> AutomationResult<()> {
        self.element(locator).await?.click().await?;
        if !self.executor.select_all(locator).await? {
            return Err(AutomationError::LocatorNotFound(locator.to_string()));
        }
        Ok(())
    }

    async fn type_text(
        &mut self,
        locator: &str,
        text: &str,
        per_char_delay: Duration,
    ) -> AutomationResult<()> {
        let element = self.element(locator).await?;
        for ch in text.chars() {
            element.type_str(ch.to_string()).await?;
            sleep(per_char_delay).await;
        }
        Ok(())
    }

    async fn read_document(&mut self) -> AutomationResult<String> {
        Ok(self.executor.page().content().await?)
    }

    async fn find_frame_by_name_part(&mut self, part: &str) -> AutomationResult<Option<FrameHandle>> {
        let names = self.executor.frame_names().await?;
        debug!("页面 frame: {:?}", names);
        Ok(names
            .into_iter()
            .find(|name| name.contains(part))
            .map(FrameHandle::new))
    }

    async fn click_in_frame(&mut self, frame: &FrameHandle, locator: &str) -> AutomationResult<()> {
        match self.executor.click_in_frame(frame.name(), locator).await?.as_str() {
            "ok" => Ok(()),
            "no-frame" => Err(AutomationError::FrameLost(frame.name().to_string())),
            "no-element" => Err(AutomationError::LocatorNotFound(locator.to_string())),
            other => Err(AutomationError::Script(format!("未知的返回值: {}", other))),
        }
    }

    async fn read_frame_document(&mut self, frame: &FrameHandle) -> AutomationResult<String> {
        self.executor
            .frame_content(frame.name())
            .await?
            .ok_or_else(|| AutomationError::FrameLost(frame.name().to_string()))
    }

    async fn close(&mut self) -> AutomationResult<()> {
        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("等待浏览器退出失败: {}", e);
        }
        self.handler_task.abort();
        remove_profile(&self.profile_dir).await;
        result?;
        Ok(())
    }
}

/// 删除会话的用户目录，浏览器退出后才能删干净
async fn remove_profile(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!("已删除用户目录: {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("删除用户目录失败 {}: {}", dir.display(), e),
    }
}

/// 为每个批次启动独立的浏览器进程
pub struct ChromeSessionFactory {
    options: LaunchOptions,
    profile_root: PathBuf,
    launched: AtomicUsize,
}

impl ChromeSessionFactory {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            profile_root: std::env::temp_dir().join(format!("paytax-lookup-{}", std::process::id())),
            launched: AtomicUsize::new(0),
        }
    }

    /// 各会话用户目录的父目录
    pub fn profile_root(&self) -> &Path {
        &self.profile_root
    }

    /// 已经启动过的会话数
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn open_session(&self) -> AutomationResult<Box<dyn AutomationSession>> {
        let seq = self.launched.fetch_add(1, Ordering::SeqCst);
        let profile_dir = self.profile_root.join(format!("session-{}", seq));
        let (browser, page, handler_task) =
            match launch_browser(&self.options, profile_dir.clone()).await {
                Ok(launched) => launched,
                Err(e) => {
                    remove_profile(&profile_dir).await;
                    return Err(e);
                }
            };
        Ok(Box::new(ChromeSession {
            browser,
            executor: JsExecutor::new(page),
            handler_task,
            profile_dir,
        }))
    }
}
