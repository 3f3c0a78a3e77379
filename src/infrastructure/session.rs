//! 浏览器会话抽象
//!
//! 流程层只通过这个 trait 操作浏览器，不直接接触 chromiumoxide。

use async_trait::async_trait;
use std::time::Duration;

use crate::error::AutomationResult;

/// frame 的查找结果
///
/// 只记录 frame 的名字，每次使用时按名字重新定位；导航之后应重新调用
/// `find_frame_by_name_part` 而不是沿用旧句柄。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    name: String,
}

impl FrameHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 一个浏览器会话（一个页面），同一时间只被一个批次独占
#[async_trait]
pub trait AutomationSession: Send {
    async fn navigate(&mut self, url: &str) -> AutomationResult<()>;

    async fn click(&mut self, locator: &str) -> AutomationResult<()>;

    /// 选中输入框全部内容（相当于三击）
    async fn select_all(&mut self, locator: &str) -> AutomationResult<()>;

    /// 逐字输入，每个字符之间等待 `per_char_delay`
    async fn type_text(
        &mut self,
        locator: &str,
        text: &str,
        per_char_delay: Duration,
    ) -> AutomationResult<()>;

    async fn wait(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// 读取当前页面文档
    async fn read_document(&mut self) -> AutomationResult<String>;

    /// 查找名字包含 `part` 的第一个 frame
    async fn find_frame_by_name_part(&mut self, part: &str) -> AutomationResult<Option<FrameHandle>>;

    async fn click_in_frame(&mut self, frame: &FrameHandle, locator: &str) -> AutomationResult<()>;

    async fn read_frame_document(&mut self, frame: &FrameHandle) -> AutomationResult<String>;

    /// 关闭会话，释放浏览器进程
    async fn close(&mut self) -> AutomationResult<()>;
}

/// 会话工厂，每个批次向它申请一个独占的会话
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open_session(&self) -> AutomationResult<Box<dyn AutomationSession>>;
}
