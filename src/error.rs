use chromiumoxide::error::CdpError;
use thiserror::Error;

/// 记录存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 存储无法连接（启动读取时致命）
    #[error("存储不可用: {0}")]
    Unavailable(String),

    /// 单条结果写入失败
    #[error("写入记录 {id:?} 失败: {message}")]
    Write { id: Option<i64>, message: String },

    /// 记录没有持久化身份，无法按身份写入
    #[error("记录缺少身份标识: {address}")]
    MissingIdentity { address: String },

    /// 存储中的数据无法还原为记录
    #[error("存储数据损坏: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn write(id: Option<i64>, source: impl std::fmt::Display) -> Self {
        StoreError::Write {
            id,
            message: source.to_string(),
        }
    }
}

/// 浏览器自动化错误
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    Launch(String),

    /// CDP 调用失败
    #[error("CDP 调用失败: {0}")]
    Cdp(#[source] CdpError),

    /// 找不到定位器对应的元素
    #[error("找不到元素: {0}")]
    LocatorNotFound(String),

    /// frame 在导航后丢失
    #[error("frame 已丢失: {0}")]
    FrameLost(String),

    /// 页面脚本返回了意外的值
    #[error("页面脚本执行失败: {0}")]
    Script(String),

    /// 会话本身不可用（浏览器进程退出、连接断开）
    #[error("浏览器会话已断开: {0}")]
    SessionLost(String),
}

impl AutomationError {
    /// 会话级错误：同一批次的剩余记录无法继续
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            AutomationError::SessionLost(_) | AutomationError::Launch(_)
        )
    }
}

impl From<CdpError> for AutomationError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                AutomationError::SessionLost(err.to_string())
            }
            other => AutomationError::Cdp(other),
        }
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        AutomationError::Script(err.to_string())
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必需的配置项不存在
    #[error("缺少必需配置项 {0}")]
    Missing(&'static str),

    /// 配置值无法解析或不合法
    #[error("配置项 {key} 的值 '{value}' 不合法: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 读取失败: {message}")]
    File { path: String, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type AutomationResult<T> = Result<T, AutomationError>;
