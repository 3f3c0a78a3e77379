use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 默认的门户地址
pub const DEFAULT_PORTAL_URL: &str =
    "https://paytax.erie.gov/(S(tsuym4i1s14qiuyp2z1fequh))/WebPortal/WEB_PT_MAIN.aspx?command=";

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "paytax.toml";

/// 批次准入方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionMode {
    /// 固定窗口：一个窗口内的批次全部完成后才放行下一窗口
    Windowed,
    /// 信号量池：任一会话空出即放行下一批次
    Pooled,
}

impl FromStr for AdmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windowed" => Ok(AdmissionMode::Windowed),
            "pooled" => Ok(AdmissionMode::Pooled),
            other => Err(format!("未知的准入方式: {}", other)),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 存储位置（SQLite 文件路径或 `:memory:`）
    pub db_connection_string: Option<String>,
    /// 门户地址
    pub portal_url: String,
    /// 每个批次的记录数
    pub batch_size: usize,
    /// 同时运行的浏览器会话上限
    pub max_concurrent_sessions: usize,
    /// 读取未处理记录时的偏移
    pub fetch_offset: usize,
    /// 读取未处理记录时的上限
    pub fetch_limit: usize,
    /// 心跳间隔（毫秒）
    pub heartbeat_interval_ms: u64,
    /// 输入时每个字符之间的延迟（毫秒）
    pub type_delay_ms: u64,
    /// 是否无头运行
    pub headless: bool,
    /// 指定浏览器可执行文件
    pub chrome_executable: Option<PathBuf>,
    /// 单个 CDP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 平面文件输入（用于初始化存储）
    pub input_file: Option<PathBuf>,
    /// 批次准入方式
    pub admission_mode: AdmissionMode,
    /// 所有固定等待时间的倍率
    pub settle_scale: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_connection_string: None,
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            batch_size: 10,
            max_concurrent_sessions: 10,
            fetch_offset: 30000,
            fetch_limit: 50000,
            heartbeat_interval_ms: 1000,
            type_delay_ms: 100,
            headless: false,
            chrome_executable: None,
            request_timeout_secs: 30,
            input_file: None,
            admission_mode: AdmissionMode::Pooled,
            settle_scale: 1.0,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → 配置文件 → 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("PAYTAX_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let path = Path::new(&file);
        let base = if path.exists() {
            Self::from_toml_file(path)?
        } else {
            Self::default()
        };
        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺失的键使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::File { message, .. } => ConfigError::File {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::File {
            path: String::new(),
            message: e.to_string(),
        })
    }

    /// 用键值来源覆盖配置（生产环境中来源是进程环境变量）
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DB_CONNECTION_STRING") {
            self.db_connection_string = Some(v);
        }
        if let Some(v) = lookup("PORTAL_URL") {
            self.portal_url = v;
        }
        if let Some(v) = lookup("BATCH_SIZE") {
            self.batch_size = parse_value("BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("MAX_CONCURRENT_SESSIONS") {
            self.max_concurrent_sessions = parse_value("MAX_CONCURRENT_SESSIONS", &v)?;
        }
        if let Some(v) = lookup("FETCH_OFFSET") {
            self.fetch_offset = parse_value("FETCH_OFFSET", &v)?;
        }
        if let Some(v) = lookup("FETCH_LIMIT") {
            self.fetch_limit = parse_value("FETCH_LIMIT", &v)?;
        }
        if let Some(v) = lookup("HEARTBEAT_INTERVAL_MS") {
            self.heartbeat_interval_ms = parse_value("HEARTBEAT_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("TYPE_DELAY_MS") {
            self.type_delay_ms = parse_value("TYPE_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("HEADLESS") {
            self.headless = parse_value("HEADLESS", &v)?;
        }
        if let Some(v) = lookup("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_value("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("INPUT_FILE") {
            self.input_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("ADMISSION_MODE") {
            self.admission_mode = parse_value("ADMISSION_MODE", &v)?;
        }
        if let Some(v) = lookup("SETTLE_SCALE") {
            self.settle_scale = parse_value("SETTLE_SCALE", &v)?;
        }
        Ok(self)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_connection_string.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("DB_CONNECTION_STRING"));
        }
        if self.batch_size == 0 {
            return Err(invalid("BATCH_SIZE", "0", "必须大于 0"));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(invalid("MAX_CONCURRENT_SESSIONS", "0", "必须大于 0"));
        }
        if !(self.settle_scale >= 0.0) {
            return Err(invalid(
                "SETTLE_SCALE",
                &self.settle_scale.to_string(),
                "不能为负数",
            ));
        }
        Ok(())
    }

    /// 存储位置（`validate` 通过后一定存在）
    pub fn connection_string(&self) -> Result<&str, ConfigError> {
        self.db_connection_string
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("DB_CONNECTION_STRING"))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn type_delay(&self) -> Duration {
        Duration::from_millis(self.type_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
