//! 浏览器运行时
//!
//! 调度开始前解析一次浏览器可执行文件，之后所有会话共用同一结果。

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::info;

/// PATH 中常见的浏览器可执行文件名
const PATH_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
];

/// 常见安装位置
const WELL_KNOWN_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

pub struct BrowserRuntime {
    configured: Option<PathBuf>,
    resolved: OnceCell<PathBuf>,
}

impl BrowserRuntime {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self {
            configured,
            resolved: OnceCell::new(),
        }
    }

    /// 确保浏览器可用，重复调用直接返回第一次的结果
    pub async fn ensure(&self) -> Result<PathBuf> {
        let path = self
            .resolved
            .get_or_try_init(|| async { self.resolve() })
            .await?;
        Ok(path.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.resolved.initialized()
    }

    fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = &self.configured {
            if path.is_file() {
                info!("✓ 使用指定的浏览器: {}", path.display());
                return Ok(path.clone());
            }
            bail!("指定的浏览器不存在: {}", path.display());
        }

        if let Some(path) = search_path(PATH_CANDIDATES) {
            info!("✓ 在 PATH 中找到浏览器: {}", path.display());
            return Ok(path);
        }

        if let Some(path) = WELL_KNOWN_LOCATIONS
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
        {
            info!("✓ 找到浏览器: {}", path.display());
            return Ok(path.to_path_buf());
        }

        bail!("未找到可用的 Chrome/Chromium/Edge，请设置 CHROME_EXECUTABLE")
    }
}

fn search_path(names: &[&str]) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        names.iter().find_map(|name| {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            let exe = dir.join(format!("{}.exe", name));
            exe.is_file().then_some(exe)
        })
    })
}
