use crate::models::record::WorkRecord;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 解析一行地址：第一个空白分隔的词是门牌号，其余部分是街道
pub fn parse_address_line(line: &str) -> WorkRecord {
    let line = line.trim();
    let (house_number, street) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    WorkRecord::new(house_number, street, line)
}

/// 解析整个文本，跳过空行
pub fn parse_flat_text(content: &str) -> Vec<WorkRecord> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_address_line)
        .collect()
}

/// 从平面文件加载地址列表（每行一个地址）
pub async fn load_flat_file(path: &Path) -> Result<Vec<WorkRecord>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取地址文件: {}", path.display()))?;

    let records = parse_flat_text(&content);
    tracing::info!(
        "从 {} 读取到 {} 条地址",
        path.file_name().unwrap_or_default().to_string_lossy(),
        records.len()
    );
    Ok(records)
}
