//! 结果解析 - 业务能力层
//!
//! 只负责从页面文档里读出结果行数和详情字段，不关心流程

use scraper::{Html, Selector};
use thiserror::Error;

use crate::models::SessionOutcome;
use crate::services::locator_script::locators;

/// 详情页解析失败的原因
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("详情页中没有业主姓名")]
    OwnerMissing,
    #[error("详情页中没有 book/page 信息")]
    BookPageMissing,
    #[error("book/page 信息中没有 '*' 分隔符: {0}")]
    MissingDelimiter(String),
    #[error("字段 {0} 为空")]
    EmptyField(&'static str),
    #[error("选择器无效: {0}")]
    BadSelector(String),
}

/// 详情页中提取出的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFields {
    pub owner_name: String,
    pub book_page: String,
    pub transaction_date: String,
}

impl From<DetailFields> for SessionOutcome {
    fn from(fields: DetailFields) -> Self {
        SessionOutcome::Matched {
            owner_name: fields.owner_name,
            book_page: fields.book_page,
            transaction_date: fields.transaction_date,
        }
    }
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::BadSelector(format!("{}: {:?}", css, e)))
}

/// 规范化空白：`&nbsp;` 换成两个空格，去掉换行，首尾去空
pub fn normalize_text(raw: &str) -> String {
    raw.replace("&nbsp;", "  ")
        .replace('\u{a0}', "  ")
        .replace(['\n', '\r'], "")
        .trim()
        .to_string()
}

/// 结果表中的行数，表不存在时为 0
pub fn count_result_rows(html: &str) -> Result<usize, ExtractionError> {
    let document = Html::parse_document(html);
    let rows = selector(locators::RESULT_ROWS)?;
    Ok(document.select(&rows).count())
}

/// 取最后一个匹配元素的文本
fn last_text(document: &Html, css: &str) -> Result<Option<String>, ExtractionError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .last()
        .map(|el| el.text().collect::<String>()))
}

/// 拆分 book/page 文本：第一段是 book/page，第二段是日期
pub fn split_book_page(text: &str) -> Result<(String, String), ExtractionError> {
    let normalized = normalize_text(text);
    let parts: Vec<&str> = normalized.split('*').collect();
    if parts.len() < 2 {
        return Err(ExtractionError::MissingDelimiter(normalized.clone()));
    }
    let book_page = parts[0].trim().to_string();
    let date = parts[1].trim().to_string();
    if book_page.is_empty() {
        return Err(ExtractionError::EmptyField("book_page"));
    }
    if date.is_empty() {
        return Err(ExtractionError::EmptyField("transaction_date"));
    }
    Ok((book_page, date))
}

/// 解析详情页
pub fn parse_detail(html: &str) -> Result<DetailFields, ExtractionError> {
    let document = Html::parse_document(html);

    let owner = last_text(&document, locators::OWNER_BLOCK)?.ok_or(ExtractionError::OwnerMissing)?;
    let owner_name = normalize_text(&owner);
    if owner_name.is_empty() {
        return Err(ExtractionError::EmptyField("owner_name"));
    }

    let book_page_text =
        last_text(&document, locators::BOOK_PAGE_BLOCK)?.ok_or(ExtractionError::BookPageMissing)?;
    let (book_page, transaction_date) = split_book_page(&book_page_text)?;

    Ok(DetailFields {
        owner_name,
        book_page,
        transaction_date,
    })
}
