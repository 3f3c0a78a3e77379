//! 记录处理流程 - 流程层
//!
//! 核心职责：定义"一条地址"的完整查询流程
//!
//! 状态顺序：
//! 1. Idle → SearchSubmitted：执行搜索脚本
//! 2. SearchSubmitted → ResultChecked：统计结果行，没有结果直接判定 NoResult
//! 3. ResultChecked → Expanding：打开报表，查找报表 frame
//! 4. Expanding → DetailRead：在 frame 内展开详情，重新查找 frame 后读取文档
//! 5. DetailRead → Classified：解析业主和 book/page
//!
//! 任意一步的自动化错误都归为 TransientError；只有会话级错误会返回 Err。

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::{AutomationSession, FrameHandle};
use crate::models::{SessionOutcome, WorkRecord};
use crate::services::{
    count_result_rows, locators, parse_detail, LocatorScript, SettleWaits, Step, TextSource,
};
use crate::workflow::record_ctx::RecordCtx;

/// 流程所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Idle,
    SearchSubmitted,
    ResultChecked,
    Expanding,
    DetailRead,
    Classified,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowStage::Idle => "提交搜索",
            FlowStage::SearchSubmitted => "检查结果",
            FlowStage::ResultChecked => "打开报表",
            FlowStage::Expanding => "展开详情",
            FlowStage::DetailRead => "解析详情",
            FlowStage::Classified => "已分类",
        };
        f.write_str(name)
    }
}

/// 脚本执行的产出
#[derive(Debug, Default)]
struct ScriptOutput {
    document: Option<String>,
    frame: Option<FrameHandle>,
}

/// 记录处理流程
///
/// - 编排单条记录的查询流程
/// - 不持有任何资源（session 由调用方传入）
/// - 只依赖业务能力（services）
pub struct RecordFlow {
    search: LocatorScript,
    expand: LocatorScript,
    waits: SettleWaits,
}

impl RecordFlow {
    /// 按配置创建门户流程
    pub fn new(config: &Config) -> Self {
        Self::portal(
            &config.portal_url,
            SettleWaits::scaled(config.settle_scale),
            config.type_delay(),
        )
    }

    pub fn portal(url: &str, waits: SettleWaits, type_delay: Duration) -> Self {
        Self {
            search: LocatorScript::portal_search(url, &waits, type_delay),
            expand: LocatorScript::portal_expand(&waits),
            waits,
        }
    }

    /// 处理一条记录
    ///
    /// 返回 Err 表示会话已不可用，当前记录没有得到分类。
    pub async fn run(
        &self,
        session: &mut dyn AutomationSession,
        record: &WorkRecord,
        ctx: &RecordCtx,
    ) -> AutomationResult<SessionOutcome> {
        let mut stage = FlowStage::Idle;
        match self.classify(session, record, ctx, &mut stage).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_session_fatal() => {
                error!("{} ❌ 会话在{}阶段断开: {}", ctx, stage, e);
                Err(e)
            }
            Err(e) => {
                error!("{} ❌ {}阶段出错, 地址: {}: {}", ctx, stage, ctx.address, e);
                Ok(SessionOutcome::TransientError {
                    cause: format!("{}: {}", stage, e),
                })
            }
        }
    }

    async fn classify(
        &self,
        session: &mut dyn AutomationSession,
        record: &WorkRecord,
        ctx: &RecordCtx,
        stage: &mut FlowStage,
    ) -> AutomationResult<SessionOutcome> {
        // ========== 搜索 ==========
        let document = self
            .run_script(session, &self.search, record, ctx)
            .await?
            .document
            .ok_or_else(|| AutomationError::Script("搜索脚本没有读取结果页".to_string()))?;
        *stage = FlowStage::SearchSubmitted;

        // ========== 检查结果 ==========
        let rows = count_result_rows(&document).map_err(|e| AutomationError::Script(e.to_string()))?;
        *stage = FlowStage::ResultChecked;
        if rows == 0 {
            *stage = FlowStage::Classified;
            warn!("{} ⚠️ 未找到结果, 地址: {}", ctx, ctx.address);
            return Ok(SessionOutcome::NoResult);
        }
        debug!("{} 找到 {} 行结果", ctx, rows);

        // ========== 打开报表 ==========
        let Some(frame) = self.run_script(session, &self.expand, record, ctx).await?.frame else {
            *stage = FlowStage::Classified;
            warn!("{} ⚠️ 未找到报表 frame, 地址: {}", ctx, ctx.address);
            return Ok(SessionOutcome::ExtractionFailed {
                reason: "未找到报表 frame".to_string(),
            });
        };

        // ========== 展开详情 ==========
        *stage = FlowStage::Expanding;
        session.click_in_frame(&frame, locators::DETAIL_EXPAND).await?;
        session.wait(self.waits.after_detail_expand).await;
        // 展开后 frame 可能被替换，按名字重新查找
        let frame = session
            .find_frame_by_name_part(locators::REPORT_FRAME_PART)
            .await?
            .ok_or_else(|| AutomationError::FrameLost(locators::REPORT_FRAME_PART.to_string()))?;
        let detail = session.read_frame_document(&frame).await?;
        *stage = FlowStage::DetailRead;

        // ========== 解析 ==========
        let outcome = match parse_detail(&detail) {
            Ok(fields) => {
                info!(
                    "{} 地址: {} ===> {} - {}",
                    ctx, ctx.address, fields.owner_name, fields.book_page
                );
                SessionOutcome::from(fields)
            }
            Err(e) => {
                warn!("{} ⚠️ 未能解析业主信息, 地址: {}: {}", ctx, ctx.address, e);
                SessionOutcome::ExtractionFailed {
                    reason: e.to_string(),
                }
            }
        };
        *stage = FlowStage::Classified;
        Ok(outcome)
    }

    /// 顺序执行脚本中的每一步
    async fn run_script(
        &self,
        session: &mut dyn AutomationSession,
        script: &LocatorScript,
        record: &WorkRecord,
        ctx: &RecordCtx,
    ) -> AutomationResult<ScriptOutput> {
        let mut output = ScriptOutput::default();
        for step in script.steps() {
            debug!("{} → {}", ctx, step.name);
            match &step.step {
                Step::Navigate(url) => session.navigate(url).await?,
                Step::Click(locator) => session.click(locator).await?,
                Step::SelectAll(locator) => session.select_all(locator).await?,
                Step::Type {
                    locator,
                    source,
                    per_char_delay,
                } => {
                    let text = match source {
                        TextSource::HouseNumber => &record.house_number,
                        TextSource::Street => &record.street,
                    };
                    session.type_text(locator, text, *per_char_delay).await?;
                }
                Step::Wait(duration) => session.wait(*duration).await,
                Step::ReadDocument => output.document = Some(session.read_document().await?),
                Step::FindFrameByNamePart(part) => {
                    output.frame = session.find_frame_by_name_part(part).await?;
                }
            }
        }
        Ok(output)
    }
}
