//! 定位脚本 - 业务能力层
//!
//! 门户的固定操作顺序，纯数据，不持有任何状态。
//! 地址输入框不会自动清空，所以每次输入前都先全选再覆盖。

use std::time::Duration;

/// 门户页面上用到的定位器
pub mod locators {
    pub const SEARCH_MENU: &str =
        "#Web_PT_Header_MyMenuManager_mnuMainn3 > table > tbody > tr > td > a";
    pub const SEARCH_STYLE: &str = "#objWP_reportparameterstyle_ESearchManager1_rdblStyles_0";
    pub const LOAD_STYLE_CONTENT: &str =
        "#objWP_reportparameterstyle_ESearchManager1_cmdLoadStyleContent";
    pub const HOUSE_NUMBER_FIELD: &str =
        "#objWP_reportparameterstyle_ESearchManager1_Web_CO_SearchPanel1_txt_GFD0";
    pub const STREET_FIELD: &str =
        "#objWP_reportparameterstyle_ESearchManager1_Web_CO_SearchPanel1_txt_GFD1";
    pub const SUBMIT_SEARCH: &str =
        "#objWP_reportparameterstyle_ESearchManager1_Web_CO_SearchPanel1_btnGo";
    pub const RESULT_ROWS: &str =
        "#objWP_reportparameterstyle_ESearchManager1_Web_CO_SearchPanel1_grdResult > tbody > tr";
    pub const FINISH: &str = "#objWP_reportparameterstyle_ESearchManager1_cmdFinish";
    /// 报表查看器 frame 名字中的固定片段
    pub const REPORT_FRAME_PART: &str = "bobjid";
    pub const DETAIL_EXPAND: &str = "#Text5 > div > div > a";
    pub const OWNER_BLOCK: &str = "div#Ownername1";
    pub const BOOK_PAGE_BLOCK: &str = "div#bookpage1";
}

/// 每次点击后的固定等待时间（门户没有可靠的完成事件）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleWaits {
    pub after_navigate: Duration,
    pub after_menu: Duration,
    pub after_style: Duration,
    pub after_load_style: Duration,
    pub after_submit: Duration,
    pub after_finish: Duration,
    pub after_detail_expand: Duration,
}

impl Default for SettleWaits {
    fn default() -> Self {
        Self {
            after_navigate: Duration::from_millis(2000),
            after_menu: Duration::from_millis(3000),
            after_style: Duration::from_millis(2000),
            after_load_style: Duration::from_millis(3000),
            after_submit: Duration::from_millis(3000),
            after_finish: Duration::from_millis(3500),
            after_detail_expand: Duration::from_millis(5000),
        }
    }
}

impl SettleWaits {
    /// 按倍率缩放所有等待
    pub fn scaled(scale: f64) -> Self {
        let d = Self::default();
        let s = |x: Duration| x.mul_f64(scale.max(0.0));
        Self {
            after_navigate: s(d.after_navigate),
            after_menu: s(d.after_menu),
            after_style: s(d.after_style),
            after_load_style: s(d.after_load_style),
            after_submit: s(d.after_submit),
            after_finish: s(d.after_finish),
            after_detail_expand: s(d.after_detail_expand),
        }
    }
}

/// 输入内容取自记录的哪个字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    HouseNumber,
    Street,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Navigate(String),
    Click(String),
    /// 全选输入框内容，下一次输入将覆盖它
    SelectAll(String),
    Type {
        locator: String,
        source: TextSource,
        per_char_delay: Duration,
    },
    Wait(Duration),
    ReadDocument,
    FindFrameByNamePart(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub name: &'static str,
    pub step: Step,
}

/// 有序、具名的操作序列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorScript {
    steps: Vec<ScriptStep>,
}

impl LocatorScript {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn then(mut self, name: &'static str, step: Step) -> Self {
        self.steps.push(ScriptStep { name, step });
        self
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// 门户搜索脚本：打开门户 → 选择搜索方式 → 输入门牌号和街道 → 提交 → 读取结果页
    pub fn portal_search(url: &str, waits: &SettleWaits, type_delay: Duration) -> Self {
        use locators::*;

        Self::new()
            .then("打开门户", Step::Navigate(url.to_string()))
            .then("等待门户加载", Step::Wait(waits.after_navigate))
            .then("打开搜索菜单", Step::Click(SEARCH_MENU.to_string()))
            .then("等待菜单", Step::Wait(waits.after_menu))
            .then("选择搜索方式", Step::Click(SEARCH_STYLE.to_string()))
            .then("等待搜索方式", Step::Wait(waits.after_style))
            .then("加载搜索表单", Step::Click(LOAD_STYLE_CONTENT.to_string()))
            .then("等待搜索表单", Step::Wait(waits.after_load_style))
            .then("清空门牌号", Step::SelectAll(HOUSE_NUMBER_FIELD.to_string()))
            .then(
                "输入门牌号",
                Step::Type {
                    locator: HOUSE_NUMBER_FIELD.to_string(),
                    source: TextSource::HouseNumber,
                    per_char_delay: type_delay,
                },
            )
            .then("清空街道", Step::SelectAll(STREET_FIELD.to_string()))
            .then(
                "输入街道",
                Step::Type {
                    locator: STREET_FIELD.to_string(),
                    source: TextSource::Street,
                    per_char_delay: type_delay,
                },
            )
            .then("提交搜索", Step::Click(SUBMIT_SEARCH.to_string()))
            .then("等待搜索结果", Step::Wait(waits.after_submit))
            .then("读取结果页", Step::ReadDocument)
    }

    /// 展开脚本：点击完成 → 等待报表 → 查找报表 frame
    pub fn portal_expand(waits: &SettleWaits) -> Self {
        use locators::*;

        Self::new()
            .then("打开报表", Step::Click(FINISH.to_string()))
            .then("等待报表", Step::Wait(waits.after_finish))
            .then(
                "查找报表 frame",
                Step::FindFrameByNamePart(REPORT_FRAME_PART.to_string()),
            )
    }
}

impl Default for LocatorScript {
    fn default() -> Self {
        Self::new()
    }
}
