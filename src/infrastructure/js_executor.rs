//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::AutomationResult;

/// 在嵌套 frame 中按名字查找窗口，跨域 frame 直接跳过
const FIND_FRAME_FN: &str = r#"
const findFrame = (win, name) => {
    for (let i = 0; i < win.frames.length; i++) {
        const child = win.frames[i];
        try {
            if (child.name === name) return child;
            const nested = findFrame(child, name);
            if (nested) return nested;
        } catch (e) {}
    }
    return null;
};
"#;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力以及基于它的 frame 操作
/// - 不认识地址记录
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AutomationResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value: JsonValue = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AutomationResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 选中输入框的全部内容，之后的输入会覆盖而不是追加
    ///
    /// 返回元素是否存在
    pub async fn select_all(&self, locator: &str) -> AutomationResult<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.focus();
                if (typeof el.select === 'function') el.select();
                return true;
            }})()
            "#,
            serde_json::to_string(locator)?
        );
        self.eval_as(js_code).await
    }

    /// 列出页面内所有（可访问的）frame 名字，包括嵌套的
    pub async fn frame_names(&self) -> AutomationResult<Vec<String>> {
        let js_code = r#"
            (() => {
                const names = [];
                const walk = (win) => {
                    for (let i = 0; i < win.frames.length; i++) {
                        const child = win.frames[i];
                        try {
                            names.push(child.name || '');
                            walk(child);
                        } catch (e) {}
                    }
                };
                walk(window);
                return names;
            })()
        "#;
        self.eval_as(js_code).await
    }

    /// 在指定名字的 frame 内点击元素
    ///
    /// 返回 `"ok"`、`"no-frame"` 或 `"no-element"`
    pub async fn click_in_frame(&self, frame_name: &str, locator: &str) -> AutomationResult<String> {
        let js_code = format!(
            r#"
            (() => {{
                {}
                const frame = findFrame(window, {});
                if (!frame) return 'no-frame';
                const el = frame.document.querySelector({});
                if (!el) return 'no-element';
                el.click();
                return 'ok';
            }})()
            "#,
            FIND_FRAME_FN,
            serde_json::to_string(frame_name)?,
            serde_json::to_string(locator)?
        );
        self.eval_as(js_code).await
    }

    /// 读取指定名字 frame 的文档，frame 不存在时返回 None
    pub async fn frame_content(&self, frame_name: &str) -> AutomationResult<Option<String>> {
        let js_code = format!(
            r#"
            (() => {{
                {}
                const frame = findFrame(window, {});
                if (!frame || !frame.document.documentElement) return {{ html: null }};
                return {{ html: frame.document.documentElement.outerHTML }};
            }})()
            "#,
            FIND_FRAME_FN,
            serde_json::to_string(frame_name)?
        );
        let document: FrameDocument = self.eval_as(js_code).await?;
        Ok(document.html)
    }
}

/// 页面脚本返回 null 时 CDP 不带 value，所以包一层对象
#[derive(Deserialize)]
struct FrameDocument {
    html: Option<String>,
}
