//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"页面操作"的能力

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::debug;

use crate::infrastructure::dom_scripts;
use crate::infrastructure::form_page::{ControlProbe, FormPage, LocatorStrategy};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 把 [`FormPage`] 的每个能力翻译成一段页面脚本
/// - 不认识字段 / 答案
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

#[async_trait]
impl FormPage for JsExecutor {
    async fn open(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        Ok(())
    }

    async fn probe_controls(&self) -> Result<Vec<ControlProbe>> {
        let controls: Vec<ControlProbe> = self.eval_as(dom_scripts::probe_controls()).await?;
        debug!("页面共 {} 个输入控件", controls.len());
        Ok(controls)
    }

    async fn locate(
        &self,
        anchor: &str,
        token: Option<&str>,
        strategy: &LocatorStrategy,
    ) -> Result<Option<String>> {
        self.eval_as(dom_scripts::locate(anchor, token, strategy)).await
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.eval_as(dom_scripts::click(selector)).await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        self.eval_as(dom_scripts::fill(selector, value)).await
    }

    async fn read_value(&self, selector: &str) -> Result<Option<String>> {
        self.eval_as(dom_scripts::read_value(selector)).await
    }

    async fn select_native(&self, selector: &str, option_text: &str) -> Result<bool> {
        self.eval_as(dom_scripts::select_native(selector, option_text))
            .await
    }

    async fn option_texts(&self, menu: &str, option_selector: &str) -> Result<Vec<String>> {
        self.eval_as(dom_scripts::option_texts(menu, option_selector))
            .await
    }

    async fn click_option(&self, menu: &str, option_selector: &str, index: usize) -> Result<bool> {
        self.eval_as(dom_scripts::click_option(menu, option_selector, index))
            .await
    }

    async fn notify_change(&self, selector: &str) -> Result<()> {
        self.eval(dom_scripts::notify_change(selector)).await?;
        Ok(())
    }

    async fn read_committed(&self, selector: &str) -> Result<Option<String>> {
        self.eval_as(dom_scripts::read_committed(selector)).await
    }

    async fn dismiss(&self) -> Result<()> {
        self.eval(dom_scripts::dismiss()).await?;
        Ok(())
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> Result<bool> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) => {
                debug!("未找到上传控件 {}: {}", selector, e);
                return Ok(false);
            }
        };
        let absolute = std::fs::canonicalize(path)
            .with_context(|| format!("文件不存在: {}", path.display()))?;
        let params = SetFileInputFilesParams::builder()
            .files(vec![absolute.to_string_lossy().to_string()])
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(|e| anyhow::anyhow!("构建上传参数失败: {}", e))?;
        self.page.execute(params).await?;
        self.notify_change(selector).await?;
        Ok(true)
    }

    async fn click_button_with_text(&self, candidates: &[&str]) -> Result<bool> {
        self.eval_as(dom_scripts::click_button_with_text(candidates))
            .await
    }

    async fn body_text(&self) -> Result<String> {
        self.eval_as(dom_scripts::body_text()).await
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .with_context(|| format!("截图失败: {}", path.display()))?;
        Ok(())
    }
}
