//! 表单页面能力接口
//!
//! 业务层只通过这个 trait 操作页面：生产环境由 [`JsExecutor`](super::JsExecutor)
//! 在真实浏览器里执行，测试里用内存中的假表单。

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 扫描时从页面读出的控件结构信号
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlProbe {
    /// `input` / `select` / `textarea`
    pub tag: String,
    pub input_type: String,
    pub id: String,
    pub name: String,
    pub role: String,
    pub readonly: bool,
    /// `required` 或 `aria-required="true"`
    pub required: bool,
    pub aria_controls: String,
    pub aria_owns: String,
    pub aria_haspopup: String,
    pub data_controls: String,
    pub list: String,
    /// 最近一个带下拉标记的祖先的 class，没有则为空
    pub container_class: String,
    pub label: String,
    pub aria_label: String,
    pub placeholder: String,
    /// 仅原生 select
    pub options: Vec<String>,
    pub visible: bool,
}

/// 定位策略：提取候选元素 + 判断是否可用
///
/// 两段都是在页面里执行的 JS 表达式：`extract` 中 `el` 为锚点控件、
/// `token` 为作用域标记；`predicate` 中 `t` 为候选元素。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorStrategy {
    pub name: &'static str,
    pub extract: &'static str,
    pub predicate: &'static str,
}

/// 页面操作能力
#[async_trait]
pub trait FormPage: Send + Sync {
    /// 打开职位页面
    async fn open(&self, url: &str) -> Result<()>;

    /// 按文档顺序枚举所有输入控件
    async fn probe_controls(&self) -> Result<Vec<ControlProbe>>;

    /// 用一条策略从锚点控件出发定位相关元素，返回可直接使用的选择器
    async fn locate(
        &self,
        anchor: &str,
        token: Option<&str>,
        strategy: &LocatorStrategy,
    ) -> Result<Option<String>>;

    /// 点击元素，元素不存在时返回 false
    async fn click(&self, selector: &str) -> Result<bool>;

    /// 直接赋值（触发 input / change）
    async fn fill(&self, selector: &str, value: &str) -> Result<bool>;

    /// 读取控件当前值；原生 select 返回选中项文本
    async fn read_value(&self, selector: &str) -> Result<Option<String>>;

    /// 原生 select 按选项文本选择
    async fn select_native(&self, selector: &str, option_text: &str) -> Result<bool>;

    /// 菜单内可见选项的文本
    async fn option_texts(&self, menu: &str, option_selector: &str) -> Result<Vec<String>>;

    /// 点击菜单内第 `index` 个可见选项
    async fn click_option(&self, menu: &str, option_selector: &str, index: usize) -> Result<bool>;

    /// 显式触发 change / update 事件
    async fn notify_change(&self, selector: &str) -> Result<()>;

    /// 读取伪下拉框显示出来的已选值
    async fn read_committed(&self, selector: &str) -> Result<Option<String>>;

    /// 关闭当前打开的菜单
    async fn dismiss(&self) -> Result<()>;

    /// 文件上传
    async fn upload_file(&self, selector: &str, path: &Path) -> Result<bool>;

    /// 点击第一个文本包含任一候选词的按钮或链接
    async fn click_button_with_text(&self, candidates: &[&str]) -> Result<bool>;

    /// 页面可见文本
    async fn body_text(&self) -> Result<String>;

    /// 整页截图
    async fn screenshot(&self, path: &Path) -> Result<()>;
}
