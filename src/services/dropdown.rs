//! 下拉框与文本提交 - 业务能力层
//!
//! 把已解析的值真正写进控件：文本直接赋值，原生 select 按选项文本选择，
//! 伪下拉框走 "找触发器 → 点开 → 找菜单 → 选项匹配 → 点选 → 回读" 的流程。

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::SettleTimings;
use crate::error::FormError;
use crate::infrastructure::FormPage;
use crate::models::{FieldDescriptor, FieldKind};
use crate::services::locator::{self, MENU_STRATEGIES, OPTION_SELECTORS, TRIGGER_STRATEGIES};
use crate::services::option_match::{self, MatchVia, OptionPick};

/// 已展开的菜单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMenu {
    pub menu: String,
    pub option_selector: &'static str,
    pub options: Vec<String>,
    /// 已经用掉了唯一一次重试
    pub retried: bool,
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// 实际写进控件的文本
    pub committed_value: String,
    pub readback: Option<String>,
    pub via: MatchVia,
}

impl Commit {
    pub fn verified(&self) -> bool {
        readback_matches(self.readback.as_deref(), &self.committed_value)
    }

    pub fn mismatch(&self, field_id: &str) -> Option<FormError> {
        (!self.verified()).then(|| FormError::VerificationMismatch {
            field_id: field_id.to_string(),
            expected: self.committed_value.clone(),
            actual: self.readback.clone(),
        })
    }
}

fn readback_matches(readback: Option<&str>, expected: &str) -> bool {
    let Some(actual) = readback else {
        return false;
    };
    let actual = option_match::normalize(actual);
    let expected = option_match::normalize(expected);
    !expected.is_empty() && (actual == expected || actual.contains(&expected))
}

/// 下拉框控制器
#[derive(Debug, Clone, Copy)]
pub struct DropdownController {
    settle: SettleTimings,
}

impl DropdownController {
    pub fn new(settle: SettleTimings) -> Self {
        Self { settle }
    }

    fn interaction(field: &FieldDescriptor, reason: impl Into<String>) -> FormError {
        FormError::InteractionFailure {
            field_id: field.id.clone(),
            reason: reason.into(),
        }
    }

    fn anchor(field: &FieldDescriptor) -> Result<&str, FormError> {
        field
            .locator
            .as_deref()
            .ok_or_else(|| Self::interaction(field, "字段没有定位符"))
    }

    /// 点开伪下拉框并读出选项，失败时关掉菜单再试一次
    pub async fn open_menu(
        &self,
        page: &dyn FormPage,
        field: &FieldDescriptor,
    ) -> Result<OpenMenu, FormError> {
        match self.try_open_menu(page, field).await {
            Ok(menu) => Ok(menu),
            Err(first) => {
                warn!("字段 {} 菜单展开失败，重试: {}", field.id, first);
                self.dismiss(page, field).await;
                let mut menu = self.try_open_menu(page, field).await?;
                menu.retried = true;
                Ok(menu)
            }
        }
    }

    async fn try_open_menu(
        &self,
        page: &dyn FormPage,
        field: &FieldDescriptor,
    ) -> Result<OpenMenu, FormError> {
        let anchor = Self::anchor(field)?;
        let token = field.scope_token.as_deref();
        let io = |e: anyhow::Error| Self::interaction(field, e.to_string());

        let (trigger, trigger_strategy) =
            locator::first_match(page, anchor, token, TRIGGER_STRATEGIES)
                .await
                .map_err(io)?
                .ok_or_else(|| Self::interaction(field, "找不到触发器"))?;
        debug!("字段 {} 触发器: {} ({})", field.id, trigger, trigger_strategy);

        if !page.click(&trigger).await.map_err(io)? {
            return Err(Self::interaction(field, "触发器点击失败"));
        }
        sleep(self.settle.menu).await;

        let (menu, menu_strategy) = locator::first_match(page, anchor, token, MENU_STRATEGIES)
            .await
            .map_err(io)?
            .ok_or_else(|| Self::interaction(field, "找不到菜单"))?;
        debug!("字段 {} 菜单: {} ({})", field.id, menu, menu_strategy);

        for &option_selector in OPTION_SELECTORS {
            let options = page.option_texts(&menu, option_selector).await.map_err(io)?;
            if !options.is_empty() {
                return Ok(OpenMenu {
                    menu,
                    option_selector,
                    options,
                    retried: false,
                });
            }
        }
        Err(Self::interaction(field, "菜单中没有可见选项"))
    }

    /// 关闭没有用上的菜单
    pub async fn dismiss(&self, page: &dyn FormPage, field: &FieldDescriptor) {
        if let Err(e) = page.dismiss().await {
            debug!("关闭字段 {} 的菜单失败: {}", field.id, e);
        }
        sleep(self.settle.click).await;
    }

    /// 把值写进控件
    ///
    /// 伪下拉框可以传入已经展开的菜单；整个过程最多重试一次，
    /// 展开菜单时已经重试过的不再重试。
    pub async fn commit(
        &self,
        page: &dyn FormPage,
        field: &FieldDescriptor,
        value: &str,
        opened: Option<OpenMenu>,
    ) -> Result<Commit, FormError> {
        match field.kind {
            FieldKind::Text | FieldKind::Textarea => self.commit_text(page, field, value).await,
            FieldKind::Select => self.commit_native(page, field, value).await,
            FieldKind::PseudoSelect => {
                let retried = opened.as_ref().is_some_and(|menu| menu.retried);
                match self.commit_pseudo(page, field, value, opened).await {
                    Ok(commit) => Ok(commit),
                    Err(first) if retried => Err(first),
                    Err(first) => {
                        warn!("字段 {} 第一次选择失败，重试: {}", field.id, first);
                        self.dismiss(page, field).await;
                        self.commit_pseudo(page, field, value, None).await
                    }
                }
            }
            FieldKind::File | FieldKind::Unknown => {
                Err(Self::interaction(field, format!("{} 字段不支持自动填写", field.kind)))
            }
        }
    }

    async fn commit_text(
        &self,
        page: &dyn FormPage,
        field: &FieldDescriptor,
        value: &str,
    ) -> Result<Commit, FormError> {
        let anchor = Self::anchor(field)?;
        let io = |e: anyhow::Error| Self::interaction(field, e.to_string());
        if !page.fill(anchor, value).await.map_err(io)? {
            return Err(Self::interaction(field, "输入框不可用"));
        }
        let readback = page.read_value(anchor).await.map_err(io)?;
        Ok(Commit {
            committed_value: value.to_string(),
            readback,
            via: MatchVia::Exact,
        })
    }

    async fn commit_native(
        &self,
        page: &dyn FormPage,
        field: &FieldDescriptor,
        value: &str,
    ) -> Result<Commit, FormError> {
        let anchor = Self::anchor(field)?;
        let io = |e: anyhow::Error| Self::interaction(field, e.to_string());
        let OptionPick { text, via, .. } = option_match::pick(&field.options, value)
            .ok_or_else(|| Self::interaction(field, format!("选项中没有 '{}'", value)))?;

        let mut selected = page.select_native(anchor, &text).await.map_err(io)?;
        if !selected {
            sleep(self.settle.click).await;
            selected = page.select_native(anchor, &text).await.map_err(io)?;
        }
        if !selected {
            return Err(Self::interaction(field, format!("无法选择 '{}'", text)));
        }
        sleep(self.settle.click).await;
        let readback = page.read_value(anchor).await.map_err(io)?;
        Ok(Commit {
            committed_value: text,
            readback,
            via,
        })
    }

    async fn commit_pseudo(
        &self,
        page: &dyn FormPage,
        field: &FieldDescriptor,
        value: &str,
        opened: Option<OpenMenu>,
    ) -> Result<Commit, FormError> {
        let anchor = Self::anchor(field)?;
        let io = |e: anyhow::Error| Self::interaction(field, e.to_string());
        let menu = match opened {
            Some(menu) => menu,
            None => self.try_open_menu(page, field).await?,
        };

        // 每个选项选择器各读一遍，按 精确 → 模糊 → Other 逐级在所有选择器上找
        let mut listings: Vec<(&'static str, Vec<String>)> =
            vec![(menu.option_selector, menu.options.clone())];
        for &option_selector in OPTION_SELECTORS {
            if option_selector == menu.option_selector {
                continue;
            }
            let options = page.option_texts(&menu.menu, option_selector).await.map_err(io)?;
            if !options.is_empty() {
                listings.push((option_selector, options));
            }
        }

        let phases: [fn(&[String], &str) -> Option<usize>; 3] = [
            option_match::exact_index,
            option_match::fuzzy_index,
            |options, _| option_match::other_index(options),
        ];
        let vias = [MatchVia::Exact, MatchVia::Fuzzy, MatchVia::Other];

        let chosen = phases.iter().zip(vias).find_map(|(phase, via)| {
            listings.iter().find_map(|(selector, options)| {
                phase(options, value).map(|i| (*selector, i, options[i].clone(), via))
            })
        });
        let Some((option_selector, index, text, via)) = chosen else {
            return Err(Self::interaction(field, format!("菜单中没有与 '{}' 匹配的选项", value)));
        };

        if !page
            .click_option(&menu.menu, option_selector, index)
            .await
            .map_err(io)?
        {
            return Err(Self::interaction(field, format!("选项 '{}' 点击失败", text)));
        }
        page.notify_change(anchor).await.map_err(io)?;
        sleep(self.settle.click).await;

        let readback = page.read_committed(anchor).await.map_err(io)?;
        Ok(Commit {
            committed_value: text,
            readback,
            via,
        })
    }
}
