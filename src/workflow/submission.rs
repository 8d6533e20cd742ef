//! 提交控制 - 流程层
//!
//! 先检查完整性，再点提交，最后根据页面文字判断结果。不做自动重复提交。

use anyhow::Result;
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::SettleTimings;
use crate::error::FormError;
use crate::infrastructure::FormPage;
use crate::models::{ApplicationSession, SessionState};
use crate::services::locator::{SUBMIT_SELECTORS, SUBMIT_TEXTS};
use crate::utils::truncate_text;

const SUCCESS_INDICATORS: &[&str] = &[
    "thank you",
    "application submitted",
    "received your application",
    "we'll be in touch",
    "application complete",
];

const VALIDATION_INDICATORS: &[&str] = &[
    "is required",
    "please fix",
    "invalid",
    "there was an error",
    "can't be blank",
];

const EXCERPT_CHARS: usize = 500;

/// 提交后页面的判断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageVerdict {
    Success(String),
    Rejected(String),
    Unconfirmed,
}

pub fn classify_page(text: &str) -> PageVerdict {
    let lower = text.to_lowercase();
    if let Some(hit) = SUCCESS_INDICATORS.iter().find(|i| lower.contains(*i)) {
        return PageVerdict::Success(hit.to_string());
    }
    if let Some(hit) = VALIDATION_INDICATORS.iter().find(|i| lower.contains(*i)) {
        return PageVerdict::Rejected(hit.to_string());
    }
    PageVerdict::Unconfirmed
}

/// 截图和页面文字摘录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    pub screenshot: Option<PathBuf>,
    pub excerpt: String,
}

impl Evidence {
    pub fn describe(&self) -> String {
        match &self.screenshot {
            Some(path) => format!("{} | {}", path.display(), self.excerpt),
            None => self.excerpt.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub verdict: PageVerdict,
    pub evidence: Evidence,
}

impl SubmissionReport {
    /// 页面报校验错误时对应的错误
    pub fn rejection(&self) -> Option<FormError> {
        match &self.verdict {
            PageVerdict::Rejected(indicator) => Some(FormError::SubmissionRejected {
                reason: indicator.clone(),
                evidence: Some(self.evidence.describe()),
            }),
            _ => None,
        }
    }
}

pub struct SubmissionController {
    settle: SettleTimings,
    screenshot_dir: PathBuf,
}

impl SubmissionController {
    pub fn new(settle: SettleTimings, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            settle,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// 提交表单
    ///
    /// 必填字段不完整时返回 [`FormError::ResolutionFailure`]，且不会点击提交按钮。
    pub async fn submit(
        &self,
        page: &dyn FormPage,
        session: &mut ApplicationSession,
        tag: usize,
    ) -> Result<SubmissionReport> {
        if let Err(e) = session.ensure_complete() {
            error!("[会话 {}] ❌ {}", tag, e);
            session.fail(true);
            return Err(e.into());
        }
        session.advance(SessionState::Submitting)?;
        info!("[会话 {}] 📤 正在提交申请...", tag);

        if !self.click_submit(page).await? {
            let evidence = self.capture(page, session, "").await;
            session.fail(false);
            return Err(FormError::SubmissionRejected {
                reason: "未找到提交按钮".to_string(),
                evidence: Some(evidence.describe()),
            }
            .into());
        }
        sleep(self.settle.submit).await;

        let text = match page.body_text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("[会话 {}] 读取页面文字失败: {}", tag, e);
                String::new()
            }
        };
        let evidence = self.capture(page, session, &text).await;
        let verdict = classify_page(&text);

        match &verdict {
            PageVerdict::Success(indicator) => {
                session.advance(SessionState::Submitted)?;
                info!("[会话 {}] ✅ 提交成功 ('{}')", tag, indicator);
            }
            PageVerdict::Rejected(indicator) => {
                session.fail(false);
                error!("[会话 {}] ❌ 提交被拒绝 ('{}')", tag, indicator);
            }
            PageVerdict::Unconfirmed => {
                session.fail(false);
                warn!("[会话 {}] ⚠️ 无法确认提交结果，请查看截图", tag);
            }
        }

        Ok(SubmissionReport { verdict, evidence })
    }

    async fn click_submit(&self, page: &dyn FormPage) -> Result<bool> {
        for selector in SUBMIT_SELECTORS {
            if page.click(selector).await? {
                return Ok(true);
            }
        }
        page.click_button_with_text(SUBMIT_TEXTS).await
    }

    async fn capture(&self, page: &dyn FormPage, session: &ApplicationSession, text: &str) -> Evidence {
        let file_name = format!(
            "{}-{}.png",
            sanitize(&session.job().id),
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        let path = self.screenshot_dir.join(file_name);
        let screenshot = match page.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("截图失败: {}", e);
                None
            }
        };
        Evidence {
            screenshot,
            excerpt: truncate_text(text.trim(), EXCERPT_CHARS),
        }
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
