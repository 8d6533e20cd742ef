//! 单个职位的申请流程 - 流程层
//!
//! 流程顺序：
//! 1. 额度 / 重复检查（不碰页面）
//! 2. 打开职位页面，必要时点击 Apply
//! 3. 身份字段 → 表单填写 → 人工审核 → 提交
//! 4. 结果写入申请记录

use anyhow::Result;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{Config, SettleTimings};
use crate::error::FormError;
use crate::infrastructure::FormPage;
use crate::models::{ApplicantProfile, ApplicationSession, JobRef, SessionState};
use crate::services::locator::APPLY_TEXTS;
use crate::services::{
    AnswerResolver, DropdownController, IdentityFiller, Outcome, OutcomeRecord, OutcomeStore,
};
use crate::workflow::cancel::CancelFlag;
use crate::workflow::fill_executor::FillExecutor;
use crate::workflow::review_gate::{ReviewGate, ReviewSurface};
use crate::workflow::submission::{PageVerdict, SubmissionController, SubmissionReport};

/// 申请流程
///
/// - 不持有页面，由调用方传入
/// - 每次 `run` 创建并丢弃一个会话
pub struct ApplicationFlow {
    store: Arc<OutcomeStore>,
    identity: IdentityFiller,
    filler: FillExecutor,
    review: Option<ReviewGate>,
    submission: SubmissionController,
    cancel: CancelFlag,
    settle: SettleTimings,
    daily_cap: usize,
    max_retries: usize,
}

impl ApplicationFlow {
    pub fn new(
        config: &Config,
        resolver: Arc<AnswerResolver>,
        profile: Arc<ApplicantProfile>,
        store: Arc<OutcomeStore>,
        review: Option<Arc<dyn ReviewSurface>>,
        cancel: CancelFlag,
    ) -> Self {
        let settle = config.settle();
        let dropdown = DropdownController::new(settle);
        Self {
            store,
            identity: IdentityFiller::new(profile, config.resume_path.clone()),
            filler: FillExecutor::new(resolver, dropdown, cancel.clone()),
            review: review.map(|surface| ReviewGate::new(surface, dropdown, config.review_max_rounds)),
            submission: SubmissionController::new(settle, config.screenshot_dir.clone()),
            cancel,
            settle,
            daily_cap: config.max_applications_per_day,
            max_retries: config.max_session_retries,
        }
    }

    /// 申请一个职位
    ///
    /// 返回写入申请记录的那一行；致命错误（额度用完、必填缺失、被拒、跳过、取消）
    /// 在记录写入后以 [`FormError`] 返回。
    pub async fn run(&self, page: &dyn FormPage, job: JobRef, tag: usize) -> Result<OutcomeRecord> {
        let used = self.store.submitted_today().await?;
        if used >= self.daily_cap {
            warn!("[会话 {}] ⛔ 今日额度已用完 ({}/{})", tag, used, self.daily_cap);
            return Err(FormError::BudgetExhausted {
                used,
                cap: self.daily_cap,
            }
            .into());
        }

        let mut session = ApplicationSession::new(job, self.max_retries);
        if self.store.has_applied(session.job()).await? {
            info!("[会话 {}] ⏭️ {} 已投递过，跳过", tag, session.job());
            return Ok(OutcomeRecord::from_session(
                &session,
                Outcome::Skipped,
                Some("已投递过".to_string()),
                None,
            ));
        }

        info!("[会话 {}] 🚀 开始申请 {}", tag, session.job());
        let result = self.drive(page, &mut session, tag).await;

        let (record, failure) = match result {
            Ok(report) => {
                let evidence = Some(report.evidence.describe());
                let (outcome, reason) = match &report.verdict {
                    PageVerdict::Success(_) => (Outcome::Submitted, None),
                    PageVerdict::Rejected(indicator) => (Outcome::Rejected, Some(indicator.clone())),
                    PageVerdict::Unconfirmed => {
                        (Outcome::Unconfirmed, Some("页面没有成功或错误提示".to_string()))
                    }
                };
                let failure = report.rejection().map(anyhow::Error::from);
                (
                    OutcomeRecord::from_session(&session, outcome, reason, evidence),
                    failure,
                )
            }
            Err(e) => {
                let (outcome, evidence) = match e.downcast_ref::<FormError>() {
                    Some(FormError::ResolutionFailure { .. }) => (Outcome::Incomplete, None),
                    Some(FormError::SkippedByReviewer) => (Outcome::Skipped, None),
                    Some(FormError::Cancelled) => (Outcome::Cancelled, None),
                    Some(FormError::SubmissionRejected { evidence, .. }) => {
                        (Outcome::Rejected, evidence.clone())
                    }
                    _ => (Outcome::Error, None),
                };
                if outcome == Outcome::Error {
                    error!("[会话 {}] ❌ 处理过程中发生错误: {:#}", tag, e);
                }
                (
                    OutcomeRecord::from_session(&session, outcome, Some(e.to_string()), evidence),
                    Some(e),
                )
            }
        };

        self.store.append(&record).await?;
        match failure {
            Some(e) => Err(e),
            None => Ok(record),
        }
    }

    async fn drive(
        &self,
        page: &dyn FormPage,
        session: &mut ApplicationSession,
        tag: usize,
    ) -> Result<SubmissionReport> {
        self.cancel.check()?;
        page.open(&session.job().url).await?;
        sleep(self.settle.click).await;

        let controls = page.probe_controls().await?;
        if !controls.iter().any(|c| c.visible) {
            if page.click_button_with_text(APPLY_TEXTS).await? {
                info!("[会话 {}] 👉 已点击 Apply 按钮", tag);
                sleep(self.settle.submit).await;
            } else {
                warn!("[会话 {}] 页面上没有表单，也没有 Apply 按钮", tag);
            }
        }

        let filled = self.identity.fill(page).await?;
        info!("[会话 {}] 👤 已填写 {} 个身份字段", tag, filled);

        self.filler.run(page, session, tag).await?;

        if session.state() == SessionState::Failed {
            let can_review = session.pending_review() && self.review.is_some() && session.retries_left() > 0;
            if !can_review {
                return Err(match session.ensure_complete() {
                    Err(e) => e.into(),
                    Ok(()) => anyhow::anyhow!("会话在填写阶段失败"),
                });
            }
            session.retry(SessionState::AwaitingReview)?;
            info!("[会话 {}] 🔁 存在未回答的必填字段，交给人工补全", tag);
        }

        if let Some(gate) = &self.review {
            gate.run(page, session, &self.filler, tag).await?;
        }

        self.cancel.check()?;
        self.submission.submit(page, session, tag).await
    }
}
