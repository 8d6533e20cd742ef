//! 申请会话
//!
//! 状态只允许向前推进；任何状态都可以进入 `Failed`，
//! 从 `Failed` 出发只能走有次数上限的重试。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

use crate::error::FormError;
use crate::models::answer::AnswerRecord;
use crate::models::field::FieldDescriptor;
use crate::models::job::JobRef;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    Scanning,
    Filling,
    AwaitingReview,
    Submitting,
    Submitted,
    Failed,
}

impl SessionState {
    fn rank(self) -> u8 {
        match self {
            SessionState::Scanning => 0,
            SessionState::Filling => 1,
            SessionState::AwaitingReview => 2,
            SessionState::Submitting => 3,
            SessionState::Submitted => 4,
            SessionState::Failed => 5,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Scanning => "scanning",
            SessionState::Filling => "filling",
            SessionState::AwaitingReview => "awaiting-review",
            SessionState::Submitting => "submitting",
            SessionState::Submitted => "submitted",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 字段级问题（不中断会话）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field_id: String,
    pub error: FormError,
}

/// 单个职位的申请会话
#[derive(Debug, Clone)]
pub struct ApplicationSession {
    job: JobRef,
    fields: Vec<FieldDescriptor>,
    answers: Vec<AnswerRecord>,
    state: SessionState,
    pending_review: bool,
    degraded: bool,
    issues: Vec<FieldIssue>,
    retries: usize,
    max_retries: usize,
    started_at: DateTime<Utc>,
}

impl ApplicationSession {
    pub fn new(job: JobRef, max_retries: usize) -> Self {
        Self {
            job,
            fields: Vec::new(),
            answers: Vec::new(),
            state: SessionState::Scanning,
            pending_review: false,
            degraded: false,
            issues: Vec::new(),
            retries: 0,
            max_retries,
            started_at: Utc::now(),
        }
    }

    pub fn job(&self) -> &JobRef {
        &self.job
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn pending_review(&self) -> bool {
        self.pending_review
    }

    pub fn degraded(&self) -> bool {
        self.degraded
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// 向前推进状态
    pub fn advance(&mut self, to: SessionState) -> Result<(), FormError> {
        let allowed = match (self.state, to) {
            (SessionState::Submitted, _) => false,
            (SessionState::Failed, _) => false,
            (_, SessionState::Failed) => true,
            (from, to) => to.rank() > from.rank(),
        };
        if !allowed {
            return Err(self.invalid(to));
        }
        self.state = to;
        Ok(())
    }

    /// 进入失败状态；`pending_review` 表示需要人工补全
    pub fn fail(&mut self, pending_review: bool) {
        if self.state != SessionState::Submitted {
            self.state = SessionState::Failed;
            self.pending_review |= pending_review;
        }
    }

    /// 从失败状态重试，次数有上限
    pub fn retry(&mut self, to: SessionState) -> Result<(), FormError> {
        let target_ok = matches!(
            to,
            SessionState::Scanning | SessionState::Filling | SessionState::AwaitingReview
        );
        if self.state != SessionState::Failed || !target_ok || self.retries >= self.max_retries {
            return Err(self.invalid(to));
        }
        self.retries += 1;
        self.state = to;
        Ok(())
    }

    pub fn retries_left(&self) -> usize {
        self.max_retries.saturating_sub(self.retries)
    }

    fn invalid(&self, to: SessionState) -> FormError {
        FormError::InvalidTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }

    pub fn has_field(&self, id: &str) -> bool {
        self.fields.iter().any(|f| f.id == id)
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// 登记新字段，重复 id 忽略
    pub fn push_field(&mut self, field: FieldDescriptor) -> bool {
        if self.has_field(&field.id) {
            return false;
        }
        self.fields.push(field);
        true
    }

    pub fn answer(&self, field_id: &str) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.field_id == field_id)
    }

    /// 写入或覆盖答案，答案必须指向已登记的字段
    pub fn record_answer(&mut self, record: AnswerRecord) -> Result<(), FormError> {
        if !self.has_field(&record.field_id) {
            return Err(FormError::ClassificationFailure {
                locator: record.field_id.clone(),
                reason: "答案指向未登记的字段".to_string(),
            });
        }
        match self.answers.iter_mut().find(|a| a.field_id == record.field_id) {
            Some(existing) => *existing = record,
            None => self.answers.push(record),
        }
        Ok(())
    }

    pub fn record_issue(&mut self, field_id: impl Into<String>, error: FormError) {
        let field_id = field_id.into();
        if error.is_fatal() {
            error!("[{}] {}", field_id, error);
        } else {
            warn!("[{}] {}", field_id, error);
        }
        if matches!(error, FormError::InteractionFailure { .. }) {
            self.degraded = true;
        }
        if matches!(
            error,
            FormError::VerificationMismatch { .. } | FormError::ClassificationFailure { .. }
        ) {
            self.pending_review = true;
        }
        self.issues.push(FieldIssue { field_id, error });
    }

    /// 没有有效答案的必填字段
    pub fn unresolved_required(&self) -> Vec<&FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .filter(|f| !self.answer(&f.id).map(AnswerRecord::is_resolved).unwrap_or(false))
            .collect()
    }

    /// 提交前的完整性检查
    pub fn ensure_complete(&self) -> Result<(), FormError> {
        let missing = self.unresolved_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::ResolutionFailure {
                questions: missing.iter().map(|f| f.question_text.clone()).collect(),
            })
        }
    }
}
