//! 表单填写流程 - 流程层
//!
//! 一次按顺序的遍历：工作队列由首次扫描填充，每提交一个字段就重新扫描，
//! 新出现的字段（例如选了 "Other" 之后的 "please specify"）追加到队尾。

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::FormError;
use crate::infrastructure::FormPage;
use crate::models::{AnswerRecord, ApplicationSession, FieldDescriptor, FieldKind, SessionState};
use crate::services::{AnswerResolver, DropdownController, FieldScanner};
use crate::utils::truncate_text;
use crate::workflow::cancel::CancelFlag;

pub struct FillExecutor {
    scanner: FieldScanner,
    resolver: Arc<AnswerResolver>,
    dropdown: DropdownController,
    cancel: CancelFlag,
}

impl FillExecutor {
    pub fn new(resolver: Arc<AnswerResolver>, dropdown: DropdownController, cancel: CancelFlag) -> Self {
        Self {
            scanner: FieldScanner::new(),
            resolver,
            dropdown,
            cancel,
        }
    }

    /// 填写整张表单
    ///
    /// 结束时会话处于 `awaiting-review`；有必填字段没答案时处于 `failed` 且标记待审核。
    /// 取消会以 [`FormError::Cancelled`] 返回。
    pub async fn run(&self, page: &dyn FormPage, session: &mut ApplicationSession, tag: usize) -> Result<()> {
        let mut queue = VecDeque::new();
        for field in self.scanner.scan(page).await? {
            let id = field.id.clone();
            if session.push_field(field) {
                queue.push_back(id);
            }
        }
        session.advance(SessionState::Filling)?;
        info!("[会话 {}] 🔍 扫描到 {} 个待填写字段", tag, queue.len());

        self.drain(page, session, queue, tag).await?;

        let missing: Vec<String> = session
            .unresolved_required()
            .iter()
            .map(|f| f.question_text.clone())
            .collect();
        if missing.is_empty() {
            session.advance(SessionState::AwaitingReview)?;
            info!("[会话 {}] ✓ 表单填写完成，等待审核", tag);
        } else {
            session.fail(true);
            warn!(
                "[会话 {}] ⚠️ {} 个必填字段无法回答: {}",
                tag,
                missing.len(),
                missing.join(" | ")
            );
        }
        Ok(())
    }

    /// 审核修改后新出现的字段（例如改选 "Other"）：扫描、登记并填写，返回新字段数
    pub async fn fill_revealed(
        &self,
        page: &dyn FormPage,
        session: &mut ApplicationSession,
        tag: usize,
    ) -> Result<usize> {
        let queue: VecDeque<String> = self.rescan(page, session, tag).await.into();
        let added = queue.len();
        self.drain(page, session, queue, tag).await?;
        Ok(added)
    }

    async fn drain(
        &self,
        page: &dyn FormPage,
        session: &mut ApplicationSession,
        mut queue: VecDeque<String>,
        tag: usize,
    ) -> Result<()> {
        while let Some(id) = queue.pop_front() {
            if let Err(e) = self.cancel.check() {
                warn!("[会话 {}] ⏹️ 已取消，停止填写", tag);
                session.fail(false);
                return Err(e.into());
            }
            let Some(field) = session.field(&id).cloned() else {
                continue;
            };

            self.fill_field(page, session, &field, tag).await?;
            queue.extend(self.rescan(page, session, tag).await);
        }
        Ok(())
    }

    /// 重新扫描，返回新登记字段的 id
    async fn rescan(&self, page: &dyn FormPage, session: &mut ApplicationSession, tag: usize) -> Vec<String> {
        let fields = match self.scanner.scan(page).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!("[会话 {}] 重新扫描失败: {}", tag, e);
                return Vec::new();
            }
        };
        let mut added = Vec::new();
        for field in fields {
            let id = field.id.clone();
            let question = field.question_text.clone();
            if session.push_field(field) {
                info!("[会话 {}] ➕ 新出现字段: {}", tag, truncate_text(&question, 60));
                added.push(id);
            }
        }
        added
    }

    async fn fill_field(
        &self,
        page: &dyn FormPage,
        session: &mut ApplicationSession,
        field: &FieldDescriptor,
        tag: usize,
    ) -> Result<()> {
        match field.kind {
            FieldKind::Unknown => {
                session.record_answer(AnswerRecord::unresolved(&field.id))?;
                session.record_issue(
                    &field.id,
                    FormError::ClassificationFailure {
                        locator: field.locator.clone().unwrap_or_else(|| field.id.clone()),
                        reason: "无法识别控件类型或缺少稳定定位符".to_string(),
                    },
                );
                log_skip(tag, field, "无法识别的控件");
                return Ok(());
            }
            FieldKind::File => {
                session.record_answer(AnswerRecord::unresolved(&field.id))?;
                log_skip(tag, field, "文件字段需人工处理");
                return Ok(());
            }
            _ => {}
        }

        let opened = if field.kind == FieldKind::PseudoSelect {
            match self.dropdown.open_menu(page, field).await {
                Ok(menu) => Some(menu),
                Err(e) => {
                    session.record_answer(AnswerRecord::unresolved(&field.id))?;
                    session.record_issue(&field.id, e);
                    log_skip(tag, field, "菜单无法展开");
                    return Ok(());
                }
            }
        } else {
            None
        };

        let live_options = opened.as_ref().map(|menu| menu.options.as_slice());
        let mut record = self.resolver.resolve(field, live_options).await;

        let Some(value) = record.resolved_value.clone() else {
            if opened.is_some() {
                self.dropdown.dismiss(page, field).await;
            }
            log_skip(tag, field, "没有可用答案");
            session.record_answer(record)?;
            return Ok(());
        };

        match self.dropdown.commit(page, field, &value, opened).await {
            Ok(commit) => {
                record.verified = commit.verified();
                record.committed_value = Some(commit.committed_value.clone());
                info!(
                    question = %truncate_text(&field.question_text, 60),
                    tier = %record.source_tier,
                    value = %truncate_text(&commit.committed_value, 60),
                    "[会话 {}] ✓ 已填写",
                    tag
                );
                if let Some(mismatch) = commit.mismatch(&field.id) {
                    session.record_issue(&field.id, mismatch);
                }
            }
            Err(e) => {
                record.mark_uncommitted();
                session.record_issue(&field.id, e);
                log_skip(tag, field, "写入失败");
            }
        }
        session.record_answer(record)?;
        Ok(())
    }
}

fn log_skip(tag: usize, field: &FieldDescriptor, reason: &str) {
    info!(
        question = %truncate_text(&field.question_text, 60),
        tier = "none",
        reason,
        "[会话 {}] ⏭️ 跳过",
        tag
    );
}
