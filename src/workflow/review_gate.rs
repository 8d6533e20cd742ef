//! 提交前人工审核 - 流程层
//!
//! 审核人可以通过、修改或跳过。修改的值以 `manual` 层级写回并重新提交到表单，
//! 改选出新字段时补扫一遍，然后再次交给审核人；轮数有上限，超过按跳过处理。

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::FormError;
use crate::infrastructure::FormPage;
use crate::models::{AnswerRecord, ApplicationSession, SourceTier};
use crate::services::option_match::MatchVia;
use crate::services::DropdownController;
use crate::workflow::fill_executor::FillExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub field_id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Edit(Vec<FieldEdit>),
    Skip,
}

/// 审核界面
#[async_trait]
pub trait ReviewSurface: Send + Sync {
    async fn review(&self, session: &ApplicationSession) -> Result<ReviewDecision>;
}

pub struct ReviewGate {
    surface: Arc<dyn ReviewSurface>,
    dropdown: DropdownController,
    max_rounds: usize,
}

impl ReviewGate {
    pub fn new(surface: Arc<dyn ReviewSurface>, dropdown: DropdownController, max_rounds: usize) -> Self {
        Self {
            surface,
            dropdown,
            max_rounds: max_rounds.max(1),
        }
    }

    /// 通过时返回 `Ok`；跳过返回 [`FormError::SkippedByReviewer`]
    pub async fn run(
        &self,
        page: &dyn FormPage,
        session: &mut ApplicationSession,
        filler: &FillExecutor,
        tag: usize,
    ) -> Result<()> {
        for round in 1..=self.max_rounds {
            info!("[会话 {}] 👀 等待人工审核（第 {} 轮）", tag, round);
            match self.surface.review(session).await? {
                ReviewDecision::Approve => {
                    info!("[会话 {}] ✓ 审核通过", tag);
                    return Ok(());
                }
                ReviewDecision::Skip => {
                    info!("[会话 {}] ⏭️ 审核人跳过", tag);
                    session.fail(false);
                    return Err(FormError::SkippedByReviewer.into());
                }
                ReviewDecision::Edit(edits) => {
                    if self.apply_edits(page, session, edits, tag).await? {
                        let added = filler.fill_revealed(page, session, tag).await?;
                        info!("[会话 {}] 修改后新出现 {} 个字段", tag, added);
                    }
                }
            }
        }
        warn!("[会话 {}] ⚠️ 审核超过 {} 轮，按跳过处理", tag, self.max_rounds);
        session.fail(false);
        Err(FormError::SkippedByReviewer.into())
    }

    /// 返回是否有选择落到了 "Other" 上
    async fn apply_edits(
        &self,
        page: &dyn FormPage,
        session: &mut ApplicationSession,
        edits: Vec<FieldEdit>,
        tag: usize,
    ) -> Result<bool> {
        let mut landed_on_other = false;
        for edit in edits {
            let Some(field) = session.field(&edit.field_id).cloned() else {
                warn!("[会话 {}] 修改指向不存在的字段: {}", tag, edit.field_id);
                continue;
            };
            if edit.value.trim().is_empty() {
                warn!("[会话 {}] 忽略字段 {} 的空白修改", tag, field.id);
                continue;
            }
            let mut record = AnswerRecord::resolved(&field.id, &edit.value, SourceTier::Manual);

            // 文件 / 未识别字段由审核人在浏览器里手动处理，这里只登记
            if field.kind.is_resolvable() && field.locator.is_some() {
                match self.dropdown.commit(page, &field, &edit.value, None).await {
                    Ok(commit) => {
                        landed_on_other |= commit.via == MatchVia::Other;
                        record.verified = commit.verified();
                        record.committed_value = Some(commit.committed_value.clone());
                        if let Some(mismatch) = commit.mismatch(&field.id) {
                            session.record_issue(&field.id, mismatch);
                        }
                    }
                    Err(e) => {
                        record.mark_uncommitted();
                        session.record_issue(&field.id, e);
                    }
                }
            }
            info!(
                question = %field.question_text,
                tier = %record.source_tier,
                value = %edit.value,
                "[会话 {}] ✏️ 人工修改",
                tag
            );
            session.record_answer(record)?;
        }
        Ok(landed_on_other)
    }
}

/// 命令行审核界面
///
/// 命令：`a` 通过，`s` 跳过，`e 字段id=值; 字段id=值` 修改
pub struct ConsoleReview {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleReview {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    pub fn render(session: &ApplicationSession) -> String {
        let mut out = format!("\n{}\n{}\n{}\n", "=".repeat(60), session.job(), "=".repeat(60));
        for field in session.fields() {
            let answer = session.answer(&field.id);
            let value = answer
                .and_then(|a| a.committed_value.as_deref().or(a.resolved_value.as_deref()))
                .unwrap_or("<空>");
            let tier = answer.map(|a| a.source_tier).unwrap_or(SourceTier::None);
            let mark = match answer {
                Some(a) if a.verified => "✓",
                Some(a) if a.is_resolved() => "?",
                _ => "✗",
            };
            out.push_str(&format!(
                "{} [{}] {}{} = {} ({})\n",
                mark,
                field.id,
                field.question_text,
                if field.required { " *" } else { "" },
                value,
                tier
            ));
        }
        if !session.issues().is_empty() {
            out.push_str("\n问题:\n");
            for issue in session.issues() {
                out.push_str(&format!("  - {}\n", issue.error));
            }
        }
        out
    }

    pub fn parse_command(line: &str) -> Option<ReviewDecision> {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command.to_lowercase().as_str() {
            "a" | "approve" | "y" => Some(ReviewDecision::Approve),
            "s" | "skip" | "n" => Some(ReviewDecision::Skip),
            "e" | "edit" => {
                let edits: Vec<FieldEdit> = rest
                    .split(';')
                    .filter_map(|pair| {
                        let (id, value) = pair.split_once('=')?;
                        let id = id.trim();
                        (!id.is_empty()).then(|| FieldEdit {
                            field_id: id.to_string(),
                            value: value.trim().to_string(),
                        })
                    })
                    .collect();
                (!edits.is_empty()).then_some(ReviewDecision::Edit(edits))
            }
            _ => None,
        }
    }
}

impl Default for ConsoleReview {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewSurface for ConsoleReview {
    async fn review(&self, session: &ApplicationSession) -> Result<ReviewDecision> {
        println!("{}", Self::render(session));
        let mut lines = self.lines.lock().await;
        loop {
            println!("[a] 通过  [s] 跳过  [e 字段id=值; ...] 修改");
            let Some(line) = lines.next_line().await? else {
                return Ok(ReviewDecision::Skip);
            };
            if let Some(decision) = Self::parse_command(&line) {
                return Ok(decision);
            }
            println!("无法识别的命令: {}", line.trim());
        }
    }
}
