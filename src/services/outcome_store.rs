//! 申请记录 - 业务能力层
//!
//! 只负责"追加写 JSON Lines"能力：每个会话结束写一行，
//! 同一文件也用来判断是否已经投递过、今天投了多少。

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{ApplicationSession, JobRef, SourceTier};

/// 会话最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Submitted,
    Rejected,
    Unconfirmed,
    /// 必填字段无法解析
    Incomplete,
    Skipped,
    Cancelled,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub value: Option<String>,
    pub tier: SourceTier,
    pub verified: bool,
}

/// 一行审计记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub job: JobRef,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnsweredQuestion>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn from_session(
        session: &ApplicationSession,
        outcome: Outcome,
        reason: Option<String>,
        evidence: Option<String>,
    ) -> Self {
        let answers = session
            .fields()
            .iter()
            .map(|field| {
                let answer = session.answer(&field.id);
                AnsweredQuestion {
                    question: field.question_text.clone(),
                    value: answer.and_then(|a| {
                        a.committed_value.clone().or_else(|| a.resolved_value.clone())
                    }),
                    tier: answer.map(|a| a.source_tier).unwrap_or(SourceTier::None),
                    verified: answer.map(|a| a.verified).unwrap_or(false),
                }
            })
            .collect();
        Self {
            job: session.job().clone(),
            outcome,
            reason,
            answers,
            issues: session.issues().iter().map(|i| i.error.to_string()).collect(),
            evidence,
            started_at: session.started_at(),
            finished_at: Utc::now(),
        }
    }
}

/// 申请记录存储
pub struct OutcomeStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl OutcomeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    pub async fn append(&self, record: &OutcomeRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        debug!("写入申请记录: {} -> {:?}", record.job, record.outcome);

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// 读出全部记录，损坏的行跳过
    pub async fn load_all(&self) -> Result<Vec<OutcomeRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OutcomeRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("申请记录第 {} 行无法解析，已跳过: {}", line_no + 1, e),
            }
        }
        Ok(records)
    }

    /// 是否已成功投递过（按职位 id 或 URL）
    pub async fn has_applied(&self, job: &JobRef) -> Result<bool> {
        Ok(self.load_all().await?.iter().any(|r| {
            r.outcome == Outcome::Submitted && (r.job.id == job.id || r.job.url == job.url)
        }))
    }

    /// 某一天（本地时间）成功投递的数量
    pub async fn submitted_on(&self, day: NaiveDate) -> Result<usize> {
        Ok(self
            .load_all()
            .await?
            .iter()
            .filter(|r| r.outcome == Outcome::Submitted)
            .filter(|r| r.finished_at.with_timezone(&Local).date_naive() == day)
            .count())
    }

    pub async fn submitted_today(&self) -> Result<usize> {
        self.submitted_on(Local::now().date_naive()).await
    }
}
