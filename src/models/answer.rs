use serde::{Deserialize, Serialize};
use std::fmt;

/// 答案来源层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Predetermined,
    Contextual,
    Generative,
    Manual,
    None,
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceTier::Predetermined => "predetermined",
            SourceTier::Contextual => "contextual",
            SourceTier::Generative => "generative",
            SourceTier::Manual => "manual",
            SourceTier::None => "none",
        };
        f.write_str(name)
    }
}

/// 单个字段的答案记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub field_id: String,
    pub resolved_value: Option<String>,
    pub source_tier: SourceTier,
    /// 回读值与提交值一致
    pub verified: bool,
    /// 实际写进表单的文本（例如解析出 "Corporate Website"，最终选中 "Other"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_value: Option<String>,
}

impl AnswerRecord {
    pub fn resolved(field_id: impl Into<String>, value: impl Into<String>, tier: SourceTier) -> Self {
        Self {
            field_id: field_id.into(),
            resolved_value: Some(value.into()),
            source_tier: tier,
            verified: false,
            committed_value: None,
        }
    }

    pub fn unresolved(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            resolved_value: None,
            source_tier: SourceTier::None,
            verified: false,
            committed_value: None,
        }
    }

    /// 空白值不算答案
    pub fn is_resolved(&self) -> bool {
        self.resolved_value
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }

    /// 值没能写进表单：字段按未解析处理
    pub fn mark_uncommitted(&mut self) {
        self.resolved_value = None;
        self.committed_value = None;
        self.verified = false;
        self.source_tier = SourceTier::None;
    }
}
