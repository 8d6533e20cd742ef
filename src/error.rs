use std::path::PathBuf;

use thiserror::Error;

/// 表单自动化引擎的领域错误
///
/// 非致命的错误（分类失败、交互失败、回读不一致）只记录在会话的问题列表中，
/// 致命的错误通过 `anyhow::Error` 向上返回，调用方可以用
/// `downcast_ref::<FormError>()` 取回具体类型。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// 无法确定控件类型，或者缺少稳定的定位符
    #[error("无法识别控件 ({locator}): {reason}")]
    ClassificationFailure { locator: String, reason: String },

    /// 必填字段没有任何一层给出答案
    #[error("必填字段无法解析答案: {}", questions.join(" | "))]
    ResolutionFailure { questions: Vec<String> },

    /// 触发器 / 菜单 / 选项在所有策略下都无法定位
    #[error("字段交互失败 ({field_id}): {reason}")]
    InteractionFailure { field_id: String, reason: String },

    /// 回读值与期望选择不一致
    #[error("回读校验不一致 ({field_id}): 期望 '{expected}', 实际 {actual:?}")]
    VerificationMismatch {
        field_id: String,
        expected: String,
        actual: Option<String>,
    },

    /// 生成式回答超时或出错（按无答案处理）
    #[error("生成式回答失败 ({question}): {reason}")]
    GenerativeTimeout { question: String, reason: String },

    /// 提交后页面出现校验错误
    #[error("提交被拒绝: {reason}")]
    SubmissionRejected {
        reason: String,
        evidence: Option<String>,
    },

    /// 今日投递额度已用完，不做任何页面操作
    #[error("今日投递额度已用完 ({used}/{cap})")]
    BudgetExhausted { used: usize, cap: usize },

    /// 审核人选择跳过
    #[error("审核人跳过了此申请")]
    SkippedByReviewer,

    /// 会话在字段边界处被取消
    #[error("会话已取消")]
    Cancelled,

    /// 非法的会话状态迁移
    #[error("非法状态迁移: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// 外部文件加载错误
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("文件不存在: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("读取文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("JSON解析失败 ({}): {source}", path.display())]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("个人资料缺少字段: {}", missing.join(", "))]
    IncompleteProfile { missing: Vec<String> },
}

impl FormError {
    /// 是否必须让调用方知道（不能只记日志）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FormError::ResolutionFailure { .. }
                | FormError::SubmissionRejected { .. }
                | FormError::BudgetExhausted { .. }
                | FormError::SkippedByReviewer
                | FormError::Cancelled
                | FormError::InvalidTransition { .. }
        )
    }
}
