use serde::{Deserialize, Serialize};
use std::fmt;

/// 控件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Textarea,
    /// 原生 `<select>`，选项可直接读取
    Select,
    /// 看起来像输入框，实际要点开菜单再点选项
    PseudoSelect,
    File,
    Unknown,
}

impl FieldKind {
    /// 是否为选择类控件
    pub fn is_selection(self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::PseudoSelect)
    }

    /// 是否为自由文本控件
    pub fn is_text(self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Textarea)
    }

    /// 是否参与自动解析
    pub fn is_resolvable(self) -> bool {
        self.is_text() || self.is_selection()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::PseudoSelect => "pseudo-select",
            FieldKind::File => "file",
            FieldKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// 表单字段描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// 会话内唯一
    pub id: String,
    pub question_text: String,
    pub kind: FieldKind,
    pub required: bool,
    /// 仅原生 select 在扫描时有值
    #[serde(default)]
    pub options: Vec<String>,
    /// 伪下拉框用来找到“自己的”菜单
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_token: Option<String>,
    /// 稳定的 CSS 定位符，unknown 字段可能没有
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, question_text: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            question_text: question_text.into(),
            kind,
            required: false,
            options: Vec::new(),
            scope_token: None,
            locator: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scope_token(mut self, token: impl Into<String>) -> Self {
        self.scope_token = Some(token.into());
        self
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }
}
