//! 字段扫描 - 业务能力层
//!
//! 只负责"识别表单里有哪些要回答的问题"，不做回答也不做填写。

use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

use crate::infrastructure::{ControlProbe, FormPage};
use crate::models::{FieldDescriptor, FieldKind};
use crate::services::identity::identity_role;

type Heuristic = fn(&ControlProbe) -> Option<FieldKind>;

/// 结构启发式，按顺序尝试，第一个给出类型的胜出
const HEURISTICS: &[(&str, Heuristic)] = &[
    ("native-select", native_select),
    ("combobox-role", combobox_role),
    ("readonly-correlated", readonly_correlated),
    ("select-container", select_container),
    ("textarea", textarea),
    ("file-input", file_input),
    ("text-input", text_input),
];

const SELECT_MARKERS: &[&str] = &["select__control", "select-shell", "dropdown"];

const TEXT_TYPES: &[&str] = &["", "text", "number", "url", "date", "search"];

fn native_select(p: &ControlProbe) -> Option<FieldKind> {
    (p.tag == "select").then_some(FieldKind::Select)
}

fn combobox_role(p: &ControlProbe) -> Option<FieldKind> {
    let popup = p.aria_haspopup.to_lowercase();
    (p.role.eq_ignore_ascii_case("combobox") || popup == "listbox" || popup == "true")
        .then_some(FieldKind::PseudoSelect)
}

fn readonly_correlated(p: &ControlProbe) -> Option<FieldKind> {
    (p.readonly && correlation_token(p).is_some()).then_some(FieldKind::PseudoSelect)
}

fn select_container(p: &ControlProbe) -> Option<FieldKind> {
    let class = p.container_class.to_lowercase();
    (p.tag == "input" && SELECT_MARKERS.iter().any(|m| class.contains(m)))
        .then_some(FieldKind::PseudoSelect)
}

fn textarea(p: &ControlProbe) -> Option<FieldKind> {
    (p.tag == "textarea").then_some(FieldKind::Textarea)
}

fn file_input(p: &ControlProbe) -> Option<FieldKind> {
    (p.tag == "input" && p.input_type == "file").then_some(FieldKind::File)
}

fn text_input(p: &ControlProbe) -> Option<FieldKind> {
    (p.tag == "input" && TEXT_TYPES.contains(&p.input_type.as_str())).then_some(FieldKind::Text)
}

fn correlation_token(p: &ControlProbe) -> Option<&str> {
    [&p.aria_controls, &p.aria_owns, &p.data_controls, &p.list]
        .into_iter()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// 返回类型和命中的启发式名称
pub fn classify(probe: &ControlProbe) -> Option<(FieldKind, &'static str)> {
    HEURISTICS
        .iter()
        .find_map(|(name, heuristic)| heuristic(probe).map(|kind| (kind, *name)))
}

/// 稳定的 CSS 定位符：优先 id，其次 name
pub fn stable_locator(probe: &ControlProbe) -> Option<String> {
    if !probe.id.trim().is_empty() {
        Some(format!(r#"[id="{}"]"#, css_escape(&probe.id)))
    } else if !probe.name.trim().is_empty() {
        Some(format!(r#"{}[name="{}"]"#, probe.tag, css_escape(&probe.name)))
    } else {
        None
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// 问题文本和必填标记；末尾的 `*` 视为必填并去掉
pub fn question_text(probe: &ControlProbe) -> (String, bool) {
    let raw = [&probe.label, &probe.aria_label, &probe.placeholder]
        .into_iter()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
        .unwrap_or_default();
    let starred = raw.ends_with('*');
    let text = raw.trim_end_matches('*').trim_end().to_string();
    (text, starred)
}

fn is_placeholder_option(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.is_empty()
        || lower == "select"
        || lower == "select..."
        || lower == "please select"
        || lower == "--"
        || (lower.starts_with("select") && lower.ends_with("..."))
        || lower.starts_with("-- select")
}

/// 字段扫描器
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldScanner;

impl FieldScanner {
    pub fn new() -> Self {
        Self
    }

    /// 按文档顺序返回字段（不含身份字段），无法识别的控件以 `unknown` 返回
    pub async fn scan(&self, page: &dyn FormPage) -> Result<Vec<FieldDescriptor>> {
        let controls = page.probe_controls().await?;
        let fields = self.describe(&controls);
        debug!("扫描到 {} 个字段（控件 {} 个）", fields.len(), controls.len());
        Ok(fields)
    }

    /// 纯函数部分：控件 → 字段描述
    pub fn describe(&self, controls: &[ControlProbe]) -> Vec<FieldDescriptor> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut fields = Vec::new();

        for probe in controls {
            if identity_role(probe).is_some() {
                continue;
            }
            if !probe.visible && probe.input_type != "file" {
                continue;
            }

            let (text, starred) = question_text(probe);
            let locator = stable_locator(probe);
            let base_id = [&probe.id, &probe.name]
                .into_iter()
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| anonymous_id(probe, &text));
            let id = dedup_id(&mut seen, base_id);
            let required = probe.required || starred;

            let classified = classify(probe);
            let field = match (classified, locator, text.is_empty()) {
                (Some((kind, heuristic)), Some(locator), false) => {
                    debug!("字段 {} 识别为 {} ({})", id, kind, heuristic);
                    let mut field = FieldDescriptor::new(id, text, kind)
                        .required(required)
                        .with_locator(locator);
                    match kind {
                        FieldKind::Select => {
                            field = field.with_options(
                                probe
                                    .options
                                    .iter()
                                    .filter(|o| !is_placeholder_option(o))
                                    .cloned(),
                            );
                        }
                        FieldKind::PseudoSelect => {
                            let token = correlation_token(probe)
                                .map(str::to_string)
                                .unwrap_or_else(|| probe.id.clone());
                            field = field.with_scope_token(token);
                        }
                        _ => {}
                    }
                    field
                }
                (_, locator, _) => {
                    let text = if text.is_empty() { id.clone() } else { text };
                    let mut field =
                        FieldDescriptor::new(id, text, FieldKind::Unknown).required(required);
                    if let Some(locator) = locator {
                        field = field.with_locator(locator);
                    }
                    field
                }
            };
            fields.push(field);
        }

        fields
    }
}

/// 没有 id 和 name 的控件：用标签、类型和问题文本拼 id，不依赖文档位置
fn anonymous_id(probe: &ControlProbe, text: &str) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    [probe.tag.as_str(), probe.input_type.as_str(), slug.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .fold("unknown".to_string(), |id, part| format!("{}-{}", id, part))
}

fn dedup_id(seen: &mut HashMap<String, usize>, base: String) -> String {
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}-{}", base, count)
    }
}
