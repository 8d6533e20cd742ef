//! 选项文本匹配
//!
//! 匹配优先级：精确（忽略大小写）> 规范化后相等 > 前缀 > 包含 > “Other”。

use phf::phf_set;
use regex::Regex;
use std::sync::OnceLock;

static US_ALIASES: phf::Set<&'static str> = phf_set! {
    "united states",
    "united states of america",
    "us",
    "usa",
    "u.s.",
    "u.s.a.",
};

static DECLINE_PHRASES: phf::Set<&'static str> = phf_set! {
    "decline",
    "prefer not",
    "not wish",
    "don't wish",
    "do not wish",
    "not want to answer",
    "choose not to",
    "not to disclose",
    "not to answer",
    "not to self identify",
};

fn separators() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_\s]+").ok()).as_ref()
}

/// 小写，连字符 / 下划线 / 空白折叠成单个空格
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    match separators() {
        Some(re) => re.replace_all(&lower, " ").trim().to_string(),
        None => lower.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// 选项是怎么匹配上的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVia {
    Exact,
    Fuzzy,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionPick {
    pub index: usize,
    pub text: String,
    pub via: MatchVia,
}

/// 精确 → 模糊 → Other
pub fn pick(options: &[String], target: &str) -> Option<OptionPick> {
    let found = exact_index(options, target)
        .map(|i| (i, MatchVia::Exact))
        .or_else(|| fuzzy_index(options, target).map(|i| (i, MatchVia::Fuzzy)))
        .or_else(|| other_index(options).map(|i| (i, MatchVia::Other)))?;
    Some(OptionPick {
        index: found.0,
        text: options[found.0].clone(),
        via: found.1,
    })
}

pub fn exact_index(options: &[String], target: &str) -> Option<usize> {
    let target = target.trim().to_lowercase();
    if target.is_empty() {
        return None;
    }
    options
        .iter()
        .position(|o| o.trim().to_lowercase() == target)
}

/// 按词切分，去掉词两端的标点
fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn starts_with_words(hay: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && hay.len() >= needle.len() && hay[..needle.len()] == *needle
}

fn contains_words(hay: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && hay.windows(needle.len()).any(|w| w == needle)
}

/// 规范化后按字符串互相包含；太短的一方不参与，免得 "no" 命中 "unknown"
fn contains_text(a: &str, b: &str) -> bool {
    const MIN_LEN: usize = 3;
    let (a, b) = (normalize(a), normalize(b));
    (b.chars().count() >= MIN_LEN && a.contains(&b)) || (a.chars().count() >= MIN_LEN && b.contains(&a))
}

/// 规范化后相等 > 前缀 > 包含（双向，先按整词，再按字符串）；同级取靠前的选项
pub fn fuzzy_index(options: &[String], target: &str) -> Option<usize> {
    let raw = target;
    let target = tokens(target);
    if target.is_empty() {
        return None;
    }
    options
        .iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let option = tokens(text);
            if option.is_empty() {
                return None;
            }
            let rank = if option == target {
                0
            } else if starts_with_words(&option, &target) || starts_with_words(&target, &option) {
                1
            } else if contains_words(&option, &target) || contains_words(&target, &option) {
                2
            } else if contains_text(text, raw) {
                3
            } else {
                return None;
            };
            Some((rank, i))
        })
        .min()
        .map(|(_, i)| i)
}

/// 生成式答案吸附到最接近的选项：双向包含，长度差最小
pub fn nearest_index(options: &[String], target: &str) -> Option<usize> {
    let raw = target;
    let target = tokens(target);
    if target.is_empty() {
        return None;
    }
    let target_len = target.join(" ").len();
    options
        .iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let option = tokens(text);
            let words = contains_words(&option, &target) || contains_words(&target, &option);
            if !words && !contains_text(text, raw) {
                return None;
            }
            Some((option.join(" ").len().abs_diff(target_len), i))
        })
        .min()
        .map(|(_, i)| i)
}

pub fn other_index(options: &[String]) -> Option<usize> {
    options.iter().position(|o| {
        let o = o.trim().to_lowercase();
        o == "other" || o == "other (please specify)" || o.starts_with("other")
    })
}

pub fn is_us_alias(option: &str) -> bool {
    let lower = option.trim().to_lowercase();
    if US_ALIASES.contains(lower.as_str()) {
        return true;
    }
    let stripped = lower.trim_end_matches(|c: char| c.is_ascii_punctuation());
    US_ALIASES.contains(stripped)
}

pub fn is_decline(option: &str) -> bool {
    let lower = option.to_lowercase();
    DECLINE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

pub fn polarity_index(options: &[String], yes: bool) -> Option<usize> {
    let wanted = if yes { "yes" } else { "no" };
    options.iter().position(|o| tokens(o) == [wanted])
}

pub fn has_yes_no(options: &[String]) -> bool {
    polarity_index(options, true).is_some() && polarity_index(options, false).is_some()
}

fn leading_word(option: &str) -> Option<String> {
    tokens(option).into_iter().next()
}

/// 否定类选项：“No” 优先，其次 “No, ...”，最后 “None”
pub fn negative_index(options: &[String]) -> Option<usize> {
    polarity_index(options, false)
        .or_else(|| options.iter().position(|o| leading_word(o).as_deref() == Some("no")))
        .or_else(|| options.iter().position(|o| tokens(o).iter().any(|w| w == "none")))
}

pub fn affirmative_index(options: &[String]) -> Option<usize> {
    polarity_index(options, true)
        .or_else(|| options.iter().position(|o| leading_word(o).as_deref() == Some("yes")))
}
