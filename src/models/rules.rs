//! 预设答案规则与类别关键词
//!
//! 规则是有序列表而不是映射：多个子串同时命中时，配置中靠前的规则胜出。

use serde::{Deserialize, Serialize};

/// 子串 → 答案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    #[serde(rename = "match")]
    pub match_token: String,
    #[serde(rename = "answer")]
    pub answer_value: String,
}

impl PatternRule {
    pub fn new(match_token: impl Into<String>, answer_value: impl Into<String>) -> Self {
        Self {
            match_token: match_token.into(),
            answer_value: answer_value.into(),
        }
    }

    /// `question_lower` 需已转小写
    pub fn matches(&self, question_lower: &str) -> bool {
        let token = self.match_token.trim().to_lowercase();
        !token.is_empty() && question_lower.contains(&token)
    }
}

/// 上下文层用来推断问题类别的关键词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryKeywords {
    pub country: Vec<String>,
    pub institution: Vec<String>,
    pub clearance: Vec<String>,
    /// “是否持有”类措辞
    pub held_phrasing: Vec<String>,
    pub eligibility: Vec<String>,
    pub demographic: Vec<String>,
    pub sponsorship: Vec<String>,
    pub authorization: Vec<String>,
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            country: words(&["country"]),
            institution: words(&["school", "university", "college", "institution"]),
            clearance: words(&["clearance"]),
            held_phrasing: words(&["held", "hold", "possess", "have"]),
            eligibility: words(&["eligib"]),
            demographic: words(&[
                "gender",
                "race",
                "ethnic",
                "hispanic",
                "latino",
                "veteran",
                "disability",
                "sexual orientation",
                "transgender",
                "pronoun",
            ]),
            sponsorship: words(&["sponsor"]),
            authorization: words(&["authorized to work", "legally authorized", "work authorization"]),
        }
    }
}

/// 传给解析器的只读配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<PatternRule>,
    #[serde(default)]
    pub categories: CategoryKeywords,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            categories: CategoryKeywords::default(),
        }
    }
}

impl ResolverConfig {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self {
            rules,
            categories: CategoryKeywords::default(),
        }
    }

    /// 按配置顺序找第一条命中的规则
    pub fn first_match(&self, question: &str) -> Option<&PatternRule> {
        let lower = question.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&lower))
    }

    /// 追加规则（排在已有规则之后，优先级更低）
    pub fn with_extra_rules(mut self, extra: impl IntoIterator<Item = PatternRule>) -> Self {
        self.rules.extend(extra);
        self
    }
}

fn default_rules() -> Vec<PatternRule> {
    [
        ("how did you hear", "Corporate Website"),
        ("where did you find", "Corporate Website"),
        ("please specify", "Corporate Website"),
        ("conflict", "No"),
        ("worked here before", "No"),
        ("previously been employed", "No"),
        ("referred by", "No"),
        ("convicted", "No"),
        ("felony", "No"),
        ("sponsorship", "No"),
        ("authorized to work", "Yes"),
        ("legally authorized", "Yes"),
        ("18 years", "Yes"),
        ("certify", "Yes"),
    ]
    .into_iter()
    .map(|(token, answer)| PatternRule::new(token, answer))
    .collect()
}
