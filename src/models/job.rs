use serde::{Deserialize, Serialize};
use std::fmt;

/// 匹配器给出的职位引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
}

impl JobRef {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: String::new(),
            company: String::new(),
            match_score: None,
        }
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() && self.company.is_empty() {
            write!(f, "[职位 #{}]", self.id)
        } else {
            write!(f, "[职位 #{} {} @ {}]", self.id, self.title, self.company)
        }
    }
}

/// jobs.toml 的顶层结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub jobs: Vec<JobRef>,
}

impl JobList {
    /// 按匹配分数从高到低排序，没有分数的排在最后
    pub fn ranked(mut self) -> Vec<JobRef> {
        self.jobs.sort_by(|a, b| {
            let a = a.match_score.unwrap_or(f64::MIN);
            let b = b.match_score.unwrap_or(f64::MIN);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
        self.jobs
    }
}
