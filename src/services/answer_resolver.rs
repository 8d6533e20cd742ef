//! 答案解析 - 业务能力层
//!
//! 三层依次尝试：预设规则 → 上下文推断 → 生成式回答。
//! 只决定"填什么"，不碰页面。

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FormError;
use crate::models::{AnswerRecord, ApplicantProfile, FieldDescriptor, FieldKind, ResolverConfig, SourceTier};
use crate::services::option_match;

/// 生成式回答的输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerativeRequest {
    pub question_text: String,
    pub profile_summary: String,
    /// 选择类字段的候选项，文本字段为空
    pub options: Vec<String>,
}

/// 生成式回答能力
#[async_trait]
pub trait GenerativeAnswerer: Send + Sync {
    async fn answer(&self, request: &GenerativeRequest) -> Result<String>;
}

/// 上下文层推断出的问题类别，按尝试顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Country,
    Institution,
    Clearance,
    Eligibility,
    Demographic,
    Binary,
}

pub struct AnswerResolver {
    config: Arc<ResolverConfig>,
    profile: Arc<ApplicantProfile>,
    generator: Option<Arc<dyn GenerativeAnswerer>>,
    timeout: Duration,
}

impl AnswerResolver {
    /// 个人资料里的标准回答追加在配置规则之后
    pub fn new(
        config: Arc<ResolverConfig>,
        profile: Arc<ApplicantProfile>,
        generator: Option<Arc<dyn GenerativeAnswerer>>,
        timeout: Duration,
    ) -> Self {
        let config = if profile.standard_answers.is_empty() {
            config
        } else {
            Arc::new(
                config
                    .as_ref()
                    .clone()
                    .with_extra_rules(profile.standard_answers.iter().cloned()),
            )
        };
        Self {
            config,
            profile,
            generator,
            timeout,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// 解析一个字段的答案
    ///
    /// `live_options` 是伪下拉框展开后读到的选项；原生 select 用扫描时的选项。
    pub async fn resolve(&self, field: &FieldDescriptor, live_options: Option<&[String]>) -> AnswerRecord {
        if !field.kind.is_resolvable() {
            return AnswerRecord::unresolved(&field.id);
        }

        if let Some(value) = self.predetermined(&field.question_text) {
            return AnswerRecord::resolved(&field.id, value, SourceTier::Predetermined);
        }

        let options: &[String] = match field.kind {
            FieldKind::Select => &field.options,
            FieldKind::PseudoSelect => live_options.unwrap_or(&[]),
            _ => &[],
        };

        if field.kind.is_selection() && !options.is_empty() {
            if let Some(value) = self.contextual(&field.question_text, options) {
                return AnswerRecord::resolved(&field.id, value, SourceTier::Contextual);
            }
        }

        if field.kind.is_selection() && options.is_empty() {
            debug!("字段 {} 没有可用选项，跳过生成式回答", field.id);
            return AnswerRecord::unresolved(&field.id);
        }

        match self.generative(field, options).await {
            Some(value) => AnswerRecord::resolved(&field.id, value, SourceTier::Generative),
            None => AnswerRecord::unresolved(&field.id),
        }
    }

    /// 第一层：按配置顺序的子串规则
    pub fn predetermined(&self, question: &str) -> Option<String> {
        self.config
            .first_match(question)
            .map(|rule| rule.answer_value.clone())
    }

    /// 第二层：由问题关键词推断类别，再在选项里找对应项
    pub fn contextual(&self, question: &str, options: &[String]) -> Option<String> {
        let lower = question.to_lowercase();
        self.categories(&lower)
            .into_iter()
            .find_map(|category| self.pick_for(category, &lower, options))
            .map(|i| options[i].clone())
    }

    fn categories(&self, lower: &str) -> Vec<Category> {
        let keywords = &self.config.categories;
        let hit = |list: &[String]| list.iter().any(|k| lower.contains(&k.to_lowercase()));

        let mut found = Vec::new();
        if hit(&keywords.country) {
            found.push(Category::Country);
        }
        if hit(&keywords.institution) {
            found.push(Category::Institution);
        }
        if hit(&keywords.clearance) && hit(&keywords.held_phrasing) {
            found.push(Category::Clearance);
        }
        if hit(&keywords.eligibility) {
            found.push(Category::Eligibility);
        }
        if hit(&keywords.demographic) {
            found.push(Category::Demographic);
        }
        found.push(Category::Binary);
        found
    }

    fn pick_for(&self, category: Category, lower: &str, options: &[String]) -> Option<usize> {
        match category {
            Category::Country => options.iter().position(|o| option_match::is_us_alias(o)),
            Category::Institution => {
                let school = self.profile.education.school.trim();
                if school.is_empty() {
                    None
                } else {
                    option_match::fuzzy_index(options, school)
                }
            }
            Category::Clearance => option_match::negative_index(options),
            Category::Eligibility => option_match::affirmative_index(options),
            Category::Demographic => options.iter().position(|o| option_match::is_decline(o)),
            Category::Binary => {
                if !option_match::has_yes_no(options) {
                    return None;
                }
                let yes = self.polarity(lower)?;
                option_match::polarity_index(options, yes)
            }
        }
    }

    /// 是非题的倾向：先看取值为 Yes/No 的规则（整词包含），再看工作许可
    fn polarity(&self, lower: &str) -> Option<bool> {
        let from_rules = self.config.rules.iter().find_map(|rule| {
            let yes = match rule.answer_value.trim().to_lowercase().as_str() {
                "yes" => true,
                "no" => false,
                _ => return None,
            };
            let token = rule.match_token.to_lowercase();
            let mut words = token.split_whitespace().peekable();
            words.peek()?;
            words.all(|w| lower.contains(w)).then_some(yes)
        });
        if from_rules.is_some() {
            return from_rules;
        }

        let keywords = &self.config.categories;
        let auth = &self.profile.work_authorization;
        let hit = |list: &[String]| list.iter().any(|k| lower.contains(&k.to_lowercase()));
        if hit(&keywords.sponsorship) {
            if let Some(needs) = auth.require_visa_sponsorship {
                return Some(needs);
            }
        }
        if hit(&keywords.authorization) {
            if let Some(authorized) = auth.authorized_to_work {
                return Some(authorized);
            }
        }
        None
    }

    /// 第三层：生成式回答，超时或出错按无答案处理
    async fn generative(&self, field: &FieldDescriptor, options: &[String]) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let request = GenerativeRequest {
            question_text: field.question_text.clone(),
            profile_summary: self.profile.summary_text(),
            options: options.to_vec(),
        };

        let reply = match tokio::time::timeout(self.timeout, generator.answer(&request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(
                    "{}",
                    FormError::GenerativeTimeout {
                        question: field.question_text.clone(),
                        reason: e.to_string(),
                    }
                );
                return None;
            }
            Err(_) => {
                warn!(
                    "{}",
                    FormError::GenerativeTimeout {
                        question: field.question_text.clone(),
                        reason: format!("超过 {:?}", self.timeout),
                    }
                );
                return None;
            }
        };

        let reply = reply.trim();
        if reply.is_empty() {
            return None;
        }
        if field.kind.is_selection() {
            option_match::exact_index(options, reply)
                .or_else(|| option_match::nearest_index(options, reply))
                .map(|i| options[i].clone())
        } else {
            Some(reply.to_string())
        }
    }
}
