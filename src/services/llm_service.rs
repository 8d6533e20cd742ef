//! LLM 服务 - 业务能力层
//!
//! 只负责"生成式回答"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::services::answer_resolver::{GenerativeAnswerer, GenerativeRequest};
use crate::utils::logging::truncate_text;

const SYSTEM_PROMPT: &str = "You are helping fill out a job application. \
Answer questions concisely and professionally based on the candidate's resume. \
For yes/no questions, answer with just \"Yes\" or \"No\". \
When a list of options is given, reply with exactly one option copied verbatim. \
For short text fields, keep answers under 100 words. \
For longer text fields (cover letters, etc.), you can write 200-300 words.";

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 回答申请表里的自定义问题
/// - 只处理单个问题
/// - 不出现会话 / 字段列表
/// - 不关心流程顺序
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（去掉首尾空白）
    pub async fn send_to_llm(&self, user_message: &str, system_message: Option<&str>) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.5)
            .max_tokens(400u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }

    fn build_user_message(request: &GenerativeRequest) -> String {
        let mut message = format!(
            "User Context:\n{}\n\nQuestion: {}\n",
            request.profile_summary, request.question_text
        );
        if !request.options.is_empty() {
            message.push_str("\nOptions:\n");
            for option in &request.options {
                message.push_str(&format!("- {}\n", option));
            }
        }
        message.push_str(
            "\nProvide a professional answer suitable for a job application. \
             Be honest and based only on the user information provided.",
        );
        message
    }

    /// 去掉模型常见的包装：引号、列表符号、末尾句号（仅选择题）
    fn clean_reply(reply: &str, has_options: bool) -> String {
        let mut text = reply
            .trim()
            .trim_start_matches(&['-', '*'][..])
            .trim()
            .trim_matches(&['"', '\'', '`'][..])
            .trim()
            .to_string();
        if has_options {
            text = text.trim_end_matches('.').trim().to_string();
        }
        text
    }
}

#[async_trait]
impl GenerativeAnswerer for LlmService {
    async fn answer(&self, request: &GenerativeRequest) -> Result<String> {
        let user_message = Self::build_user_message(request);
        let reply = self.send_to_llm(&user_message, Some(SYSTEM_PROMPT)).await?;
        let cleaned = Self::clean_reply(&reply, !request.options.is_empty());
        debug!(
            "生成式回答 ({}): {}",
            truncate_text(&request.question_text, 40),
            truncate_text(&cleaned, 80)
        );
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[&str]) -> GenerativeRequest {
        GenerativeRequest {
            question_text: "Are you willing to relocate?".into(),
            profile_summary: "Name: Ada Lovelace".into(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn user_message_lists_options() {
        let message = LlmService::build_user_message(&request(&["Yes", "No"]));
        assert!(message.contains("Question: Are you willing to relocate?"));
        assert!(message.contains("- Yes\n- No\n"));

        let message = LlmService::build_user_message(&request(&[]));
        assert!(!message.contains("Options:"));
    }

    #[test]
    fn clean_reply_strips_wrapping() {
        assert_eq!(LlmService::clean_reply("  \"Yes.\" ", true), "Yes");
        assert_eq!(LlmService::clean_reply("- No", true), "No");
        assert_eq!(LlmService::clean_reply("I enjoy Rust.", false), "I enjoy Rust.");
    }

    /// 需要真实的 API Key
    #[tokio::test]
    #[ignore]
    async fn test_answer_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = LlmService::new(&Config::from_env());
        let result = service.answer(&request(&["Yes", "No"])).await;

        match result {
            Ok(response) => {
                println!("\n========== LLM 响应 ==========");
                println!("{}", response);
                println!("==============================\n");
                assert!(!response.is_empty());
            }
            Err(e) => panic!("测试失败: {}", e),
        }
    }
}
