//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat（规划与摘要均用它即可）

use std::time::Duration;

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 创建 DeepSeek 客户端
///
/// - 优先使用环境变量 `DEEPSEEK_API_KEY`，其次 `OPENAI_API_KEY`
/// - 模型可通过 `model` 参数或 `DEEPSEEK_MODEL` 环境变量指定
pub fn create_deepseek_client(model: Option<&str>, request_timeout: Duration) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| "sk-placeholder".to_string());

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());

    OpenAiClient::new(Some(DEEPSEEK_BASE_URL), &model, Some(api_key.as_str()))
        .with_request_timeout(request_timeout)
}
