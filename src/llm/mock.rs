//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序返回预置回复；回复用尽后重复最后一条。未预置任何回复时按请求内容应答：
//! 含 "Goal:" 行的规划请求生成固定的两步计划，其余请求（摘要）返回输入的前若干个词，
//! 便于本地跑通规划与执行流程。token 统计按空白分词计数。

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::llm::{LlmClient, TokenUsage};
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Vec<Result<String, String>>,
    calls: AtomicUsize,
    usage: TokenUsage,
}

/// 默认摘要保留的词数
const SUMMARY_WORDS: usize = 30;

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用依次返回一条预置文本
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(|s| Ok(s.into())).collect(),
            ..Self::default()
        }
    }

    /// 每次调用都返回错误，用于模拟 LLM 不可用
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: vec![Err(message.into())],
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn default_reply(last_user: &str) -> String {
    if let Some(goal) = last_user.lines().find_map(|l| l.trim().strip_prefix("Goal:")) {
        return format!(
            "Step 1: search_web({})\nStep 2: summarize_text(${{last_result}})",
            goal.trim()
        );
    }

    let words: Vec<&str> = last_user.split_whitespace().collect();
    let mut summary = words
        .iter()
        .take(SUMMARY_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > SUMMARY_WORDS {
        summary.push_str("...");
    }
    summary
}

fn word_count(s: &str) -> u64 {
    s.split_whitespace().count() as u64
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = match self.replies.last() {
            Some(last) => self.replies.get(n).unwrap_or(last).clone(),
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| matches!(m.role, Role::User))
                    .map(|m| m.content.as_str())
                    .unwrap_or("");
                Ok(default_reply(last_user))
            }
        };

        if let Ok(text) = &reply {
            let prompt: u64 = messages.iter().map(|m| word_count(&m.content)).sum();
            self.usage.add(prompt, word_count(text));
        }
        reply
    }
}
