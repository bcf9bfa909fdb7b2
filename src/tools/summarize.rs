//! summarize_text 工具
//!
//! Summarizer 是外部协作者（摘要模型调用）。调用前按字符数确定性截断输入，
//! 同一输入总是截成同一结果；空输入、模型失败、空摘要都以 Err 返回。

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SummarizeSection;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::tools::{Tool, ToolKind};

/// 摘要协作者：max_output_len 为摘要长度上限（词）
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, max_output_len: usize) -> Result<String, String>;
}

/// 用 LLM 做摘要
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
    min_output_len: usize,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>, min_output_len: usize) -> Self {
        Self {
            llm,
            min_output_len,
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str, max_output_len: usize) -> Result<String, String> {
        let messages = [
            Message::system(format!(
                "You summarize text. Reply with a single plain-prose summary of {} to {} words. \
                 Do not add facts that are not in the text.",
                self.min_output_len, max_output_len
            )),
            Message::user(text.to_string()),
        ];
        self.llm.complete(&messages).await
    }
}

/// 按字符数截断；超长时追加 "..."
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// summarize_text 工具
pub struct SummarizeTool {
    summarizer: Arc<dyn Summarizer>,
    max_input_chars: usize,
    max_output_len: usize,
}

impl SummarizeTool {
    pub fn new(summarizer: Arc<dyn Summarizer>, config: &SummarizeSection) -> Self {
        Self {
            summarizer,
            max_input_chars: config.max_input_chars,
            max_output_len: config.max_output_len,
        }
    }
}

#[async_trait]
impl Tool for SummarizeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SummarizeText
    }

    fn description(&self) -> &str {
        "summarizes text into a short paragraph"
    }

    async fn execute(&self, argument: &str) -> Result<String, String> {
        if argument.trim().is_empty() {
            return Err("No text provided to summarize".to_string());
        }

        let input = truncate_chars(argument, self.max_input_chars);
        let original = argument.chars().count();
        if original > self.max_input_chars {
            tracing::debug!(from = original, to = self.max_input_chars, "summarize input truncated");
        }

        let summary = self
            .summarizer
            .summarize(&input, self.max_output_len)
            .await
            .map_err(|e| format!("Summarization failed: {e}"))?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err("Summary could not be generated".to_string());
        }
        Ok(summary.to_string())
    }
}
