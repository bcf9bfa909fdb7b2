//! search_web 工具：DuckDuckGo Instant Answer API
//!
//! SearchBackend 是外部协作者（HTTP 调用），SearchTool 只负责把结构化响应整理成自然语言片段：
//! 主字段 Abstract 非空时优先，否则用次字段 Answer；随后附上至多 N 条相关主题。
//! 网络与解析失败、空查询、空响应都以 Err 返回，由执行器转为失败结果。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::AgentError;
use crate::tools::{Tool, ToolKind};

/// Instant Answer 响应中用到的字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "Abstract", default)]
    pub abstract_text: String,
    #[serde(rename = "Answer", default, deserialize_with = "lenient_string")]
    pub answer: String,
    #[serde(rename = "RelatedTopics", default)]
    pub related_topics: Vec<RelatedTopic>,
}

/// 分组主题（带 Topics 子数组）没有 Text 字段，反序列化为 None
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatedTopic {
    #[serde(rename = "Text")]
    pub text: Option<String>,
}

/// Answer 偶尔是对象或数字，此时按空字符串处理
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

impl SearchResponse {
    /// 主字段优先：Abstract 非空即采用，否则退回 Answer；两者皆空返回 None
    pub fn snippet(&self) -> Option<(&'static str, &str)> {
        let primary = self.abstract_text.trim();
        if !primary.is_empty() {
            return Some(("Abstract", primary));
        }
        let secondary = self.answer.trim();
        if !secondary.is_empty() {
            return Some(("Answer", secondary));
        }
        None
    }
}

/// 搜索协作者
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn query(&self, query: &str) -> Result<SearchResponse, AgentError>;
}

/// DuckDuckGo Instant Answer 客户端；超时由 reqwest 客户端负责
pub struct DuckDuckGoClient {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("agentic-planner/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoClient {
    async fn query(&self, query: &str) -> Result<SearchResponse, AgentError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| AgentError::SearchFailed(format!("request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AgentError::SearchFailed(format!("HTTP {}", resp.status())));
        }
        // DuckDuckGo 常以 application/x-javascript 返回 JSON，故先取文本再解析
        let body = resp
            .text()
            .await
            .map_err(|e| AgentError::SearchFailed(format!("read body: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| AgentError::SearchFailed(format!("invalid response: {e}")))
    }
}

/// search_web 工具
pub struct SearchTool {
    backend: Arc<dyn SearchBackend>,
    max_related_topics: usize,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>, max_related_topics: usize) -> Self {
        Self {
            backend,
            max_related_topics,
        }
    }

    fn format(&self, query: &str, resp: &SearchResponse) -> Result<String, String> {
        let mut sections = Vec::new();
        if let Some((label, text)) = resp.snippet() {
            sections.push(format!("{label}: {text}"));
        }
        sections.extend(
            resp.related_topics
                .iter()
                .filter_map(|t| t.text.as_deref())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .take(self.max_related_topics)
                .map(|t| format!("Related: {t}")),
        );

        if sections.is_empty() {
            tracing::warn!(query = %query, "search returned no structured data");
            return Err(format!("No detailed results found for '{query}'"));
        }
        Ok(sections.join("\n"))
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SearchWeb
    }

    fn description(&self) -> &str {
        "searches the web for a short factual snippet about a query"
    }

    async fn execute(&self, argument: &str) -> Result<String, String> {
        let query = argument.trim();
        if query.is_empty() {
            return Err("Missing search query".to_string());
        }
        tracing::info!(query = %query, "search_web");
        let resp = self.backend.query(query).await.map_err(|e| e.to_string())?;
        self.format(query, &resp)
    }
}
