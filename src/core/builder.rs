//! Agent 构建器：从配置组装 LLM、外部协作者、工具与 Agent
//!
//! 工具集合在这里一次性注册（启动时固定）。测试或嵌入方可通过 with_* 注入替身协作者。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::Agent;
use crate::config::{load_config, AppConfig};
use crate::core::AgentError;
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::plan::Planner;
use crate::tools::{
    DuckDuckGoClient, LlmSummarizer, SearchBackend, SearchTool, SummarizeTool, Summarizer,
    ToolInvoker, ToolRegistry,
};

/// 按 provider 与环境变量中的 API Key 选择 LLM 后端；都不可用时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout = Duration::from_secs(cfg.llm.timeouts.request);
    if provider == "mock" {
        tracing::info!("Using Mock LLM");
        return Arc::new(MockLlmClient::new());
    }

    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
        Arc::new(create_deepseek_client(Some(&cfg.llm.model), timeout))
    } else if use_openai {
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
        Arc::new(
            OpenAiClient::new(
                base,
                &cfg.llm.model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            )
            .with_request_timeout(timeout),
        )
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}

pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    search: Option<Arc<dyn SearchBackend>>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            search: None,
            summarizer: None,
        }
    }

    /// 规划模型（未单独注入摘要协作者时也用于摘要）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_search_backend(mut self, search: Arc<dyn SearchBackend>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn build_llm(&self) -> Arc<dyn LlmClient> {
        self.llm
            .clone()
            .unwrap_or_else(|| create_llm_from_config(&self.config))
    }

    /// 注册全部内置工具
    pub fn build_tool_registry(&self, llm: Arc<dyn LlmClient>) -> ToolRegistry {
        let tools_cfg = &self.config.tools;
        let search: Arc<dyn SearchBackend> = match &self.search {
            Some(s) => s.clone(),
            None => Arc::new(DuckDuckGoClient::new(
                tools_cfg.search.endpoint.clone(),
                tools_cfg.search.timeout_secs,
            )),
        };
        let summarizer: Arc<dyn Summarizer> = match &self.summarizer {
            Some(s) => s.clone(),
            None => Arc::new(LlmSummarizer::new(llm, tools_cfg.summarize.min_output_len)),
        };

        let mut tools = ToolRegistry::new();
        tools.register(SearchTool::new(search, tools_cfg.search.max_related_topics));
        tools.register(SummarizeTool::new(summarizer, &tools_cfg.summarize));
        tools
    }

    pub fn build(self) -> Agent {
        let llm = self.build_llm();
        let tools = self.build_tool_registry(llm.clone());
        let planner = Planner::from_config(llm, tools.tool_descriptions(), &self.config.planner);
        let invoker = ToolInvoker::new(tools, self.config.tools.tool_timeout_secs);
        Agent::new(planner, invoker, self.config.planner.max_steps)
    }
}

/// 便捷函数：加载配置（默认文件 + 可选文件 + 环境变量）并创建 AgentBuilder
pub fn create_agent_builder(config_path: Option<PathBuf>) -> Result<AgentBuilder, AgentError> {
    let config = load_config(config_path)?;
    Ok(AgentBuilder::new(config))
}
