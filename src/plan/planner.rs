//! Planner：调用规划模型把目标拆解为计划
//!
//! 规划模型是不透明的文本生成器：Planner 负责拼 Prompt、调用 LLM、把原始文本交给 parse。
//! LLM 调用失败时按空文本处理（不向上抛错）；开启 fallback_plan 时，空计划退回默认的
//! search_web → summarize_text 两步计划。

use std::sync::Arc;

use crate::config::PlannerSection;
use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::plan::{parse, Plan};
use crate::tools::ToolKind;

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Create a short step-by-step plan to achieve this goal using only these tools:

Available tools:
{tools}

Goal: {goal}

Write one step per line in exactly this format:
Step 1: search_web({query})
Step 2: summarize_text(${last_result})

Use ${last_result} to pass the previous step's output, or ${step_N_result} for a specific step.

Plan:";

/// 目标里常见的引导语，提取搜索词时去掉
const GOAL_PREFIXES: &[&str] = &["Find information about ", "Research ", "Explain "];

/// 从目标中提取搜索词
pub fn extract_search_query(goal: &str) -> String {
    let goal = goal.trim();
    GOAL_PREFIXES
        .iter()
        .find_map(|p| goal.strip_prefix(p))
        .unwrap_or(goal)
        .trim()
        .to_string()
}

/// 一次规划的产物：模型原始输出与解析结果
#[derive(Debug, Clone)]
pub struct PlanOutput {
    pub raw_text: String,
    pub plan: Plan,
    pub used_fallback: bool,
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
    /// (name, description)，用于 Prompt 与解析时的已知工具名
    tools: Vec<(&'static str, String)>,
    fallback_plan: bool,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Vec<(&'static str, String)>) -> Self {
        Self {
            llm,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            tools,
            fallback_plan: false,
        }
    }

    pub fn from_config(
        llm: Arc<dyn LlmClient>,
        tools: Vec<(&'static str, String)>,
        config: &PlannerSection,
    ) -> Self {
        let mut planner = Self::new(llm, tools).with_fallback_plan(config.fallback_plan);
        if let Some(t) = &config.prompt_template {
            planner.prompt_template = t.clone();
        }
        planner
    }

    pub fn with_fallback_plan(mut self, enabled: bool) -> Self {
        self.fallback_plan = enabled;
        self
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub fn known_tools(&self) -> Vec<&'static str> {
        self.tools.iter().map(|(n, _)| *n).collect()
    }

    pub fn build_prompt(&self, goal: &str) -> String {
        let tools = self
            .tools
            .iter()
            .map(|(name, desc)| format!("- {name}: {desc}"))
            .collect::<Vec<_>>()
            .join("\n");
        self.prompt_template
            .replace("{tools}", &tools)
            .replace("{goal}", goal)
            .replace("{query}", &extract_search_query(goal))
    }

    /// 调用规划模型，返回原始文本；失败时返回空文本
    pub async fn generate(&self, goal: &str) -> String {
        let messages = [Message::user(self.build_prompt(goal))];
        match self.llm.complete(&messages).await {
            Ok(text) => {
                tracing::debug!(chars = text.len(), raw = %text, "planning output");
                text
            }
            Err(e) => {
                let err = AgentError::LlmError(e);
                tracing::warn!(error = %err, "planning model call failed");
                String::new()
            }
        }
    }

    pub async fn plan(&self, goal: &str, max_steps: usize) -> PlanOutput {
        tracing::info!(goal = %goal, "planning started");
        let raw_text = self.generate(goal).await;
        let plan = parse(&raw_text, &self.known_tools(), max_steps);

        if plan.is_empty() && self.fallback_plan {
            tracing::info!("no steps parsed, using default plan");
            return PlanOutput {
                raw_text,
                plan: self.default_plan(goal, max_steps),
                used_fallback: true,
            };
        }

        tracing::info!(steps = plan.len(), "planning complete");
        PlanOutput {
            raw_text,
            plan,
            used_fallback: false,
        }
    }

    fn default_plan(&self, goal: &str, max_steps: usize) -> Plan {
        Plan::from_calls(
            [
                (ToolKind::SearchWeb.name(), extract_search_query(goal)),
                (ToolKind::SummarizeText.name(), "${last_result}".to_string()),
            ]
            .into_iter()
            .take(max_steps),
        )
    }
}
