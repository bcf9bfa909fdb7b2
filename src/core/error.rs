//! 错误类型
//!
//! 核心循环本身没有致命错误（解析降级、工具失败、上下文缺失都会被就地吸收）；
//! AgentError 只用于外围包装层：目标校验、配置加载、LLM 调用，以及工具执行器内部的失败分类
//! （执行器最终会把它渲染为 ToolOutcome::Error 的字符串）。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid goal: {reason}")]
    InvalidGoal { reason: String, hint: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Tool panicked: {0}")]
    ToolPanicked(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),
}

impl AgentError {
    pub fn invalid_goal(reason: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidGoal {
            reason: reason.into(),
            hint: hint.into(),
        }
    }

    /// 面向用户的帮助提示（仅 InvalidGoal 携带）
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::InvalidGoal { hint, .. } => Some(hint.as_str()),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        Self::ConfigError(e.to_string())
    }
}
