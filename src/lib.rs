//! Agentic Planner - 目标拆解与逐步执行
//!
//! 模块划分：
//! - **agent**: Agent 运行时与计划执行器（状态机、步数上限、最终答案合成）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、目标校验、组件构建
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: LLM 消息类型与单次运行的执行上下文
//! - **observability**: 日志初始化
//! - **plan**: Step / Plan、计划文本解析、规划模型调用
//! - **tools**: 封闭工具集合（search_web、summarize_text）与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod plan;
pub mod tools;

pub use crate::agent::{Agent, ExecutionResult};
pub use crate::core::{AgentBuilder, AgentError};
pub use crate::plan::{parse, Plan, Step};
