//! 核心：错误类型、目标校验、组件构建

pub mod builder;
pub mod error;
pub mod goal;

pub use builder::{create_agent_builder, create_llm_from_config, AgentBuilder};
pub use error::AgentError;
pub use goal::validate_goal;
