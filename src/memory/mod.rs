//! 记忆层：LLM 消息类型、单次运行的执行上下文

pub mod context;
pub mod conversation;

pub use context::{ContextEntry, ExecutionContext, LAST_RESULT};
pub use conversation::{Message, Role};
