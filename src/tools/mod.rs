//! 工具箱：封闭的内置工具集合（search_web、summarize_text）与执行器

pub mod executor;
pub mod registry;
pub mod search;
pub mod summarize;

pub use executor::{ToolInvoker, ToolOutcome};
pub use registry::{Tool, ToolKind, ToolRegistry};
pub use search::{DuckDuckGoClient, SearchBackend, SearchResponse, SearchTool};
pub use summarize::{LlmSummarizer, SummarizeTool, Summarizer};
