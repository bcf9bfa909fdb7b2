//! 工具执行器
//!
//! invoke(tool_name, argument) 永不失败：未知工具、工具返回 Err、超时、甚至 panic，
//! 都先归类为 AgentError，再渲染为 ToolOutcome::Error；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::ToolRegistry;

/// 单次工具调用结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok(String),
    Error(String),
}

impl ToolOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutcome::Ok(_))
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Ok(s) | ToolOutcome::Error(s) => s,
        }
    }
}

impl From<Result<String, AgentError>> for ToolOutcome {
    fn from(r: Result<String, AgentError>) -> Self {
        match r {
            Ok(s) => ToolOutcome::Ok(s),
            Err(e) => ToolOutcome::Error(e.to_string()),
        }
    }
}

/// 工具执行器：持有启动时构建好的 ToolRegistry 与单次调用超时
pub struct ToolInvoker {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(registry: ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.registry.tool_names()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn invoke(&self, tool_name: &str, argument: &str) -> ToolOutcome {
        let start = Instant::now();
        let result = self.try_invoke(tool_name, argument).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AgentError::ToolTimeout(_)) => "timeout",
            Err(AgentError::UnknownTool(_)) => "unknown_tool",
            Err(AgentError::ToolPanicked(_)) => "panic",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(argument),
        });
        tracing::info!(audit = %audit, "tool");

        result.into()
    }

    /// 工具在独立 tokio 任务中运行，以便捕获 panic；随即等待其完成，不与其它步骤并发
    async fn try_invoke(&self, tool_name: &str, argument: &str) -> Result<String, AgentError> {
        let tool = self
            .registry
            .lookup(tool_name)
            .ok_or_else(|| AgentError::UnknownTool(tool_name.to_string()))?;

        let argument = argument.to_string();
        let mut handle = tokio::spawn(async move { tool.execute(&argument).await });

        match timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(content))) => Ok(content),
            Ok(Ok(Err(e))) => Err(AgentError::ToolExecutionFailed(e)),
            Ok(Err(join_err)) => Err(AgentError::ToolPanicked(format!(
                "{tool_name}: {join_err}"
            ))),
            Err(_) => {
                handle.abort();
                Err(AgentError::ToolTimeout(tool_name.to_string()))
            }
        }
    }
}

fn args_preview(args: &str) -> String {
    if args.chars().count() > 200 {
        format!("{}...", args.chars().take(200).collect::<String>())
    } else {
        args.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolKind};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn kind(&self) -> ToolKind {
            ToolKind::SummarizeText
        }
        fn description(&self) -> &str {
            "echo"
        }
        async fn execute(&self, argument: &str) -> Result<String, String> {
            if argument.is_empty() {
                return Err("empty".to_string());
            }
            Ok(argument.to_uppercase())
        }
    }

    struct Panics;

    #[async_trait]
    impl Tool for Panics {
        fn kind(&self) -> ToolKind {
            ToolKind::SearchWeb
        }
        fn description(&self) -> &str {
            "panics"
        }
        async fn execute(&self, _argument: &str) -> Result<String, String> {
            panic!("boom")
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn kind(&self) -> ToolKind {
            ToolKind::SearchWeb
        }
        fn description(&self) -> &str {
            "slow"
        }
        async fn execute(&self, _argument: &str) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn invoker_with(tool: impl Tool + 'static, timeout: Duration) -> ToolInvoker {
        let mut reg = ToolRegistry::new();
        reg.register(tool);
        ToolInvoker::with_timeout(reg, timeout)
    }

    #[tokio::test]
    async fn test_ok_and_error_outcomes() {
        let inv = invoker_with(Echo, Duration::from_secs(1));
        assert_eq!(
            inv.invoke("summarize_text", "hi").await,
            ToolOutcome::Ok("HI".to_string())
        );
        let out = inv.invoke("summarize_text", "").await;
        assert_eq!(out, ToolOutcome::Error("Tool execution failed: empty".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_outcome() {
        let inv = invoker_with(Echo, Duration::from_secs(1));
        let out = inv.invoke("calculator", "2+2").await;
        assert!(!out.is_ok());
        assert_eq!(out.text(), "Unknown tool: calculator");
        // 已知名称但未注册
        assert!(!inv.invoke("search_web", "x").await.is_ok());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let inv = invoker_with(Panics, Duration::from_secs(1));
        let out = inv.invoke("search_web", "x").await;
        assert!(out.text().starts_with("Tool panicked: search_web"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let inv = invoker_with(Slow, Duration::from_millis(20));
        let out = inv.invoke("search_web", "x").await;
        assert_eq!(out, ToolOutcome::Error("Tool timeout: search_web".to_string()));
    }
}
