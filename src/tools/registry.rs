//! 工具注册表
//!
//! 工具集合是封闭的：ToolKind 枚举每个内置工具一个变体，名称到变体的映射在启动时固定。
//! 具体实现仍走 Tool trait（便于注入 HTTP 客户端、摘要模型等外部依赖，也便于测试替身），
//! ToolRegistry 按 ToolKind 存放 Arc<dyn Tool>。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// 内置工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKind {
    SearchWeb,
    SummarizeText,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::SearchWeb, ToolKind::SummarizeText];

    /// 计划文本中使用的名称
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::SearchWeb => "search_web",
            ToolKind::SummarizeText => "summarize_text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 工具 trait：描述（供规划 Prompt 使用）与异步执行（单个字符串参数）
///
/// 实现不得在多次调用之间累积隐藏状态。
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn description(&self) -> &str;

    async fn execute(&self, argument: &str) -> Result<String, String>;
}

/// 工具注册表：ToolKind → Arc<dyn Tool>；BTreeMap 保证描述输出顺序稳定
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.kind(), Arc::new(tool));
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    /// 按名称查找；未知名称或已知但未注册的工具都返回 None
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        ToolKind::from_name(name).and_then(|k| self.get(k))
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.keys().map(|k| k.name()).collect()
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的 Available tools 段落
    pub fn tool_descriptions(&self) -> Vec<(&'static str, String)> {
        self.tools
            .iter()
            .map(|(kind, tool)| (kind.name(), tool.description().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;

    #[async_trait]
    impl Tool for Stub {
        fn kind(&self) -> ToolKind {
            ToolKind::SummarizeText
        }

        fn description(&self) -> &str {
            "stub"
        }

        async fn execute(&self, argument: &str) -> Result<String, String> {
            Ok(argument.to_string())
        }
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("Search_Web"), None);
    }

    #[test]
    fn test_lookup_only_registered() {
        let mut reg = ToolRegistry::new();
        reg.register(Stub);
        assert!(reg.lookup("summarize_text").is_some());
        assert!(reg.lookup("search_web").is_none());
        assert!(reg.lookup("calculator").is_none());
        assert_eq!(reg.tool_names(), vec!["summarize_text"]);
    }
}
