//! 计划层：Step / Plan 类型、计划文本解析、规划模型调用
//!
//! Step 的工具名在解析阶段只要求出现在已知名称集合里，是否真正可执行留到执行阶段由工具执行器判定。
//! 参数里的上下文引用（`${key}` 或 "search results" 这类指代）在解析时只做语法记录，执行时才替换。

pub mod parser;
pub mod planner;

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::memory::context::{step_key, ExecutionContext, LAST_RESULT};

pub use parser::{classify_tool, parse};
pub use planner::{extract_search_query, PlanOutput, Planner};

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{\s*([A-Za-z0-9_]+)\s*\}").expect("valid regex"))
}

fn step_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^step\s*(\d+)(?:'s)?\s*(?:result|results|output)$").expect("valid regex"))
}

/// 指代"上一步结果"的自然语言短语（小写，已去掉开头的 the）
const LAST_RESULT_PHRASES: &[&str] = &[
    "search results",
    "search result",
    "last result",
    "last results",
    "previous result",
    "previous results",
    "previous search result",
    "previous search results",
    "previous output",
    "last output",
];

/// 参数中的上下文引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum Reference {
    /// `${key}` 占位符，只替换占位符本身
    Placeholder(String),
    /// 整个参数是一句指代，解析成功时整体替换
    Phrase(String),
}

impl Reference {
    pub fn key(&self) -> &str {
        match self {
            Reference::Placeholder(k) | Reference::Phrase(k) => k,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub ordinal: usize,
    pub tool: String,
    pub argument: String,
    pub references: Vec<Reference>,
}

/// 执行时替换引用后的参数；unresolved 为未命中的 key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArgument {
    pub text: String,
    pub unresolved: Vec<String>,
}

impl Step {
    pub fn new(ordinal: usize, tool: impl Into<String>, argument: impl Into<String>) -> Self {
        let argument = argument.into();
        let references = scan_references(&argument);
        Self {
            ordinal,
            tool: tool.into(),
            argument,
            references,
        }
    }

    /// 用上下文替换引用；未命中的引用保留原文（占位符或短语本身）
    pub fn resolve_argument(&self, ctx: &ExecutionContext) -> ResolvedArgument {
        let mut unresolved = Vec::new();

        if let Some(Reference::Phrase(key)) = self.references.first() {
            return match ctx.resolve(key) {
                Some(v) => ResolvedArgument {
                    text: v.to_string(),
                    unresolved,
                },
                None => ResolvedArgument {
                    text: self.argument.clone(),
                    unresolved: vec![key.clone()],
                },
            };
        }

        if self.references.is_empty() {
            return ResolvedArgument {
                text: self.argument.clone(),
                unresolved,
            };
        }

        let text = placeholder_re()
            .replace_all(&self.argument, |caps: &Captures| {
                let key = &caps[1];
                match ctx.resolve(key) {
                    Some(v) => v.to_string(),
                    None => {
                        unresolved.push(key.to_string());
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();
        ResolvedArgument { text, unresolved }
    }
}

/// 识别参数里的引用：整句指代优先，其次 `${key}` 占位符
fn scan_references(argument: &str) -> Vec<Reference> {
    let normalized = argument
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase();
    let normalized = normalized.strip_prefix("the ").unwrap_or(&normalized).trim();

    if LAST_RESULT_PHRASES.contains(&normalized) {
        return vec![Reference::Phrase(LAST_RESULT.to_string())];
    }
    if let Some(caps) = step_phrase_re().captures(normalized) {
        if let Ok(n) = caps[1].parse::<usize>() {
            return vec![Reference::Phrase(step_key(n))];
        }
    }

    placeholder_re()
        .captures_iter(argument)
        .map(|c| Reference::Placeholder(c[1].to_string()))
        .collect()
}

/// 有序步骤序列，序号从 1 连续编号
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由 (tool, argument) 序列构造，按顺序重新编号
    pub fn from_calls<I, T, A>(calls: I) -> Self
    where
        I: IntoIterator<Item = (T, A)>,
        T: Into<String>,
        A: Into<String>,
    {
        let steps = calls
            .into_iter()
            .enumerate()
            .map(|(i, (tool, arg))| Step::new(i + 1, tool, arg))
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_reference() {
        let step = Step::new(2, "summarize_text", "Search results");
        assert_eq!(step.references, vec![Reference::Phrase("last_result".into())]);
        let step = Step::new(3, "summarize_text", "the step 1 result.");
        assert_eq!(step.references, vec![Reference::Phrase("step_1_result".into())]);
    }

    #[test]
    fn test_placeholder_references() {
        let step = Step::new(1, "summarize_text", "Compare ${step_1_result} with ${ last_result }");
        assert_eq!(
            step.references,
            vec![
                Reference::Placeholder("step_1_result".into()),
                Reference::Placeholder("last_result".into()),
            ]
        );
        assert!(Step::new(1, "search_web", "rust ownership").references.is_empty());
    }

    #[test]
    fn test_resolve_substitutes_and_passes_through_misses() {
        let mut ctx = ExecutionContext::new();
        ctx.store("step_1_result", "A", 1);

        let step = Step::new(2, "summarize_text", "${step_1_result} and ${missing}");
        let resolved = step.resolve_argument(&ctx);
        assert_eq!(resolved.text, "A and ${missing}");
        assert_eq!(resolved.unresolved, vec!["missing".to_string()]);

        let step = Step::new(2, "summarize_text", "last result");
        let resolved = step.resolve_argument(&ctx);
        assert_eq!(resolved.text, "last result");
        assert_eq!(resolved.unresolved, vec!["last_result".to_string()]);

        ctx.store("last_result", "B", 1);
        assert_eq!(step.resolve_argument(&ctx).text, "B");
    }

    #[test]
    fn test_substituted_value_is_not_rescanned() {
        let mut ctx = ExecutionContext::new();
        ctx.store("last_result", "${step_9_result}", 1);
        let step = Step::new(2, "summarize_text", "x ${last_result}");
        let resolved = step.resolve_argument(&ctx);
        assert_eq!(resolved.text, "x ${step_9_result}");
        assert!(resolved.unresolved.is_empty());
    }

    #[test]
    fn test_from_calls_numbers_contiguously() {
        let plan = Plan::from_calls([("search_web", "a"), ("summarize_text", "b")]);
        let ordinals: Vec<_> = plan.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
    }
}
