//! 计划文本解析
//!
//! 规划模型被要求输出 `Step N: tool(argument)`。模型输出常常不规整（整段挤在一行、
//! 夹杂解释、工具名大小写不一），所以解析只做尽力而为：
//! - 以 "Step N:" 标记切分候选段，标记之外的文字忽略。行首标记总是生效；行内标记
//!   只在编号紧接上一个标记、且不在未闭合的括号内时生效（参数里的 "step 1)" 不会切段）；
//! - 每段用 classify_tool 做大小写不敏感的子串匹配识别工具名，识别不到就跳过该段；
//! - 参数支持 `tool(arg)`、`tool: arg`、`tool arg` 三种写法；
//! - 仅去掉"工具与参数都逐字节相同"的相邻重复步骤，再截断到 max_steps。
//! 任何输入都不会报错，最坏情况返回空计划。

use std::sync::OnceLock;

use regex::Regex;

use crate::plan::Plan;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bstep\s*#?\s*(\d+)\s*[:.)\-]").expect("valid regex"))
}

/// 步骤标记在原文中的位置：(标记起点, 标记终点)
fn step_markers(raw: &str) -> Vec<(usize, usize)> {
    let mut markers: Vec<(usize, usize)> = Vec::new();
    let mut last_number: Option<u64> = None;

    for caps in marker_re().captures_iter(raw) {
        let Some(m) = caps.get(0) else { continue };
        let number = caps.get(1).and_then(|n| n.as_str().parse::<u64>().ok());

        let line_start = raw[..m.start()].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let at_line_start = raw[line_start..m.start()].trim().is_empty();
        let accepted = at_line_start || {
            let seg_start = markers.last().map(|&(_, end)| end).unwrap_or(0);
            let sequential = match (last_number, number) {
                (None, _) => true,
                (Some(prev), Some(n)) => prev.checked_add(1) == Some(n),
                (Some(_), None) => false,
            };
            sequential && !inside_open_paren(&raw[seg_start..m.start()])
        };

        if accepted {
            markers.push((m.start(), m.end()));
            last_number = number;
        }
    }
    markers
}

/// 文本末尾是否处于未闭合的 '(' 之内
fn inside_open_paren(s: &str) -> bool {
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth > 0
}

pub fn parse(raw: &str, known_tools: &[&str], max_steps: usize) -> Plan {
    let markers = step_markers(raw);
    if markers.is_empty() {
        tracing::debug!(chars = raw.len(), "no step markers in planning output");
        return Plan::empty();
    }

    let mut calls: Vec<(String, String)> = Vec::new();
    for (i, &(_, marker_end)) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map(|&(start, _)| start).unwrap_or(raw.len());
        let segment = raw[marker_end..end].trim();

        let Some((tool, pos)) = classify_tool(segment, known_tools) else {
            tracing::debug!(segment = %segment, "no known tool in step, skipped");
            continue;
        };
        let argument = extract_argument(&segment[pos + tool.len()..]);

        if calls
            .last()
            .is_some_and(|(t, a)| t.as_str() == tool && *a == argument)
        {
            continue;
        }
        calls.push((tool.to_string(), argument));
    }

    if calls.len() > max_steps {
        tracing::debug!(parsed = calls.len(), max_steps, "plan truncated");
        calls.truncate(max_steps);
    }
    Plan::from_calls(calls)
}

/// 在一段文本中识别工具名：ASCII 大小写不敏感的子串匹配。
/// 出现位置最靠前者胜出，同位置取较长的名称；返回 (规范名称, 字节位置)
pub fn classify_tool<'a>(segment: &str, known_tools: &[&'a str]) -> Option<(&'a str, usize)> {
    let haystack = segment.to_ascii_lowercase();
    known_tools
        .iter()
        .filter(|name| !name.is_empty())
        .filter_map(|&name| {
            haystack
                .find(&name.to_ascii_lowercase())
                .map(|pos| (name, pos))
        })
        .min_by(|(a, pa), (b, pb)| pa.cmp(pb).then(b.len().cmp(&a.len())))
}

/// 从工具名之后的文本提取参数
fn extract_argument(rest: &str) -> String {
    let rest = rest.trim_start();
    let arg = if let Some(inner) = rest.strip_prefix('(') {
        match matching_paren(inner) {
            Some(close) => &inner[..close],
            None => first_line(inner),
        }
    } else if let Some(after) = rest.strip_prefix([':', '=', '-']) {
        first_line(after)
    } else {
        first_line(rest)
    };
    strip_quotes(arg.trim()).to_string()
}

/// 找与已消费的 '(' 配对的 ')' 的字节位置
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            '\n' => return None,
            _ => {}
        }
    }
    None
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOOLS: &[&str] = &["search_web", "summarize_text"];

    fn calls(plan: &Plan) -> Vec<(usize, &str, &str)> {
        plan.iter()
            .map(|s| (s.ordinal, s.tool.as_str(), s.argument.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_canonical_format() {
        let plan = parse(
            "Step 1: search_web(quantum computing)\nStep 2: summarize_text(search results)",
            TOOLS,
            10,
        );
        assert_eq!(
            calls(&plan),
            vec![
                (1, "search_web", "quantum computing"),
                (2, "summarize_text", "search results"),
            ]
        );
    }

    #[test]
    fn test_no_markers_yields_empty_plan() {
        assert!(parse("", TOOLS, 10).is_empty());
        assert!(parse("search_web(rust) then summarize_text(it)", TOOLS, 10).is_empty());
        assert!(parse("}}{{ \u{0}garbage ((( ", TOOLS, 10).is_empty());
    }

    #[test]
    fn test_single_line_output_and_noise() {
        let raw = "Plan: here you go. Step 1: Search_Web(\"rust async\") Step 2. I think summarize_text: ${last_result}\nThanks!";
        let plan = parse(raw, TOOLS, 10);
        assert_eq!(
            calls(&plan),
            vec![
                (1, "search_web", "rust async"),
                (2, "summarize_text", "${last_result}"),
            ]
        );
    }

    #[test]
    fn test_step_mention_inside_argument_does_not_split() {
        let plan = parse(
            "Step 1: search_web(rust)\nStep 2: summarize_text(the output of step 1)",
            TOOLS,
            10,
        );
        assert_eq!(
            calls(&plan),
            vec![
                (1, "search_web", "rust"),
                (2, "summarize_text", "the output of step 1"),
            ]
        );

        // 行内编号不连续的 "step N:" 也不切段
        let plan = parse(
            "Step 1: search_web(rust)\nStep 2: summarize_text: combine step 1: and notes",
            TOOLS,
            10,
        );
        assert_eq!(plan.steps()[1].argument, "combine step 1: and notes");
    }

    #[test]
    fn test_inline_sequential_markers_after_line_marker() {
        let plan = parse(
            "Step 1: search_web(rust) Step 2: summarize_text(${last_result})",
            TOOLS,
            10,
        );
        assert_eq!(
            calls(&plan),
            vec![
                (1, "search_web", "rust"),
                (2, "summarize_text", "${last_result}"),
            ]
        );
    }

    #[test]
    fn test_unrecognized_tools_are_skipped_and_renumbered() {
        let raw = "Step 1: calculator(2+2)\nStep 2: search_web(llamas)\nStep 3: open_browser(x)";
        let plan = parse(raw, TOOLS, 10);
        assert_eq!(calls(&plan), vec![(1, "search_web", "llamas")]);
    }

    #[test]
    fn test_dedup_only_identical_consecutive() {
        let raw = "Step 1: search_web(a)\nStep 2: search_web(a)\nStep 3: search_web(b)\nStep 4: search_web(a)\nStep 5: search_web(A)";
        let plan = parse(raw, TOOLS, 10);
        let args: Vec<_> = plan.iter().map(|s| s.argument.as_str()).collect();
        assert_eq!(args, vec!["a", "b", "a", "A"]);
    }

    #[test]
    fn test_truncates_to_max_steps() {
        let raw = (1..=6)
            .map(|i| format!("Step {i}: search_web(topic {i})"))
            .collect::<Vec<_>>()
            .join("\n");
        let plan = parse(&raw, TOOLS, 3);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps()[2].argument, "topic 3");
        assert!(parse(&raw, TOOLS, 0).is_empty());
    }

    #[test]
    fn test_nested_and_unclosed_parens() {
        let plan = parse(
            "Step 1: search_web(rust (language) history)\nStep 2: summarize_text(unfinished",
            TOOLS,
            10,
        );
        assert_eq!(
            calls(&plan),
            vec![
                (1, "search_web", "rust (language) history"),
                (2, "summarize_text", "unfinished"),
            ]
        );
    }

    #[test]
    fn test_classify_tool_prefers_earliest_then_longest() {
        assert_eq!(
            classify_tool("use SUMMARIZE_TEXT after search_web", TOOLS),
            Some(("summarize_text", 4))
        );
        assert_eq!(classify_tool("nothing here", TOOLS), None);
        assert_eq!(
            classify_tool("search_web_deep(x)", &["search_web", "search_web_deep"]),
            Some(("search_web_deep", 0))
        );
    }

    #[test]
    fn test_placeholder_recorded_not_substituted() {
        let plan = parse("Step 1: summarize_text(${step_1_result})", TOOLS, 10);
        let step = &plan.steps()[0];
        assert_eq!(step.argument, "${step_1_result}");
        assert_eq!(step.references.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let raw = "Step 1: search_web(x)\nStep 2: summarize_text(search results)";
        assert_eq!(parse(raw, TOOLS, 10), parse(raw, TOOLS, 10));
    }
}
