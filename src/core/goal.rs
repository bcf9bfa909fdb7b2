//! 目标校验：在调用规划模型前过滤空目标、过短/过长目标、含 shell 元字符的目标，
//! 以及本工具无法处理的计算类、写代码类目标

use crate::config::GoalSection;
use crate::core::AgentError;

/// 校验并返回去除首尾空白后的目标；长度按字符计
pub fn validate_goal(goal: &str, rules: &GoalSection) -> Result<String, AgentError> {
    let goal = goal.trim();
    if goal.is_empty() {
        return Err(AgentError::invalid_goal(
            "goal cannot be empty",
            "Provide a clear goal like 'Research machine learning' or 'Explain Docker containers'",
        ));
    }

    let len = goal.chars().count();
    if len < rules.min_len {
        return Err(AgentError::invalid_goal(
            format!("goal too short (minimum {} characters)", rules.min_len),
            "Provide a more descriptive goal",
        ));
    }
    if len > rules.max_len {
        return Err(AgentError::invalid_goal(
            format!("goal too long (maximum {} characters)", rules.max_len),
            "Simplify your goal or break it into smaller parts",
        ));
    }

    if let Some(c) = goal.chars().find(|c| rules.forbidden_chars.contains(c)) {
        return Err(AgentError::invalid_goal(
            format!("goal contains invalid character '{c}'"),
            "Use only letters, numbers, spaces, and basic punctuation",
        ));
    }

    let lowered = goal.to_lowercase();
    if matches_any(&lowered, &rules.math_patterns) {
        return Err(AgentError::invalid_goal(
            "This tool searches and summarizes web content",
            "Try goals like 'Find information about X' or 'Research Y topic'",
        ));
    }
    if matches_any(&lowered, &rules.code_patterns) {
        return Err(AgentError::invalid_goal(
            "This tool demonstrates planning, not code generation",
            "Try research goals like 'Explain machine learning' or 'Find news about AI'",
        ));
    }

    Ok(goal.to_string())
}

fn matches_any(lowered_goal: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .any(|p| lowered_goal.contains(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_valid_goal() {
        let goal = validate_goal("  Find information about Rust  ", &GoalSection::default()).unwrap();
        assert_eq!(goal, "Find information about Rust");
    }

    #[test]
    fn test_rejects_empty_and_short() {
        let rules = GoalSection::default();
        assert!(matches!(
            validate_goal("   ", &rules),
            Err(AgentError::InvalidGoal { .. })
        ));
        let err = validate_goal("abc", &rules).unwrap_err();
        assert!(err.to_string().contains("too short"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_rejects_too_long() {
        let goal = "a".repeat(201);
        let err = validate_goal(&goal, &GoalSection::default()).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_rejects_forbidden_chars() {
        let err = validate_goal("Research rust; rm -rf", &GoalSection::default()).unwrap_err();
        assert!(err.to_string().contains("';'"));
    }

    #[test]
    fn test_rejects_math_goals() {
        let rules = GoalSection::default();
        for goal in ["Calculate the area of a circle", "solve x squared", "Help with MATH homework"] {
            let err = validate_goal(goal, &rules).unwrap_err();
            assert!(err.to_string().contains("searches and summarizes web content"), "{goal}");
            assert!(err.hint().unwrap().contains("Find information about X"));
        }
    }

    #[test]
    fn test_rejects_code_goals() {
        let rules = GoalSection::default();
        for goal in ["Write Python script for scraping", "Debug my program", "implement a linked list"] {
            let err = validate_goal(goal, &rules).unwrap_err();
            assert!(err.to_string().contains("not code generation"), "{goal}");
            assert!(err.hint().unwrap().contains("Explain machine learning"));
        }
    }

    #[test]
    fn test_operators_allowed_by_default_and_patterns_configurable() {
        let mut rules = GoalSection::default();
        assert!(validate_goal("Find AI news - 2024", &rules).is_ok());

        rules.math_patterns.push("+".to_string());
        assert!(validate_goal("Research C+ grading", &rules).is_err());

        rules.code_patterns.clear();
        rules.math_patterns.clear();
        assert!(validate_goal("Explain how to debug Rust", &rules).is_ok());
    }
}
