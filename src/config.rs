//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENTIC__*` 覆盖（双下划线表示嵌套，如 `AGENTIC__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub goal: GoalSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [planner] 段：步数上限、空计划时是否使用默认计划、Prompt 模板覆盖
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSection {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// 解析结果为空（或 LLM 调用失败）时退回 search_web → summarize_text 两步计划
    #[serde(default)]
    pub fallback_plan: bool,
    /// 自定义规划 Prompt，支持 {goal} / {tools} / {query} 占位
    pub prompt_template: Option<String>,
}

fn default_max_steps() -> usize {
    10
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            fallback_plan: false,
            prompt_template: None,
        }
    }
}

/// [goal] 段：目标长度范围、禁用字符，以及本工具无法处理的目标（计算 / 写代码）的匹配词
#[derive(Debug, Clone, Deserialize)]
pub struct GoalSection {
    #[serde(default = "default_goal_min_len")]
    pub min_len: usize,
    #[serde(default = "default_goal_max_len")]
    pub max_len: usize,
    #[serde(default = "default_forbidden_chars")]
    pub forbidden_chars: Vec<char>,
    #[serde(default = "default_math_patterns")]
    pub math_patterns: Vec<String>,
    #[serde(default = "default_code_patterns")]
    pub code_patterns: Vec<String>,
}

fn default_goal_min_len() -> usize {
    5
}

fn default_goal_max_len() -> usize {
    200
}

fn default_forbidden_chars() -> Vec<char> {
    vec!['<', '>', '&', '|', ';', '`']
}

fn default_math_patterns() -> Vec<String> {
    ["calculate", "compute", "solve", "math"]
        .map(String::from)
        .to_vec()
}

fn default_code_patterns() -> Vec<String> {
    [
        "write code",
        "write python",
        "write java",
        "implement",
        "debug",
        "fix bug",
        "program",
    ]
    .map(String::from)
    .to_vec()
}

impl Default for GoalSection {
    fn default() -> Self {
        Self {
            min_len: default_goal_min_len(),
            max_len: default_goal_max_len(),
            forbidden_chars: default_forbidden_chars(),
            math_patterns: default_math_patterns(),
            code_patterns: default_code_patterns(),
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

/// [tools] 段：单次工具调用超时、search / summarize 子配置
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub summarize: SummarizeSection,
}

fn default_tool_timeout_secs() -> u64 {
    30
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            search: SearchSection::default(),
            summarize: SummarizeSection::default(),
        }
    }
}

/// [tools.search] 段：Instant Answer 端点、HTTP 超时、保留的相关主题条数
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_related_topics")]
    pub max_related_topics: usize,
}

fn default_search_endpoint() -> String {
    "https://api.duckduckgo.com/".to_string()
}

fn default_search_timeout_secs() -> u64 {
    10
}

fn default_max_related_topics() -> usize {
    3
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            timeout_secs: default_search_timeout_secs(),
            max_related_topics: default_max_related_topics(),
        }
    }
}

/// [tools.summarize] 段：输入截断长度（字符）、摘要长度范围（词）
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeSection {
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_max_output_len")]
    pub max_output_len: usize,
    #[serde(default = "default_min_output_len")]
    pub min_output_len: usize,
}

fn default_max_input_chars() -> usize {
    800
}

fn default_max_output_len() -> usize {
    100
}

fn default_min_output_len() -> usize {
    30
}

impl Default for SummarizeSection {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            max_output_len: default_max_output_len(),
            min_output_len: default_min_output_len(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 AGENTIC__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 则追加该文件（可覆盖前面的键）；显式给出的文件不存在时报错
/// 3. 最后叠加环境变量 AGENTIC__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if !path.exists() {
            return Err(config::ConfigError::NotFound(path.display().to_string()));
        }
        builder = builder.add_source(config::File::from(path.clone()).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AGENTIC")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
