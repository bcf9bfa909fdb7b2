//! Headless Agent 运行时
//!
//! Agent::run(goal, max_steps) 是对外入口：调用 Planner 得到计划，再交给 PlanExecutor 执行。
//! 每次运行各自持有全新的执行上下文，多次运行之间没有共享可变状态。

pub mod executor;

use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::plan::{PlanOutput, Planner};
use crate::tools::ToolInvoker;

pub use executor::{
    ExecutionResult, ExecutionState, PlanExecutor, StepRecord, StepTrace, Termination,
    NO_PLAN_ANSWER,
};

/// 一次完整运行的产物：规划输出、执行结果、两阶段耗时与本次运行消耗的 token
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub planning: PlanOutput,
    pub result: ExecutionResult,
    pub planning_ms: u64,
    pub execution_ms: u64,
    /// (prompt_tokens, completion_tokens, total_tokens)，含规划与 LLM 摘要
    pub token_usage: (u64, u64, u64),
}

pub struct Agent {
    planner: Planner,
    invoker: ToolInvoker,
    default_max_steps: usize,
}

impl Agent {
    pub fn new(planner: Planner, invoker: ToolInvoker, default_max_steps: usize) -> Self {
        Self {
            planner,
            invoker,
            default_max_steps,
        }
    }

    pub fn default_max_steps(&self) -> usize {
        self.default_max_steps
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn invoker(&self) -> &ToolInvoker {
        &self.invoker
    }

    pub async fn run(&self, goal: &str, max_steps: usize) -> ExecutionResult {
        self.run_detailed(goal, max_steps).await.result
    }

    /// 规划 + 执行，并返回规划原文与耗时，供 --explain / --verbose 展示
    pub async fn run_detailed(&self, goal: &str, max_steps: usize) -> AgentRun {
        let span = tracing::info_span!("run", run_id = %Uuid::new_v4());
        async move {
            let usage_before = self.planner.token_usage();
            let start = Instant::now();
            let planning = self.planner.plan(goal, max_steps).await;
            let planning_ms = start.elapsed().as_millis() as u64;

            let start = Instant::now();
            let result = PlanExecutor::new(&self.invoker, max_steps)
                .run(&planning.plan)
                .await;
            let execution_ms = start.elapsed().as_millis() as u64;

            let usage_after = self.planner.token_usage();
            let token_usage = (
                usage_after.0.saturating_sub(usage_before.0),
                usage_after.1.saturating_sub(usage_before.1),
                usage_after.2.saturating_sub(usage_before.2),
            );

            AgentRun {
                planning,
                result,
                planning_ms,
                execution_ms,
                token_usage,
            }
        }
        .instrument(span)
        .await
    }
}
