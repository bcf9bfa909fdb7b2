//! 计划执行器：驱动计划跑完
//!
//! 状态机 Pending → Running → Completed。每一步：用执行上下文解析参数中的引用（未命中则原文透传）
//! → 调用工具执行器 → 成功则写入 last_result / step_N_result / last_<tool>_result，失败则记入 failed_steps。
//! 单步失败不终止循环（尽力完成而非快速失败）。处理步数受 max_steps 硬上限约束，与计划长度无关。
//! 最终答案取最后一个成功步骤的输出；没有成功步骤时给出说明并附上各失败步骤的错误信息。

use std::time::Instant;

use serde::Serialize;

use crate::memory::context::{step_key, tool_key, ExecutionContext, LAST_RESULT};
use crate::plan::{Plan, Step};
use crate::tools::{ToolInvoker, ToolOutcome};

pub const NO_PLAN_ANSWER: &str = "No plan produced: the planning model returned no recognizable steps. \
Try rephrasing the goal, e.g. 'Find information about <topic>'.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    Running,
    Completed,
}

/// 运行结束方式（不是错误）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// 计划中的全部步骤都已处理（不论成败）
    AllStepsProcessed,
    /// 计划为空
    NoPlan,
    /// 触及步数上限，其余步骤未执行
    StepLimitReached { limit: usize, skipped: usize },
}

/// 步骤与其输出（成功时）或错误信息（失败时）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub output: String,
}

/// 单步诊断信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepTrace {
    pub ordinal: usize,
    pub tool: String,
    pub argument: String,
    pub resolved_argument: String,
    pub unresolved_references: Vec<String>,
    pub outcome: ToolOutcome,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub succeeded_steps: Vec<StepRecord>,
    pub failed_steps: Vec<StepRecord>,
    pub final_answer: String,
    pub termination: Termination,
    pub trace: Vec<StepTrace>,
}

impl ExecutionResult {
    pub fn steps_processed(&self) -> usize {
        self.trace.len()
    }
}

/// 计划执行器：借用工具执行器，每次 run 使用独立的执行上下文
pub struct PlanExecutor<'a> {
    invoker: &'a ToolInvoker,
    max_steps: usize,
    state: ExecutionState,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(invoker: &'a ToolInvoker, max_steps: usize) -> Self {
        Self {
            invoker,
            max_steps,
            state: ExecutionState::Pending,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub async fn run(&mut self, plan: &Plan) -> ExecutionResult {
        let mut ctx = ExecutionContext::new();
        self.run_with_context(plan, &mut ctx).await
    }

    /// 与 run 相同，但由调用方提供上下文（便于运行后检查中间结果）
    pub async fn run_with_context(
        &mut self,
        plan: &Plan,
        ctx: &mut ExecutionContext,
    ) -> ExecutionResult {
        self.state = ExecutionState::Running;
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut trace = Vec::new();
        // 上限为 0 时计划在解析阶段已被截空，此时结局是触及上限而不是没有计划
        let mut termination = if self.max_steps == 0 {
            Termination::StepLimitReached {
                limit: 0,
                skipped: plan.len(),
            }
        } else if plan.is_empty() {
            Termination::NoPlan
        } else {
            Termination::AllStepsProcessed
        };

        for (processed, step) in plan.iter().enumerate() {
            if processed >= self.max_steps {
                let skipped = plan.len() - processed;
                tracing::warn!(limit = self.max_steps, skipped, "step limit reached");
                termination = Termination::StepLimitReached {
                    limit: self.max_steps,
                    skipped,
                };
                break;
            }

            let resolved = step.resolve_argument(ctx);
            if !resolved.unresolved.is_empty() {
                tracing::debug!(
                    step = step.ordinal,
                    missing = ?resolved.unresolved,
                    "unresolved context references passed through"
                );
            }

            tracing::info!(step = step.ordinal, total = plan.len(), tool = %step.tool, "executing step");
            let start = Instant::now();
            let outcome = self.invoker.invoke(&step.tool, &resolved.text).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match &outcome {
                ToolOutcome::Ok(output) => {
                    ctx.store(LAST_RESULT, output.as_str(), step.ordinal);
                    ctx.store(step_key(step.ordinal), output.as_str(), step.ordinal);
                    ctx.store(tool_key(&step.tool), output.as_str(), step.ordinal);
                    succeeded.push(StepRecord {
                        step: step.clone(),
                        output: output.clone(),
                    });
                }
                ToolOutcome::Error(message) => {
                    tracing::warn!(step = step.ordinal, tool = %step.tool, error = %message, "step failed");
                    failed.push(StepRecord {
                        step: step.clone(),
                        output: message.clone(),
                    });
                }
            }

            trace.push(StepTrace {
                ordinal: step.ordinal,
                tool: step.tool.clone(),
                argument: step.argument.clone(),
                resolved_argument: resolved.text,
                unresolved_references: resolved.unresolved,
                outcome,
                duration_ms,
            });
        }

        self.state = ExecutionState::Completed;
        let final_answer = synthesize_answer(&succeeded, &failed, &termination);
        tracing::info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            termination = ?termination,
            "execution complete"
        );

        ExecutionResult {
            succeeded_steps: succeeded,
            failed_steps: failed,
            final_answer,
            termination,
            trace,
        }
    }
}

fn synthesize_answer(
    succeeded: &[StepRecord],
    failed: &[StepRecord],
    termination: &Termination,
) -> String {
    if let Some(last) = succeeded.last() {
        return last.output.clone();
    }
    if *termination == Termination::NoPlan {
        return NO_PLAN_ANSWER.to_string();
    }

    let mut answer = String::from("Unable to produce a result.");
    if failed.is_empty() {
        if let Termination::StepLimitReached { limit, .. } = termination {
            answer.push_str(&format!(" No steps were executed (step limit {limit})."));
        }
        return answer;
    }
    answer.push_str(" Failed steps:");
    for r in failed {
        answer.push_str(&format!(
            "\n- Step {} ({}): {}",
            r.step.ordinal, r.step.tool, r.output
        ));
    }
    answer
}
