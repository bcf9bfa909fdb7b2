//! Agentic Planner 命令行入口
//!
//! 校验目标 → 规划 → 执行 → 输出最终答案。日志写 stderr，答案写 stdout。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use agentic_planner::core::{create_agent_builder, validate_goal};
use agentic_planner::observability;

#[derive(Parser)]
#[command(name = "agentic-planner")]
#[command(about = "Break a goal down into tool steps (web search + summarization) and run them", long_about = None)]
#[command(after_help = "GOOD EXAMPLES:\n  \"Find information about quantum computing\"\n  \"Research artificial intelligence trends\"\n  \"Explain machine learning basics\"")]
struct Cli {
    /// The goal you want to achieve
    goal: String,

    /// Maximum number of steps to execute (defaults to [planner].max_steps)
    #[arg(long)]
    max_steps: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Show the raw planning output and the parsed plan
    #[arg(long)]
    explain: bool,

    /// Print the per-step trace as JSON
    #[arg(long)]
    trace: bool,

    /// Extra config file layered over config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    observability::init(cli.verbose);

    let builder = create_agent_builder(cli.config.clone()).context("Failed to load config")?;

    let goal = match validate_goal(&cli.goal, &builder.config().goal) {
        Ok(goal) => goal,
        Err(e) => {
            eprintln!("ERROR: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("HELP: {hint}");
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let max_steps = cli.max_steps.unwrap_or(builder.config().planner.max_steps);
    let agent = builder.build();
    let run = agent.run_detailed(&goal, max_steps).await;

    if cli.explain {
        println!("PLANNING OUTPUT:\n{}\n", run.planning.raw_text.trim());
        if run.planning.used_fallback {
            println!("(no steps recognized, using default plan)");
        }
        println!("PLAN ({} steps):", run.planning.plan.len());
        for step in &run.planning.plan {
            println!("  Step {}: {}({})", step.ordinal, step.tool, step.argument);
        }
        println!();
    }

    if cli.trace {
        let trace = serde_json::to_string_pretty(&run.result.trace).context("Failed to encode trace")?;
        println!("TRACE:\n{trace}\n");
    }

    if cli.verbose || cli.explain {
        let total = run.planning_ms + run.execution_ms;
        println!(
            "TIMING: planning {}ms, execution {}ms, total {}ms",
            run.planning_ms, run.execution_ms, total
        );
        let (prompt, completion, tokens) = run.token_usage;
        println!("TOKENS: prompt {prompt}, completion {completion}, total {tokens}\n");
    }

    println!("{}", "=".repeat(50));
    println!("FINAL RESULT:");
    println!("{}", "=".repeat(50));
    println!("{}", run.result.final_answer);

    Ok(ExitCode::SUCCESS)
}
