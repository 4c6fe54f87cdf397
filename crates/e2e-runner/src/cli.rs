//! CLI surface for the `e2e-harness` binary: two subcommands, `run` and
//! `repair`, wired straight onto the options the orchestrator and checkpoint
//! engine understand.

use clap::{Parser, Subcommand, ValueEnum};
use coordination::checkpoint::CompletedRunStatus;
use coordination::config::ThinkingLevel;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "e2e-harness")]
#[command(author, version, about = "Resumable agent-evaluation harness", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run (or resume) one or more experiments.
    Run(RunArgs),
    /// Rebuild `completed_runs` from on-disk `run_result.json` files.
    Repair(RepairArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingArg {
    None,
    Low,
    Med,
    High,
}

impl From<ThinkingArg> for ThinkingLevel {
    fn from(t: ThinkingArg) -> Self {
        match t {
            ThinkingArg::None => ThinkingLevel::None,
            ThinkingArg::Low => ThinkingLevel::Low,
            ThinkingArg::Med => ThinkingLevel::Med,
            ThinkingArg::High => ThinkingLevel::High,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatusArg {
    Passed,
    Failed,
    AgentComplete,
}

impl From<FilterStatusArg> for CompletedRunStatus {
    fn from(s: FilterStatusArg) -> Self {
        match s {
            FilterStatusArg::Passed => CompletedRunStatus::Passed,
            FilterStatusArg::Failed => CompletedRunStatus::Failed,
            FilterStatusArg::AgentComplete => CompletedRunStatus::AgentComplete,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// A test directory (containing test.yaml), a parent of test-* dirs
    /// (batch mode), or a single .yaml file. Repeatable.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Vec<PathBuf>,

    /// Where the checkpoint, pid file, clone and run artifacts live.
    /// Defaults to `./e2e-runs/{experiment_id}`.
    #[arg(long = "experiment-dir", value_name = "PATH")]
    pub experiment_dir: Option<PathBuf>,

    #[arg(long)]
    pub repo: Option<String>,
    #[arg(long)]
    pub commit: Option<String>,

    #[arg(long = "tiers", num_args = 1..)]
    pub tiers: Vec<String>,

    #[arg(long)]
    pub runs: Option<u32>,

    #[arg(long)]
    pub parallel: Option<usize>,
    #[arg(long = "parallel-high")]
    pub parallel_high: Option<usize>,
    #[arg(long = "parallel-med")]
    pub parallel_med: Option<usize>,
    #[arg(long = "parallel-low")]
    pub parallel_low: Option<usize>,

    #[arg(long)]
    pub model: Option<String>,
    #[arg(long = "judge-model")]
    pub judge_model: Option<String>,
    #[arg(long = "add-judge")]
    pub add_judge: Vec<String>,

    /// Stop inclusive of this run state; never marks FAILED.
    #[arg(long)]
    pub until: Option<String>,
    #[arg(long = "until-tier")]
    pub until_tier: Option<String>,
    #[arg(long = "until-experiment")]
    pub until_experiment: Option<String>,

    /// Rewind everything at or past this run state; cascades up.
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long = "from-tier")]
    pub from_tier: Option<String>,
    #[arg(long = "from-experiment")]
    pub from_experiment: Option<String>,

    #[arg(long = "filter-tier")]
    pub filter_tier: Vec<String>,
    #[arg(long = "filter-subtest")]
    pub filter_subtest: Vec<String>,
    #[arg(long = "filter-run")]
    pub filter_run: Vec<u32>,
    #[arg(long = "filter-status", value_enum)]
    pub filter_status: Vec<FilterStatusArg>,

    /// Ignore any existing checkpoint and start over.
    #[arg(long)]
    pub fresh: bool,

    /// Shorthand for `--from pending --filter-status failed`.
    #[arg(long = "retry-errors")]
    pub retry_errors: bool,

    /// In batch mode, restrict to these experiment ids.
    #[arg(long = "tests")]
    pub tests: Vec<String>,

    #[arg(long = "skip-judge-validation")]
    pub skip_judge_validation: bool,

    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, value_enum)]
    pub thinking: Option<ThinkingArg>,
}

#[derive(Parser, Debug, Clone)]
pub struct RepairArgs {
    pub checkpoint_path: PathBuf,
}
