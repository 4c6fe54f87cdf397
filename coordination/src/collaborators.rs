//! Narrow trait contracts standing in for the out-of-scope external
//! collaborators: agent subprocess invocation, judge evaluation, and report
//! rendering. This crate ships no production implementation of any of them
//! — callers (the CLI binary) supply their own.

use crate::error::HarnessError;
use crate::ids::{RunNumber, SubtestId, TierId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a collaborator needs to know about the run it's operating on.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub experiment_id: String,
    pub tier: TierId,
    pub subtest: SubtestId,
    pub run: RunNumber,
    pub worktree_path: PathBuf,
    pub model: String,
    pub timeout_seconds: u64,
}

/// The result of an agent subprocess invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub diff: Option<String>,
}

/// The result of a judge invocation scoring an `AgentOutcome`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeOutcome {
    pub judge_passed: bool,
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub rationale: Option<String>,
}

/// Aggregate shape a `ReportRenderer` consumes. Aggregation formulas
/// themselves are out of scope; this crate only defines the structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub experiment_id: String,
    pub tiers: Vec<String>,
    pub total_runs: usize,
    pub passed_runs: usize,
    pub failed_runs: usize,
}

/// Shells out to a coding-agent CLI and reports what happened. Production
/// implementations live outside this crate.
pub trait AgentRunner {
    fn run(&self, ctx: &RunContext) -> Result<AgentOutcome, HarnessError>;
}

/// Scores an agent's output against a rubric. Prompt construction and
/// response parsing are out of scope.
pub trait JudgeEvaluator {
    fn evaluate(&self, ctx: &RunContext, outcome: &AgentOutcome) -> Result<JudgeOutcome, HarnessError>;
}

/// Renders a finished experiment's summary as markdown/JSON/etc. Rendering
/// formulas are out of scope; only the `ExperimentSummary` shape is defined
/// here.
pub trait ReportRenderer {
    fn render(&self, summary: &ExperimentSummary) -> Result<String, HarnessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAgent;
    impl AgentRunner for EchoAgent {
        fn run(&self, ctx: &RunContext) -> Result<AgentOutcome, HarnessError> {
            Ok(AgentOutcome {
                exit_code: 0,
                stdout: format!("ran {}", ctx.run),
                stderr: String::new(),
                diff: None,
            })
        }
    }

    #[test]
    fn trait_object_is_callable() {
        let agent: Box<dyn AgentRunner> = Box::new(EchoAgent);
        let ctx = RunContext {
            experiment_id: "test-017".into(),
            tier: TierId::new("T0"),
            subtest: SubtestId::new("00"),
            run: RunNumber::new(1),
            worktree_path: PathBuf::from("/tmp/run_1"),
            model: "claude-x".into(),
            timeout_seconds: 60,
        };
        let outcome = agent.run(&ctx).unwrap();
        assert_eq!(outcome.stdout, "ran 1");
    }
}
