//! Stand-in collaborator implementations.
//!
//! Shelling out to a real coding-agent CLI and scoring its output against a
//! rubric are both out of scope here; these implementations exist so the
//! orchestration loop can be driven and tested end to end without either one
//! present. A production deployment swaps these for real ones behind the
//! same trait.

use coordination::collaborators::ExperimentSummary;
use coordination::{AgentOutcome, AgentRunner, HarnessError, JudgeEvaluator, JudgeOutcome, ReportRenderer, RunContext};

/// Reports the run as immediately complete with no output. Useful for
/// exercising checkpoint/state-machine wiring without a real agent.
pub struct NoopAgentRunner;

impl AgentRunner for NoopAgentRunner {
    fn run(&self, ctx: &RunContext) -> Result<AgentOutcome, HarnessError> {
        Ok(AgentOutcome {
            exit_code: 0,
            stdout: format!("noop agent run for {}/{}/{}", ctx.tier, ctx.subtest, ctx.run),
            stderr: String::new(),
            diff: None,
        })
    }
}

/// Passes every run unconditionally. Prompt construction and response
/// parsing against a real judge model are out of scope.
pub struct NoopJudgeEvaluator;

impl JudgeEvaluator for NoopJudgeEvaluator {
    fn evaluate(&self, _ctx: &RunContext, _outcome: &AgentOutcome) -> Result<JudgeOutcome, HarnessError> {
        Ok(JudgeOutcome {
            judge_passed: true,
            score: Some(1.0),
            grade: Some("A".to_string()),
            rationale: None,
        })
    }
}

/// Minimal markdown renderer for the experiment summary.
pub struct MarkdownReportRenderer;

impl ReportRenderer for MarkdownReportRenderer {
    fn render(&self, summary: &ExperimentSummary) -> Result<String, HarnessError> {
        Ok(format!(
            "# Experiment {}\n\n- Tiers: {}\n- Total runs: {}\n- Passed: {}\n- Failed: {}\n",
            summary.experiment_id,
            summary.tiers.join(", "),
            summary.total_runs,
            summary.passed_runs,
            summary.failed_runs,
        ))
    }
}
