//! The durable per-run result record (`run_result.json`) and the `repair`
//! reconstruction of `completed_runs` from it.

use crate::checkpoint::CompletedRunStatus;
use crate::error::HarnessResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    Passed,
    Failed,
}

impl From<RunVerdict> for CompletedRunStatus {
    fn from(v: RunVerdict) -> Self {
        match v {
            RunVerdict::Passed => CompletedRunStatus::Passed,
            RunVerdict::Failed => CompletedRunStatus::Failed,
        }
    }
}

/// The durable record written to `runs/{tier}/{subtest}/run_{NN}/run_result.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub judge_passed: bool,
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub cost_usd: Option<f64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl RunResult {
    pub fn verdict(&self) -> RunVerdict {
        if self.judge_passed {
            RunVerdict::Passed
        } else {
            RunVerdict::Failed
        }
    }

    pub fn load(path: &Path) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// One run's repaired outcome, or a reason it couldn't be read.
pub enum RepairedRun {
    Ok { tier: String, subtest: String, run: u32, status: CompletedRunStatus },
    Unreadable { path: std::path::PathBuf, reason: String },
}

/// Walk `{experiment_dir}/runs/{tier}/{subtest}/run_{NN}/run_result.json`
/// and reconstruct a `completed_runs` entry for each readable file. Matches
/// `repair`'s contract: unreadable files are reported as warnings, not
/// aborting errors.
pub fn repair_completed_runs(experiment_dir: &Path) -> Vec<RepairedRun> {
    let runs_dir = experiment_dir.join("runs");
    let mut out = Vec::new();

    let Ok(tier_dirs) = std::fs::read_dir(&runs_dir) else {
        return out;
    };
    for tier_entry in tier_dirs.flatten() {
        let tier_path = tier_entry.path();
        if !tier_path.is_dir() {
            continue;
        }
        let tier = tier_entry.file_name().to_string_lossy().to_string();

        let Ok(subtest_dirs) = std::fs::read_dir(&tier_path) else {
            continue;
        };
        for subtest_entry in subtest_dirs.flatten() {
            let subtest_path = subtest_entry.path();
            if !subtest_path.is_dir() {
                continue;
            }
            let subtest = subtest_entry.file_name().to_string_lossy().to_string();

            let Ok(run_dirs) = std::fs::read_dir(&subtest_path) else {
                continue;
            };
            for run_entry in run_dirs.flatten() {
                let run_path = run_entry.path();
                if !run_path.is_dir() {
                    continue;
                }
                let name = run_entry.file_name().to_string_lossy().to_string();
                let Some(run_num) = name.strip_prefix("run_").and_then(|n| n.parse::<u32>().ok()) else {
                    continue;
                };

                let result_path = run_path.join("run_result.json");
                match RunResult::load(&result_path) {
                    Ok(result) => out.push(RepairedRun::Ok {
                        tier: tier.clone(),
                        subtest: subtest.clone(),
                        run: run_num,
                        status: result.verdict().into(),
                    }),
                    Err(e) => out.push(RepairedRun::Unreadable {
                        path: result_path,
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn verdict_maps_judge_passed() {
        let passed = RunResult {
            judge_passed: true,
            score: Some(0.9),
            grade: Some("A".into()),
            cost_usd: None,
            input_tokens: None,
            output_tokens: None,
        };
        assert_eq!(passed.verdict(), RunVerdict::Passed);
        assert_eq!(CompletedRunStatus::from(passed.verdict()), CompletedRunStatus::Passed);
    }

    #[test]
    fn repair_reconstructs_from_run_result_json() {
        let dir = tempdir().unwrap();
        let run_dir = dir.path().join("runs").join("T0").join("00").join("run_1");
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(
            run_dir.join("run_result.json"),
            r#"{"judge_passed": true, "score": 1.0, "grade": "A"}"#,
        )
        .unwrap();

        let repaired = repair_completed_runs(dir.path());
        assert_eq!(repaired.len(), 1);
        match &repaired[0] {
            RepairedRun::Ok { tier, subtest, run, status } => {
                assert_eq!(tier, "T0");
                assert_eq!(subtest, "00");
                assert_eq!(*run, 1);
                assert_eq!(*status, CompletedRunStatus::Passed);
            }
            RepairedRun::Unreadable { .. } => panic!("expected Ok"),
        }
    }

    #[test]
    fn repair_reports_unreadable_without_aborting() {
        let dir = tempdir().unwrap();
        let run_dir = dir.path().join("runs").join("T0").join("00").join("run_1");
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(run_dir.join("run_result.json"), "not json").unwrap();

        let repaired = repair_completed_runs(dir.path());
        assert_eq!(repaired.len(), 1);
        assert!(matches!(repaired[0], RepairedRun::Unreadable { .. }));
    }
}
