//! Experiment configuration: the persistent/ephemeral split that
//! `ComputeConfigHash` depends on.
//!
//! Persistent fields describe *what* is being tested (repo, tiers, models);
//! ephemeral fields describe *how much of it to run this invocation*
//! (parallelism, until-targets, tier subset). Only the persistent view is
//! hashed, so resuming with a wider `--tiers`/`--max-subtests` never
//! produces a `ConfigMismatch`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields the config loader may have set ephemerally from CLI flags on this
/// particular invocation. These are excluded from config hashing (invariant
/// 2): changing only these must not refuse resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EphemeralOverrides {
    pub parallel_subtests: Option<u32>,
    pub max_subtests: Option<u32>,
    pub until_run_state: Option<String>,
    pub until_tier_state: Option<String>,
    pub until_experiment_state: Option<String>,
    pub tiers_to_run: Option<Vec<String>>,
}

/// A single tier definition: a prompt/config profile the agent is evaluated
/// under (e.g. "no tools", "tools enabled").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierDefinition {
    pub tier_id: String,
    pub prompt_path: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ThinkingLevel {
    None,
    Low,
    Med,
    High,
}

impl Default for ThinkingLevel {
    fn default() -> Self {
        ThinkingLevel::None
    }
}

/// The full experiment configuration, as loaded from `test.yaml`/`test.toml`
/// plus CLI overrides. `persistent_fields()` returns the subset that
/// participates in `config_hash`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentConfig {
    // --- persistent ---
    pub experiment_id: String,
    pub repo: String,
    pub commit: Option<String>,
    pub tiers: Vec<TierDefinition>,
    pub model: String,
    pub judge_model: String,
    #[serde(default)]
    pub extra_judge_models: Vec<String>,
    #[serde(default = "default_runs_per_subtest")]
    pub runs_per_subtest: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub thinking: ThinkingLevel,
    #[serde(default)]
    pub skip_judge_validation: bool,

    // --- ephemeral ---
    #[serde(default)]
    pub ephemeral: EphemeralOverrides,
}

fn default_runs_per_subtest() -> u32 {
    3
}

fn default_timeout_seconds() -> u64 {
    1800
}

impl ExperimentConfig {
    /// Parse from a YAML document (`test.yaml`).
    pub fn from_yaml(s: &str) -> Result<Self, crate::error::HarnessError> {
        serde_yaml::from_str(s).map_err(|e| crate::error::HarnessError::config(e))
    }

    /// Parse from a TOML document (`test.toml`).
    pub fn from_toml(s: &str) -> Result<Self, crate::error::HarnessError> {
        toml::from_str(s).map_err(|e| crate::error::HarnessError::config(e))
    }

    /// A JSON value carrying only the fields that participate in
    /// `config_hash` — every field except the six ephemeral ones.
    pub fn persistent_view(&self) -> serde_json::Value {
        serde_json::json!({
            "experiment_id": self.experiment_id,
            "repo": self.repo,
            "commit": self.commit,
            "tiers": self.tiers,
            "model": self.model,
            "judge_model": self.judge_model,
            "extra_judge_models": self.extra_judge_models,
            "runs_per_subtest": self.runs_per_subtest,
            "timeout_seconds": self.timeout_seconds,
            "thinking": self.thinking,
            "skip_judge_validation": self.skip_judge_validation,
        })
    }

    pub fn tier_ids(&self) -> Vec<String> {
        self.tiers.iter().map(|t| t.tier_id.clone()).collect()
    }
}
