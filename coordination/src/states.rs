//! The four nested state enumerations and their ordered sequences.
//!
//! Each enum's `sequence()` gives the left-to-right order transitions move
//! through; `index()` is that state's position, used by the reset cascade to
//! decide "at or past". Terminal failure/rate-limit states are not part of
//! the forward sequence — they sort past every in-sequence state so that a
//! rewind targeting any earlier state still sweeps them up.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

macro_rules! state_enum {
    ($name:ident { $($variant:ident => $json:literal),+ $(,)? }, sequence = [$($seq:ident),+ $(,)?], terminal = [$($term:ident),+ $(,)?] $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const SEQUENCE: &'static [$name] = &[$($name::$seq),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $json),+
                }
            }

            pub fn from_str_lenient(s: &str) -> Self {
                match s {
                    $($json => $name::$variant,)+
                    _ => $name::Pending,
                }
            }

            /// Position in the forward sequence, or `usize::MAX` for
            /// out-of-band terminal states (FAILED, RATE_LIMITED), which
            /// sort past every in-sequence state.
            pub fn index(&self) -> usize {
                Self::SEQUENCE.iter().position(|s| s == self).unwrap_or(usize::MAX)
            }

            pub fn is_terminal(&self) -> bool {
                matches!(self, $($name::$term)|+)
            }

            /// True if `self` is at or past `other` in the forward sequence
            /// (terminal non-sequence states count as "past" everything).
            pub fn at_or_past(&self, other: &Self) -> bool {
                self.index() >= other.index()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::Pending
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from_str_lenient(&s))
            }
        }
    };
}

state_enum!(
    RunState {
        Pending => "pending",
        DirStructureCreated => "dir_structure_created",
        WorktreeCreated => "worktree_created",
        SymlinksApplied => "symlinks_applied",
        ConfigCommitted => "config_committed",
        BaselineCaptured => "baseline_captured",
        PromptWritten => "prompt_written",
        ReplayGenerated => "replay_generated",
        AgentComplete => "agent_complete",
        DiffCaptured => "diff_captured",
        JudgePromptBuilt => "judge_prompt_built",
        JudgeComplete => "judge_complete",
        RunFinalized => "run_finalized",
        Checkpointed => "checkpointed",
        WorktreeCleaned => "worktree_cleaned",
        Failed => "failed",
        RateLimited => "rate_limited",
    },
    sequence = [
        Pending, DirStructureCreated, WorktreeCreated, SymlinksApplied, ConfigCommitted,
        BaselineCaptured, PromptWritten, ReplayGenerated, AgentComplete, DiffCaptured,
        JudgePromptBuilt, JudgeComplete, RunFinalized, Checkpointed, WorktreeCleaned,
    ],
    terminal = [WorktreeCleaned, Failed, RateLimited],
);

/// Memory class tag on a RunState transition, selecting which semaphore gates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryClass {
    Low,
    Med,
    High,
}

/// The memory class of the transition whose *action* produces `to`, i.e. the
/// transition `from -> to`. Only worktree creation, agent execution and judge
/// execution are `High`; everything else defaults to `Low` except the two
/// `Med`-tagged capture steps.
pub fn run_transition_memory_class(to: RunState) -> MemoryClass {
    match to {
        RunState::DirStructureCreated | RunState::ReplayGenerated | RunState::JudgePromptBuilt => {
            MemoryClass::High
        }
        RunState::BaselineCaptured | RunState::DiffCaptured => MemoryClass::Med,
        _ => MemoryClass::Low,
    }
}

state_enum!(
    SubtestState {
        Pending => "pending",
        RunsInProgress => "runs_in_progress",
        RunsComplete => "runs_complete",
        Aggregated => "aggregated",
        Failed => "failed",
    },
    sequence = [Pending, RunsInProgress, RunsComplete, Aggregated],
    terminal = [Aggregated, Failed],
);

state_enum!(
    TierState {
        Pending => "pending",
        ConfigLoaded => "config_loaded",
        SubtestsRunning => "subtests_running",
        SubtestsComplete => "subtests_complete",
        BestSelected => "best_selected",
        ReportsGenerated => "reports_generated",
        Complete => "complete",
        Failed => "failed",
    },
    sequence = [
        Pending, ConfigLoaded, SubtestsRunning, SubtestsComplete, BestSelected,
        ReportsGenerated, Complete,
    ],
    terminal = [Complete, Failed],
);

state_enum!(
    ExperimentState {
        Initializing => "initializing",
        DirCreated => "dir_created",
        RepoCloned => "repo_cloned",
        TiersRunning => "tiers_running",
        TiersComplete => "tiers_complete",
        ReportsGenerated => "reports_generated",
        Complete => "complete",
        Interrupted => "interrupted",
        Failed => "failed",
    },
    sequence = [
        Initializing, DirCreated, RepoCloned, TiersRunning, TiersComplete,
        ReportsGenerated, Complete,
    ],
    terminal = [Complete, Interrupted, Failed],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_state_sequence_order() {
        assert!(RunState::WorktreeCreated.index() > RunState::Pending.index());
        assert!(RunState::WorktreeCleaned.is_terminal());
    }

    #[test]
    fn failed_sorts_past_everything() {
        assert!(RunState::Failed.at_or_past(&RunState::ReplayGenerated));
    }

    #[test]
    fn unknown_string_defaults_to_pending() {
        assert_eq!(RunState::from_str_lenient("some_future_state"), RunState::Pending);
    }

    #[test]
    fn display_matches_json_form() {
        assert_eq!(SubtestState::RunsInProgress.to_string(), "runs_in_progress");
    }

    #[test]
    fn memory_class_tags() {
        assert_eq!(run_transition_memory_class(RunState::DirStructureCreated), MemoryClass::High);
        assert_eq!(run_transition_memory_class(RunState::ReplayGenerated), MemoryClass::High);
        assert_eq!(run_transition_memory_class(RunState::JudgePromptBuilt), MemoryClass::High);
        assert_eq!(run_transition_memory_class(RunState::BaselineCaptured), MemoryClass::Med);
        assert_eq!(run_transition_memory_class(RunState::Checkpointed), MemoryClass::Low);
    }

    #[test]
    fn serde_round_trip_via_json() {
        let s = serde_json::to_string(&TierState::SubtestsRunning).unwrap();
        assert_eq!(s, "\"subtests_running\"");
        let back: TierState = serde_json::from_str(&s).unwrap();
        assert_eq!(back, TierState::SubtestsRunning);
    }

    #[test]
    fn at_or_past_self() {
        assert!(ExperimentState::TiersRunning.at_or_past(&ExperimentState::TiersRunning));
        assert!(!ExperimentState::DirCreated.at_or_past(&ExperimentState::TiersRunning));
    }
}
