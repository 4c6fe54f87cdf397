//! Coordination — the resumable core of an agent evaluation harness.
//!
//! This crate owns the four tightly coupled subsystems that drive an
//! experiment from an empty directory to a finished report:
//!
//! - [`checkpoint`]: atomic persistence, schema migration, selective reset/cascade.
//! - [`state_machine`]: the four nested state machines (experiment → tier → subtest → run).
//! - [`resume`]: zombie detection, ephemeral CLI restoration, additive tier/subtest expansion.
//! - [`scheduler`]: memory-class semaphores and cooperative cancellation.
//! - [`rate_limit`]: agent/judge rate-limit detection and pause/resume.
//! - [`health`]: the heartbeat thread and zombie predicate.
//! - [`workspace`]: shared-clone, per-run git worktree lifecycle.
//! - [`config`]: experiment configuration, ephemeral-field-aware hashing.
//! - [`collaborators`]: trait contracts for the out-of-scope external collaborators
//!   (agent invocation, judge evaluation, report rendering).
//! - [`results`]: the durable per-run result record and `repair` reconstruction.

#![allow(clippy::uninlined_format_args)]

pub mod checkpoint;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod health;
pub mod ids;
pub mod rate_limit;
pub mod resume;
pub mod results;
pub mod scheduler;
pub mod state_machine;
pub mod states;
pub mod workspace;

pub use checkpoint::{Checkpoint, CheckpointStatus, ExperimentStatus, RateLimitSource};
pub use collaborators::{AgentOutcome, AgentRunner, JudgeEvaluator, JudgeOutcome, ReportRenderer, RunContext};
pub use config::{EphemeralOverrides, ExperimentConfig};
pub use error::{HarnessError, HarnessResult};
pub use health::{is_zombie, HeartbeatThread};
pub use ids::{RunNumber, SubtestId, TierId};
pub use rate_limit::{detect_rate_limit, parse_retry_after, RateLimitError, RateLimitInfo};
pub use resume::ResumeManager;
pub use results::{RunResult, RunVerdict};
pub use scheduler::{MemoryClass, ParallelismScheduler};
pub use state_machine::{
    ExperimentStateMachine, RunStateMachine, SubtestStateMachine, TierStateMachine, UntilHaltError,
};
pub use states::{ExperimentState, RunState, SubtestState, TierState};
pub use workspace::WorkspaceManager;
