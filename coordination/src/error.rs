//! Error taxonomy for the checkpoint engine, state machines, resume manager
//! and workspace lifecycle.
//!
//! Behavioral categories (not just exception classes): each variant maps to
//! one row of the propagation table — some abort the invocation, some are
//! caught and handled by a specific level of the state-machine hierarchy,
//! some are log-only warnings.

use std::fmt;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to write checkpoint to {path}: {message}")]
    CheckpointWriteError { path: String, message: String },

    #[error("checkpoint not found at {path}")]
    CheckpointNotFound { path: String },

    #[error("checkpoint at {path} is not valid JSON: {message}")]
    CheckpointCorrupt { path: String, message: String },

    #[error("checkpoint version {found} cannot be migrated to {current}")]
    IncompatibleVersion { found: String, current: String },

    #[error("config hash mismatch: checkpoint has {checkpoint_hash}, config computes {config_hash}")]
    ConfigMismatch {
        checkpoint_hash: String,
        config_hash: String,
    },

    #[error("shutdown requested")]
    ShutdownInterrupted,

    #[error("rate limit hit ({source}), retry in {retry_after_seconds}s")]
    RateLimit {
        source: String,
        retry_after_seconds: u64,
    },

    #[error("until-state reached during subtest run batch: {state}")]
    UntilHalt { state: String },

    #[error("no transition defined from state {state}")]
    NoTransition { state: String },

    #[error("state {state} is terminal; cannot advance")]
    TerminalState { state: String },

    #[error("action failed for {keys}: {message}")]
    ActionFailed { keys: String, message: String },

    #[error("git {operation} failed: {message}")]
    GitError { operation: String, message: String },

    #[error("workspace error: {message}")]
    WorkspaceError { message: String },

    #[error("config error: {message}")]
    ConfigError { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn checkpoint_write(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::CheckpointWriteError {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn checkpoint_not_found(path: impl Into<String>) -> Self {
        Self::CheckpointNotFound { path: path.into() }
    }

    pub fn checkpoint_corrupt(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::CheckpointCorrupt {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn incompatible_version(found: impl Into<String>, current: impl Into<String>) -> Self {
        Self::IncompatibleVersion {
            found: found.into(),
            current: current.into(),
        }
    }

    pub fn config_mismatch(checkpoint_hash: impl Into<String>, config_hash: impl Into<String>) -> Self {
        Self::ConfigMismatch {
            checkpoint_hash: checkpoint_hash.into(),
            config_hash: config_hash.into(),
        }
    }

    pub fn rate_limit(source: impl Into<String>, retry_after_seconds: u64) -> Self {
        Self::RateLimit {
            source: source.into(),
            retry_after_seconds,
        }
    }

    pub fn until_halt(state: impl Into<String>) -> Self {
        Self::UntilHalt { state: state.into() }
    }

    pub fn no_transition(state: impl Into<String>) -> Self {
        Self::NoTransition { state: state.into() }
    }

    pub fn terminal_state(state: impl Into<String>) -> Self {
        Self::TerminalState { state: state.into() }
    }

    pub fn action_failed(keys: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ActionFailed {
            keys: keys.into(),
            message: message.to_string(),
        }
    }

    pub fn git(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::GitError {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn workspace(message: impl fmt::Display) -> Self {
        Self::WorkspaceError {
            message: message.to_string(),
        }
    }

    pub fn config(message: impl fmt::Display) -> Self {
        Self::ConfigError {
            message: message.to_string(),
        }
    }

    /// Whether the failure is transient and a caller may reasonably retry
    /// (used by `GitManager`'s exponential-backoff loop).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GitError { message, .. } => {
                let m = message.to_lowercase();
                m.contains("lock") || m.contains("timeout") || m.contains("connection") || m.contains("network")
                    || m.contains("could not lock") || m.contains("another git process")
            }
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Whether this error, raised inside a state-machine action, should be
    /// treated as shutdown propagation rather than a generic action failure.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::ShutdownInterrupted)
    }

    pub fn as_rate_limit(&self) -> Option<(&str, u64)> {
        match self {
            Self::RateLimit {
                source,
                retry_after_seconds,
            } => Some((source.as_str(), *retry_after_seconds)),
            _ => None,
        }
    }

    pub fn as_until_halt(&self) -> Option<&str> {
        match self {
            Self::UntilHalt { state } => Some(state.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_error_display() {
        let e = HarnessError::git("fetch", "could not lock ref");
        assert_eq!(e.to_string(), "git fetch failed: could not lock ref");
    }

    #[test]
    fn git_error_is_retryable_on_lock() {
        let e = HarnessError::git("commit", "unable to create '.git/index.lock': File exists");
        assert!(e.is_retryable());
    }

    #[test]
    fn config_error_not_retryable() {
        let e = HarnessError::config("missing field");
        assert!(!e.is_retryable());
    }

    #[test]
    fn io_error_from_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let e: HarnessError = io.into();
        assert!(matches!(e, HarnessError::Io(_)));
    }

    #[test]
    fn rate_limit_extraction() {
        let e = HarnessError::rate_limit("agent", 90);
        assert_eq!(e.as_rate_limit(), Some(("agent", 90)));
    }

    #[test]
    fn until_halt_extraction() {
        let e = HarnessError::until_halt("agent_complete");
        assert_eq!(e.as_until_halt(), Some("agent_complete"));
    }
}
