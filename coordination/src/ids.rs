//! Typed identifiers addressing the experiment → tier → subtest → run hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tier identifier, e.g. `T0`, `T1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(pub String);

impl TierId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TierId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TierId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A subtest identifier within a tier, e.g. `00`, `01-basic`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtestId(pub String);

impl SubtestId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubtestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubtestId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SubtestId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A 1-based run number within a subtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunNumber(pub u32);

impl RunNumber {
    pub fn new(n: u32) -> Self {
        Self(n)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RunNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RunNumber {
    fn from(n: u32) -> Self {
        Self::new(n)
    }
}
