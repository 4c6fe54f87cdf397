//! Rate-limit detection and wait-time parsing.
//!
//! After every agent/judge subprocess invocation, stdout (parsed as JSON for
//! an `is_error` field) and stderr are scanned for rate-limit indicators.
//! The detected wait is buffered by 1.1x; 60s is used when no duration can
//! be parsed from the message.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const DEFAULT_WAIT_SECONDS: u64 = 60;
const SAFETY_BUFFER: f64 = 1.1;
const DEFAULT_TZ: Tz = chrono_tz::America::Los_Angeles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitSourceKind {
    Agent,
    Judge,
}

impl fmt::Display for RateLimitSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => write!(f, "agent"),
            Self::Judge => write!(f, "judge"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub source: RateLimitSourceKind,
    pub retry_after_seconds: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("rate limit detected from {source}, retry in {retry_after_seconds}s")]
pub struct RateLimitError {
    pub source: RateLimitSourceKind,
    pub retry_after_seconds: u64,
}

const KEYWORDS: &[&str] = &["rate_limit", "ratelimit", "hit your limit", "overloaded", "resets", "429"];

fn retry_after_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)retry-after:?\s*(\d+)").unwrap())
}

fn resets_wall_clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)resets\s+(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)(?:\s*\(([A-Za-z_/]+)\))?").unwrap()
    })
}

/// Scan a (stdout, stderr) pair for rate-limit indicators. `stdout` is
/// checked for a JSON `is_error: true` field before the keyword scan runs
/// over both streams; stderr alone is keyword-scanned regardless.
pub fn detect_rate_limit(source: RateLimitSourceKind, stdout: &str, stderr: &str) -> Option<RateLimitInfo> {
    let json_is_error = serde_json::from_str::<serde_json::Value>(stdout)
        .ok()
        .and_then(|v| v.get("is_error").and_then(|e| e.as_bool()))
        .unwrap_or(false);

    let lower_out = stdout.to_lowercase();
    let lower_err = stderr.to_lowercase();
    let keyword_hit = KEYWORDS.iter().any(|k| lower_out.contains(k) || lower_err.contains(k));

    if !json_is_error && !keyword_hit {
        return None;
    }

    let combined = format!("{stdout}\n{stderr}");
    let wait = parse_retry_after(&combined).unwrap_or(DEFAULT_WAIT_SECONDS);
    let buffered = ((wait as f64) * SAFETY_BUFFER).round() as u64;

    Some(RateLimitInfo {
        source,
        retry_after_seconds: buffered,
    })
}

/// Parse a wait duration in seconds from `Retry-After: <n>` or
/// `resets <time> (<tz>)` forms. The latter computes the next future
/// wall-clock occurrence of the named time in the named (or default)
/// timezone, rolling to the next day if it has already passed today.
pub fn parse_retry_after(message: &str) -> Option<u64> {
    if let Some(caps) = retry_after_re().captures(message) {
        if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) {
            return Some(n);
        }
    }

    if let Some(caps) = resets_wall_clock_re().captures(message) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        let meridiem = caps.get(3)?.as_str().to_lowercase();
        let tz_name = caps.get(4).map(|m| m.as_str());

        let tz: Tz = tz_name.and_then(|n| n.parse().ok()).unwrap_or(DEFAULT_TZ);

        let hour24 = match (hour % 12, meridiem.as_str()) {
            (h, "pm") => h + 12,
            (h, _) => h,
        };

        let now_tz = Utc::now().with_timezone(&tz);
        let target_time = NaiveTime::from_hms_opt(hour24, minute, 0)?;
        let mut target_date = now_tz.date_naive();
        let mut target = tz.from_local_datetime(&target_date.and_time(target_time)).single()?;

        if target <= now_tz {
            target_date = target_date.succ_opt()?;
            target = tz.from_local_datetime(&target_date.and_time(target_time)).single()?;
        }

        let seconds = target.with_timezone(&Utc).signed_duration_since(Utc::now()).num_seconds();
        return Some(seconds.max(0) as u64);
    }

    None
}

/// Convenience used by tests/callers that already have a target instant.
pub fn seconds_until(target: DateTime<Utc>) -> u64 {
    target.signed_duration_since(Utc::now()).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_json_is_error_with_keyword() {
        let stdout = r#"{"is_error": true, "result": "Rate limit hit, resets at 4pm (America/Los_Angeles)"}"#;
        let info = detect_rate_limit(RateLimitSourceKind::Agent, stdout, "").unwrap();
        assert_eq!(info.source, RateLimitSourceKind::Agent);
        assert!(info.retry_after_seconds > 0);
    }

    #[test]
    fn detects_429_in_stderr() {
        let info = detect_rate_limit(RateLimitSourceKind::Judge, "", "HTTP 429 too many requests").unwrap();
        assert_eq!(info.source, RateLimitSourceKind::Judge);
    }

    #[test]
    fn no_indicators_returns_none() {
        assert!(detect_rate_limit(RateLimitSourceKind::Agent, "all good", "").is_none());
    }

    #[test]
    fn retry_after_seconds_parsed_directly() {
        assert_eq!(parse_retry_after("Retry-After: 42"), Some(42));
    }

    #[test]
    fn default_wait_when_unparseable() {
        let info = detect_rate_limit(RateLimitSourceKind::Agent, "", "rate_limit exceeded, try later").unwrap();
        assert_eq!(info.retry_after_seconds, (DEFAULT_WAIT_SECONDS as f64 * SAFETY_BUFFER).round() as u64);
    }

    #[test]
    fn resets_wall_clock_parses_with_default_timezone() {
        let seconds = parse_retry_after("resets at 4pm").unwrap();
        assert!(seconds > 0);
    }

    #[test]
    fn resets_wall_clock_parses_with_explicit_timezone() {
        let seconds = parse_retry_after("resets at 11:30pm (UTC)").unwrap();
        assert!(seconds > 0);
    }
}
