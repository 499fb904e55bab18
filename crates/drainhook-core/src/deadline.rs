//! Past-deadline guard.
//!
//! Deadlines travel as RFC 3339 strings with second precision in UTC,
//! e.g. `2024-01-01T00:00:00Z`. The guard only reports; enforcing the
//! deadline is the orchestrator's job.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::ParameterBag;

/// Render `at` in the deadline wire format.
pub fn format_deadline(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Deadline `timeout` after `now`, in the wire format.
pub fn deadline_after(now: DateTime<Utc>, timeout: Duration) -> CoreResult<String> {
    let delta = chrono::Duration::from_std(timeout)
        .map_err(|e| CoreError::Config(format!("timeout out of range: {e}")))?;
    let at = now
        .checked_add_signed(delta)
        .ok_or_else(|| CoreError::Config("timeout out of range".to_string()))?;
    Ok(format_deadline(at))
}

/// Parse a wire-format deadline.
pub fn parse_deadline(value: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| CoreError::Deadline {
            value: value.to_string(),
            source,
        })
}

/// Whether `now` is strictly after `deadline`. Equal is not past.
pub fn is_past_deadline(deadline: &str, now: DateTime<Utc>) -> CoreResult<bool> {
    Ok(now > parse_deadline(deadline)?)
}

/// Sets `PastDeadline` on a bag.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineGuard;

impl DeadlineGuard {
    /// Compare the bag's deadline against `now` and record the result.
    ///
    /// A missing or malformed deadline is fatal. Once a bag is past its
    /// deadline it stays past, even if the clock steps backwards.
    pub fn check(&self, bag: &mut ParameterBag, now: DateTime<Utc>) -> CoreResult<bool> {
        let deadline = bag
            .deadline
            .as_deref()
            .ok_or(CoreError::MissingParameter("Deadline"))?;
        let past = is_past_deadline(deadline, now)? || bag.past_deadline == Some(true);
        debug!(%deadline, %now, past, "deadline checked");
        bag.past_deadline = Some(past);
        Ok(past)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_deadline(s).unwrap()
    }

    fn bag_with_deadline(deadline: &str) -> ParameterBag {
        ParameterBag {
            deadline: Some(deadline.to_string()),
            ..ParameterBag::default()
        }
    }

    #[test]
    fn one_second_after_is_past() {
        let mut bag = bag_with_deadline("2024-01-01T00:00:00Z");
        let past = DeadlineGuard
            .check(&mut bag, at("2024-01-01T00:00:01Z"))
            .unwrap();
        assert!(past);
        assert_eq!(bag.past_deadline, Some(true));
    }

    #[test]
    fn exactly_equal_is_not_past() {
        let mut bag = bag_with_deadline("2024-01-01T00:00:00Z");
        let past = DeadlineGuard
            .check(&mut bag, at("2024-01-01T00:00:00Z"))
            .unwrap();
        assert!(!past);
        assert_eq!(bag.past_deadline, Some(false));
    }

    #[test]
    fn offsets_are_normalized() {
        assert!(is_past_deadline("2024-01-01T02:00:00+02:00", at("2024-01-01T00:00:01Z")).unwrap());
        assert!(!is_past_deadline("2024-01-01T02:00:00+02:00", at("2023-12-31T23:59:59Z")).unwrap());
    }

    #[test]
    fn malformed_deadline_is_fatal() {
        let mut bag = bag_with_deadline("tomorrow-ish");
        let err = DeadlineGuard.check(&mut bag, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Deadline { .. }));
        assert!(bag.past_deadline.is_none());
    }

    #[test]
    fn missing_deadline_is_fatal() {
        let mut bag = ParameterBag::default();
        let err = DeadlineGuard.check(&mut bag, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::MissingParameter("Deadline")));
    }

    #[test]
    fn past_deadline_is_never_cleared() {
        let mut bag = bag_with_deadline("2024-01-01T00:00:00Z");
        bag.past_deadline = Some(true);
        let past = DeadlineGuard
            .check(&mut bag, at("2023-06-01T00:00:00Z"))
            .unwrap();
        assert!(past);
    }

    #[test]
    fn deadline_after_formats_in_utc_seconds() {
        let now = at("2024-01-01T00:00:00Z");
        let deadline = deadline_after(now, Duration::from_secs(90 * 60)).unwrap();
        assert_eq!(deadline, "2024-01-01T01:30:00Z");
    }
}
