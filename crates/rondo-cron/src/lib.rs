//! rondo-cron: cron occurrence evaluation for the rondo scheduler.
//!
//! Pure functions only — no store access. The backend calls
//! [`next_occurrence`] from its finish path to compute the next pending
//! occurrence of a schedule.

pub mod expr;

use chrono::TimeZone;
use chrono_tz::Tz;

pub use expr::CronExpr;

/// Occurrence time assigned to finished one-shot schedules:
/// 9999-12-31T23:59:59Z. The schedule never comes due again, but the
/// `next_time` change still fences out stale lease tokens.
pub const FAR_FUTURE: i64 = 253_402_300_799;

/// Bounded search horizon for the next occurrence, in minutes.
const SEARCH_HORIZON_MINUTES: i64 = 366 * 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum CronError {
    #[error("invalid cron expression {expr:?}: {reason}")]
    Parse { expr: String, reason: String },
    #[error("unknown timezone: {0}")]
    Timezone(String),
    #[error("no occurrence of {0:?} within {SEARCH_HORIZON_MINUTES} minutes")]
    NoOccurrence(String),
}

impl CronError {
    pub(crate) fn parse(expr: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Compute the first occurrence of `cron` strictly after `after` (epoch
/// seconds), evaluated as wall-clock time in `timezone`.
///
/// A `None` cron expression marks a one-shot schedule: its "next"
/// occurrence is [`FAR_FUTURE`].
pub fn next_occurrence(
    cron: Option<&str>,
    after: i64,
    timezone: &str,
) -> Result<i64, CronError> {
    let Some(spec) = cron else {
        return Ok(FAR_FUTURE);
    };
    let expr = CronExpr::parse(spec)?;
    let tz: Tz = timezone
        .parse()
        .map_err(|_| CronError::Timezone(timezone.to_string()))?;

    // Step whole minutes in epoch time and match against the zone's
    // wall clock. Stepping epoch seconds rather than local time sidesteps
    // DST gaps and folds.
    let mut t = after - after.rem_euclid(60) + 60;
    for _ in 0..SEARCH_HORIZON_MINUTES {
        if let Some(local) = tz.timestamp_opt(t, 0).single()
            && expr.matches(&local)
        {
            return Ok(t);
        }
        t += 60;
    }
    Err(CronError::NoOccurrence(spec.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-01-01T00:00:00Z
    const T0: i64 = 1_767_225_600;

    #[test]
    fn test_one_shot_is_far_future() {
        assert_eq!(next_occurrence(None, T0, "UTC").unwrap(), FAR_FUTURE);
    }

    #[test]
    fn test_every_quarter_hour_utc() {
        let next = next_occurrence(Some("*/15 * * * *"), T0, "UTC").unwrap();
        assert_eq!(next, T0 + 15 * 60);
    }

    #[test]
    fn test_strictly_after() {
        // T0 itself matches the expression but must not be returned.
        let next = next_occurrence(Some("0 0 * * *"), T0, "UTC").unwrap();
        assert_eq!(next, T0 + 86_400);
    }

    #[test]
    fn test_timezone_evaluation() {
        // 09:00 in Tokyo is midnight UTC; T0 is exactly that moment, so
        // the next 9am-Tokyo occurrence is one day later.
        let next = next_occurrence(Some("0 9 * * *"), T0, "Asia/Tokyo").unwrap();
        assert_eq!(next, T0 + 86_400);
    }

    #[test]
    fn test_unknown_timezone() {
        let err = next_occurrence(Some("* * * * *"), T0, "Mars/Olympus").unwrap_err();
        assert!(matches!(err, CronError::Timezone(_)));
    }

    #[test]
    fn test_invalid_expression() {
        let err = next_occurrence(Some("not a cron"), T0, "UTC").unwrap_err();
        assert!(matches!(err, CronError::Parse { .. }));
    }
}
