//! Cron expression parsing and matching.
//!
//! Standard 5-field format: `minute hour day month weekday`.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

use crate::CronError;

/// A parsed cron expression.
#[derive(Debug, Clone)]
pub struct CronExpr {
    /// Minute (0-59).
    minute: CronField,
    /// Hour (0-23).
    hour: CronField,
    /// Day of month (1-31).
    day: CronField,
    /// Month (1-12).
    month: CronField,
    /// Day of week (0-6, Sunday = 0).
    weekday: CronField,
}

/// A single field in a cron expression.
#[derive(Debug, Clone)]
enum CronField {
    /// Wildcard (*) - matches all values.
    Any,
    /// Specific value.
    Value(u32),
    /// List of values (e.g., 1,3,5).
    List(Vec<u32>),
    /// Range (e.g., 1-5).
    Range(u32, u32),
    /// Step (e.g., */5).
    Step(u32),
}

impl CronField {
    fn matches(&self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Value(v) => *v == value,
            Self::List(values) => values.contains(&value),
            Self::Range(start, end) => value >= *start && value <= *end,
            Self::Step(step) => value % step == 0,
        }
    }
}

impl CronExpr {
    /// Parse a cron expression string.
    ///
    /// # Examples
    ///
    /// - `0 0 * * *` - daily at midnight
    /// - `*/5 * * * *` - every 5 minutes
    /// - `0 9-17 * * 1-5` - every hour 9am-5pm, Monday-Friday
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CronError::parse(expr, "expression must have 5 fields"));
        }

        Ok(Self {
            minute: parse_field(expr, parts[0], 0, 59)?,
            hour: parse_field(expr, parts[1], 0, 23)?,
            day: parse_field(expr, parts[2], 1, 31)?,
            month: parse_field(expr, parts[3], 1, 12)?,
            weekday: parse_field(expr, parts[4], 0, 6)?,
        })
    }

    /// Check whether the expression matches the given wall-clock time.
    pub fn matches<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        self.minute.matches(time.minute())
            && self.hour.matches(time.hour())
            && self.day.matches(time.day())
            && self.month.matches(time.month())
            && self.weekday.matches(time.weekday().num_days_from_sunday())
    }
}

fn parse_field(expr: &str, field: &str, min: u32, max: u32) -> Result<CronField, CronError> {
    let num = |v: &str| -> Result<u32, CronError> {
        let n: u32 = v
            .parse()
            .map_err(|_| CronError::parse(expr, format!("invalid numeric value {v:?}")))?;
        if n < min || n > max {
            return Err(CronError::parse(expr, format!("value {n} out of range {min}-{max}")));
        }
        Ok(n)
    };

    // Wildcard
    if field == "*" {
        return Ok(CronField::Any);
    }

    // Step (*/n)
    if let Some(step_str) = field.strip_prefix("*/") {
        let step: u32 = step_str
            .parse()
            .map_err(|_| CronError::parse(expr, format!("invalid step value {step_str:?}")))?;
        if step == 0 || step > max {
            return Err(CronError::parse(expr, format!("step value must be 1-{max}")));
        }
        return Ok(CronField::Step(step));
    }

    // Range (n-m)
    if field.contains('-') {
        let (start, end) = field
            .split_once('-')
            .ok_or_else(|| CronError::parse(expr, format!("invalid range {field:?}")))?;
        let (start, end) = (num(start)?, num(end)?);
        if start > end {
            return Err(CronError::parse(expr, format!("range start exceeds end in {field:?}")));
        }
        return Ok(CronField::Range(start, end));
    }

    // List (n,m,...)
    if field.contains(',') {
        let values = field.split(',').map(num).collect::<Result<Vec<u32>, _>>()?;
        return Ok(CronField::List(values));
    }

    Ok(CronField::Value(num(field)?))
}
