//! rondo-types: domain types shared across the rondo scheduler backend.
//!
//! Plain value types only — the lease protocol itself lives in
//! `rondo-backend`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object payload stored alongside a schedule.
pub type Payload = Map<String, Value>;

// ──────────────────── Lease Types ────────────────────

/// Ephemeral handle for one claimed occurrence.
///
/// Captured at acquire time and threaded back into heartbeat/finish so
/// those calls never re-read the row to learn what they own. The
/// `scheduled_time` field doubles as the fencing value: lifecycle updates
/// only apply while the row's `next_time` still equals it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskToken {
    /// Row key of the claimed schedule.
    pub row_id: String,
    /// Occurrence time (epoch seconds) this claim is for.
    pub scheduled_time: i64,
    /// Cron expression at claim time; `None` for one-shot schedules.
    pub cron: Option<String>,
    /// Extra seconds added after the next cron occurrence on finish.
    pub delay: i64,
    /// Timezone used for cron evaluation.
    pub timezone: String,
}

/// A claimed occurrence, returned by a successful acquire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Schedule key.
    pub key: String,
    /// Decoded attributes at claim time.
    pub attributes: ScheduleAttributes,
    /// Occurrence time this task executes for.
    pub scheduled_time: DateTime<Utc>,
    /// Token for heartbeat/finish calls.
    pub token: TaskToken,
}

// ──────────────────── Schedule Types ────────────────────

/// Handle to a persisted schedule, returned by submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique schedule key.
    pub key: String,
}

/// A schedule together with its decoded attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleMetadata {
    /// Unique schedule key.
    pub key: String,
    /// Decoded attributes.
    pub attributes: ScheduleAttributes,
}

/// Read-side projection of a schedule row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAttributes {
    /// Timezone for cron evaluation (defaults to "UTC").
    pub timezone: String,
    /// Seconds added after the computed cron occurrence (defaults to 0).
    pub delay: i64,
    /// Cron expression; `None` for one-shot schedules.
    pub cron: Option<String>,
    /// User payload with the `type` tag removed.
    pub data: Payload,
    /// Occurrence time currently pending execution.
    pub next_time: DateTime<Utc>,
    /// Claim deadline (lease expiry while claimed).
    pub next_run_time: DateTime<Utc>,
    /// Job kind, extracted from the payload's `type` tag.
    pub kind: String,
    /// Reserved for backends that track a status message. Always `None` here.
    pub message: Option<String>,
    /// Reserved for backends that track the executing node. Always `None` here.
    pub node: Option<String>,
}

/// Request to create a new schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    /// Unique schedule key.
    pub key: String,
    /// Job kind, embedded in the payload column as the `type` tag.
    pub kind: String,
    /// Cron expression; `None` for a one-shot schedule.
    pub cron: Option<String>,
    /// Seconds added after each computed cron occurrence.
    pub delay: i64,
    /// Timezone for cron evaluation.
    pub timezone: String,
    /// User payload.
    pub data: Payload,
    /// First occurrence time (epoch seconds).
    pub next_time: i64,
    /// First claim deadline (epoch seconds).
    pub next_run_time: i64,
}

/// Partial update of a schedule's mutable fields.
///
/// `None` fields are left untouched. Payload and kind are immutable after
/// creation in this backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    /// New cron expression.
    pub cron: Option<String>,
    /// New post-occurrence delay in seconds.
    pub delay: Option<i64>,
    /// New timezone name.
    pub timezone: Option<String>,
}

impl ScheduleUpdate {
    /// True when no field is set; such an update is a no-op.
    pub fn is_empty(&self) -> bool {
        self.cron.is_none() && self.delay.is_none() && self.timezone.is_none()
    }
}
