//! Lease lifecycle: heartbeat and finish for claimed occurrences.
//!
//! Both operations fence on `next_time = token.scheduled_time`: once an
//! occurrence has been advanced by someone, a stale token's conditional
//! update matches zero rows and the holder learns its lease is gone.

use rusqlite::params;

use rondo_types::TaskToken;

use crate::codec::epoch_to_utc;
use crate::{BackendError, Result, SqlBackend};

impl SqlBackend {
    /// Extend the claim deadline of a leased occurrence to
    /// `now + alive_time`.
    ///
    /// Fails with [`BackendError::AlreadyFinished`] when the occurrence
    /// was already finished or reclaimed by another process; the caller
    /// must stop processing it.
    pub fn heartbeat(&self, token: &TaskToken, alive_time: i64, now: i64) -> Result<()> {
        let next_run_time = now + alive_time;
        self.session.with(|conn| {
            let n = conn.execute(
                &format!(
                    "UPDATE {} SET timeout = ?1 WHERE id = ?2 AND next_time = ?3",
                    self.table
                ),
                params![next_run_time, token.row_id, token.scheduled_time],
            )?;
            if n == 0 {
                return Err(BackendError::AlreadyFinished(epoch_to_utc(
                    token.scheduled_time,
                )));
            }
            Ok(())
        })
    }

    /// Finish a leased occurrence and atomically reschedule.
    ///
    /// The next occurrence comes from the cron evaluator (one-shot policy
    /// included), the next claim deadline adds the schedule's delay, and
    /// both are written under the same fencing predicate as
    /// [`heartbeat`](Self::heartbeat). A token can finish at most once:
    /// the `next_time` change invalidates it for any later call.
    pub fn finish(&self, token: &TaskToken) -> Result<()> {
        let next_time = rondo_cron::next_occurrence(
            token.cron.as_deref(),
            token.scheduled_time,
            &token.timezone,
        )?;
        let next_run_time = next_time + token.delay;

        self.session.with(|conn| {
            let n = conn.execute(
                &format!(
                    "UPDATE {} SET timeout = ?1, next_time = ?2 WHERE id = ?3 AND next_time = ?4",
                    self.table
                ),
                params![next_run_time, next_time, token.row_id, token.scheduled_time],
            )?;
            if n == 0 {
                return Err(BackendError::AlreadyFinished(epoch_to_utc(
                    token.scheduled_time,
                )));
            }
            Ok(())
        })
    }
}
