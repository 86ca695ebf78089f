//! Lease acquisition: scan due rows and claim one by conditional update.

use rusqlite::params;

use rondo_types::{Task, TaskToken};

use crate::codec::{self, SELECT_COLUMNS, ScheduleRow};
use crate::{Result, SqlBackend};

/// Scan batch size for one claim pass.
pub(crate) const MAX_SELECT_ROW: usize = 4;

impl SqlBackend {
    /// Claim one due schedule, if any, extending its deadline to
    /// `now + alive_time`.
    ///
    /// Classic optimistic-locking acquisition: read a batch of due rows
    /// oldest-deadline-first, then try `SET timeout = ? WHERE id = ? AND
    /// timeout = <value just read>` on each. An affected-row count of one
    /// means this process won the race; zero means another claimant got
    /// there first and the scan moves on. An under-full batch with no win
    /// means no claimable work remains.
    ///
    /// At most one task is returned per call regardless of `max_acquire`
    /// (the historical contract of this backend); callers drain backlogs
    /// with repeated calls.
    pub fn acquire(&self, alive_time: i64, _max_acquire: usize, now: i64) -> Result<Option<Task>> {
        let next_timeout = now + alive_time;
        self.session.with(|conn| {
            loop {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM {} WHERE timeout <= ?1
                     ORDER BY timeout ASC LIMIT {MAX_SELECT_ROW}",
                    self.table
                ))?;
                let batch = stmt
                    .query_map(params![now], ScheduleRow::from_sql)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                for row in &batch {
                    let won = conn.execute(
                        &format!(
                            "UPDATE {} SET timeout = ?1 WHERE id = ?2 AND timeout = ?3",
                            self.table
                        ),
                        params![next_timeout, row.id, row.timeout],
                    )? > 0;
                    if won {
                        return Ok(Some(claimed_task(row)));
                    }
                }

                // A short batch means the scan saw the end of the due set.
                if batch.len() < MAX_SELECT_ROW {
                    return Ok(None);
                }
            }
        })
    }
}

fn claimed_task(row: &ScheduleRow) -> Task {
    let attributes = codec::decode_attributes(row);
    let token = TaskToken {
        row_id: row.id.clone(),
        scheduled_time: row.next_time,
        cron: attributes.cron.clone(),
        delay: attributes.delay,
        timezone: attributes.timezone.clone(),
    };
    Task {
        key: row.id.clone(),
        scheduled_time: codec::epoch_to_utc(row.next_time),
        attributes,
        token,
    }
}
