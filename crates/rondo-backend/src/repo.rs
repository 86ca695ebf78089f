//! Schedule repository: CRUD over the schedule table.

use rusqlite::types::Value as SqlValue;
use rusqlite::{OptionalExtension, params, params_from_iter};

use rondo_types::{NewSchedule, Schedule, ScheduleMetadata, ScheduleUpdate};

use crate::codec::{self, SELECT_COLUMNS, ScheduleRow};
use crate::{BackendError, Result, SqlBackend};

impl SqlBackend {
    /// Look up one schedule by key.
    pub fn get_metadata(&self, key: &str) -> Result<ScheduleMetadata> {
        self.session.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM {} WHERE id = ?1",
                self.table
            ))?;
            let row = stmt
                .query_row(params![key], ScheduleRow::from_sql)
                .optional()?
                .ok_or_else(|| BackendError::NotFound(key.to_string()))?;
            Ok(ScheduleMetadata {
                key: row.id.clone(),
                attributes: codec::decode_attributes(&row),
            })
        })
    }

    /// Enumerate all schedules in ascending claim-deadline order, yielding
    /// one decoded schedule at a time. Single pass, not restartable.
    pub fn list(&self, mut visitor: impl FnMut(ScheduleMetadata)) -> Result<()> {
        self.session.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM {} ORDER BY timeout ASC",
                self.table
            ))?;
            let rows = stmt.query_map([], ScheduleRow::from_sql)?;
            for row in rows {
                let row = row?;
                visitor(ScheduleMetadata {
                    key: row.id.clone(),
                    attributes: codec::decode_attributes(&row),
                });
            }
            Ok(())
        })
    }

    /// Insert a new schedule.
    ///
    /// The payload is stored with the job kind injected as its `type` tag;
    /// the initial claim deadline is `next_run_time`.
    pub fn submit(&self, req: &NewSchedule) -> Result<Schedule> {
        let data = codec::encode_payload(&req.kind, &req.data);
        self.session.with(|conn| {
            let inserted = conn.execute(
                &format!(
                    "INSERT INTO {} (id, timeout, next_time, cron, delay, data, timezone)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    self.table
                ),
                params![
                    req.key,
                    req.next_run_time,
                    req.next_time,
                    req.cron,
                    req.delay,
                    data,
                    req.timezone,
                ],
            );
            match inserted {
                Ok(_) => Ok(Schedule {
                    key: req.key.clone(),
                }),
                Err(err) if is_unique_violation(&err) => {
                    Err(BackendError::AlreadyExists(req.key.clone()))
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    /// Delete a schedule by key.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.session.with(|conn| {
            let n = conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", self.table),
                params![key],
            )?;
            if n == 0 {
                return Err(BackendError::NotFound(key.to_string()));
            }
            Ok(())
        })
    }

    /// Update the mutable subset of a schedule's fields.
    ///
    /// Fields left `None` are untouched; an all-`None` update returns
    /// without touching the store at all. Payload and kind are immutable
    /// after creation.
    pub fn modify(&self, key: &str, update: &ScheduleUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(cron) = &update.cron {
            sets.push("cron = ?");
            args.push(SqlValue::from(cron.clone()));
        }
        if let Some(delay) = update.delay {
            sets.push("delay = ?");
            args.push(SqlValue::from(delay));
        }
        if let Some(timezone) = &update.timezone {
            sets.push("timezone = ?");
            args.push(SqlValue::from(timezone.clone()));
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            self.table,
            sets.join(", ")
        );
        args.push(SqlValue::from(key.to_string()));

        self.session.with(|conn| {
            let n = conn.execute(&sql, params_from_iter(args.iter()))?;
            if n == 0 {
                return Err(BackendError::NotFound(key.to_string()));
            }
            Ok(())
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rondo_types::Payload;
    use serde_json::{Value, json};

    fn new_schedule(key: &str, next_time: i64) -> NewSchedule {
        let mut data = Payload::new();
        data.insert("target".into(), json!("daily"));
        NewSchedule {
            key: key.into(),
            kind: "report".into(),
            cron: Some("0 * * * *".into()),
            delay: 10,
            timezone: "Asia/Tokyo".into(),
            data,
            next_time,
            next_run_time: next_time,
        }
    }

    fn backend() -> SqlBackend {
        SqlBackend::open_in_memory("schedules").unwrap()
    }

    #[test]
    fn test_submit_and_get_round_trip() {
        let backend = backend();
        let sched = backend.submit(&new_schedule("job1", 1_700_000_000)).unwrap();
        assert_eq!(sched.key, "job1");

        let meta = backend.get_metadata("job1").unwrap();
        assert_eq!(meta.key, "job1");
        assert_eq!(meta.attributes.kind, "report");
        assert_eq!(meta.attributes.cron.as_deref(), Some("0 * * * *"));
        assert_eq!(meta.attributes.delay, 10);
        assert_eq!(meta.attributes.timezone, "Asia/Tokyo");
        assert_eq!(meta.attributes.data.get("target"), Some(&Value::String("daily".into())));
        assert!(!meta.attributes.data.contains_key("type"));
        assert_eq!(meta.attributes.next_time.timestamp(), 1_700_000_000);
        assert_eq!(meta.attributes.next_run_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_submit_duplicate_key() {
        let backend = backend();
        backend.submit(&new_schedule("job1", 1_700_000_000)).unwrap();
        let err = backend.submit(&new_schedule("job1", 1_700_009_999)).unwrap_err();
        assert!(matches!(err, BackendError::AlreadyExists(ref k) if k == "job1"));

        // The first schedule is unaffected.
        let meta = backend.get_metadata("job1").unwrap();
        assert_eq!(meta.attributes.next_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_get_metadata_filters_by_key() {
        let backend = backend();
        backend.submit(&new_schedule("job1", 100)).unwrap();
        backend.submit(&new_schedule("job2", 50)).unwrap();
        // job2 sits at the top of the table by timeout; a keyed read must
        // still return job1.
        let meta = backend.get_metadata("job1").unwrap();
        assert_eq!(meta.key, "job1");
        assert!(matches!(
            backend.get_metadata("missing"),
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_ordered_by_timeout() {
        let backend = backend();
        backend.submit(&new_schedule("late", 300)).unwrap();
        backend.submit(&new_schedule("early", 100)).unwrap();
        backend.submit(&new_schedule("mid", 200)).unwrap();

        let mut keys = Vec::new();
        backend.list(|sched| keys.push(sched.key)).unwrap();
        assert_eq!(keys, ["early", "mid", "late"]);
    }

    #[test]
    fn test_delete() {
        let backend = backend();
        backend.submit(&new_schedule("job1", 100)).unwrap();
        backend.delete("job1").unwrap();
        assert!(matches!(
            backend.get_metadata("job1"),
            Err(BackendError::NotFound(_))
        ));
        assert!(matches!(
            backend.delete("job1"),
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn test_modify_partial() {
        let backend = backend();
        backend.submit(&new_schedule("job1", 100)).unwrap();

        backend
            .modify(
                "job1",
                &ScheduleUpdate {
                    delay: Some(30),
                    ..Default::default()
                },
            )
            .unwrap();

        let meta = backend.get_metadata("job1").unwrap();
        assert_eq!(meta.attributes.delay, 30);
        // Other mutable fields are untouched.
        assert_eq!(meta.attributes.cron.as_deref(), Some("0 * * * *"));
        assert_eq!(meta.attributes.timezone, "Asia/Tokyo");
    }

    #[test]
    fn test_modify_empty_is_noop() {
        let backend = backend();
        // No recognized option: returns without effect even for a key that
        // does not exist.
        backend.modify("missing", &ScheduleUpdate::default()).unwrap();
    }

    #[test]
    fn test_modify_missing_key() {
        let backend = backend();
        let update = ScheduleUpdate {
            timezone: Some("UTC".into()),
            ..Default::default()
        };
        assert!(matches!(
            backend.modify("missing", &update),
            Err(BackendError::NotFound(_))
        ));
    }
}
