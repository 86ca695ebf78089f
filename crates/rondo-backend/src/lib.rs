//! rondo-backend: SQLite-backed lease coordination for a distributed task
//! scheduler.
//!
//! Schedules live in one table; many uncoordinated processes poll it and
//! race to claim due occurrences. Safety rests entirely on conditional
//! updates checked by affected-row count (optimistic compare-and-swap on
//! `timeout`/`next_time`), not on locks: the first successful conditional
//! write wins, losers observe zero affected rows and move on.
//!
//! Execution loops, worker pools, and dispatch live elsewhere; this crate
//! only implements the storage-backed coordination primitive.

mod acquire;
mod codec;
mod config;
mod lease;
mod repo;
mod session;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use session::Session;

pub use config::BackendConfig;
pub use rondo_types::{
    NewSchedule, Payload, Schedule, ScheduleAttributes, ScheduleMetadata, ScheduleUpdate, Task,
    TaskToken,
};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("config error: {0}")]
    Config(String),
    #[error("schedule key={0} does not exist")]
    NotFound(String),
    #[error("schedule key={0} already exists")]
    AlreadyExists(String),
    #[error("task time={0} is already finished")]
    AlreadyFinished(DateTime<Utc>),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cron error: {0}")]
    Cron(#[from] rondo_cron::CronError),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// SQLite-backed schedule store and lease coordinator.
///
/// One connection per instance, serialized by an internal session guard;
/// cross-process coordination happens purely through the conditional
/// updates issued by [`acquire`](Self::acquire),
/// [`heartbeat`](Self::heartbeat), and [`finish`](Self::finish).
pub struct SqlBackend {
    session: Session,
    table: String,
}

impl SqlBackend {
    /// Open (or create) the backend database described by `config`.
    ///
    /// Configuration is validated eagerly: a missing path or table name,
    /// or a table name that is not a plain identifier, is a
    /// [`BackendError::Config`].
    pub fn open(config: &BackendConfig) -> Result<Self> {
        config.validate()?;
        let conn = Connection::open(&config.path)?;
        let backend = Self::init(conn, &config.table)?;
        tracing::info!(path = %config.path, table = %config.table, "schedule backend opened");
        Ok(backend)
    }

    /// Open an in-memory backend (for testing).
    pub fn open_in_memory(table: &str) -> Result<Self> {
        config::validate_table(table)?;
        let conn = Connection::open_in_memory()?;
        Self::init(conn, table)
    }

    fn init(conn: Connection, table: &str) -> Result<Self> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;

             CREATE TABLE IF NOT EXISTS {table} (
                 id        TEXT PRIMARY KEY,
                 timeout   INTEGER NOT NULL,
                 next_time INTEGER NOT NULL,
                 cron      TEXT,
                 delay     INTEGER,
                 data      TEXT,
                 timezone  TEXT
             );

             CREATE INDEX IF NOT EXISTS {table}_timeout ON {table} (timeout);"
        ))?;

        Ok(Self {
            session: Session::new(conn),
            table: table.to_string(),
        })
    }
}
