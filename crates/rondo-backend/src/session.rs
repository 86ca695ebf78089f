//! Single-connection session guard with transient-conflict retry.

use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode};

use crate::{BackendError, Result};

/// Retry budget for transient write-write conflicts.
const MAX_RETRY: u32 = 10;
/// Fixed back-off between retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Owns the one store connection and serializes every operation issued by
/// this process instance.
///
/// The mutex is a correctness mechanism, not just a resource limit: with
/// exactly one connection behind a mutual-exclusion gate, two operations
/// from the same process never interleave against the store, and the
/// retry loop below can safely re-run a whole unit of work. Concurrency
/// safety across processes is delegated entirely to the conditional-update
/// protocol in the acquire/lease modules.
pub(crate) struct Session {
    conn: Mutex<Connection>,
}

impl Session {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run `op` with exclusive access to the connection.
    ///
    /// Transient conflicts (SQLITE_BUSY / SQLITE_LOCKED) re-run the whole
    /// operation up to [`MAX_RETRY`] times with a fixed sleep; any other
    /// error propagates immediately. The lock is released on every exit
    /// path.
    pub(crate) fn with<T>(&self, mut op: impl FnMut(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        let mut attempt = 0;
        loop {
            match op(&conn) {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) => {
                    attempt += 1;
                    if attempt >= MAX_RETRY {
                        tracing::error!(error = %err, attempts = attempt, "transient conflict, aborting");
                        return Err(err);
                    }
                    tracing::warn!(error = %err, attempt, "transient conflict, retrying");
                    std::thread::sleep(RETRY_BACKOFF);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Typed transient-conflict classification: the store told us to retry the
/// unit of work. Decided by SQLite error code, never by message text.
fn is_transient(err: &BackendError) -> bool {
    match err {
        BackendError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
            matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        }
        _ => false,
    }
}
