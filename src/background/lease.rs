//! Single-instance guard for the background context.
//!
//! The lease is an exclusive SQLite transaction held open on a small lock
//! database next to the main one. The OS releases the file lock when the
//! process exits, so a crashed daemon never leaves a stale lease behind.

use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("another waqt daemon already owns the alarm schedule (lock {path:?})")]
    Held { path: PathBuf },
    #[error("lease storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Held for as long as this process runs the background context. Dropping it
/// releases the lease.
pub struct InstanceLease {
    _conn: Connection,
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

impl InstanceLease {
    pub fn acquire(path: &Path) -> Result<Self, LeaseError> {
        let held = || LeaseError::Held {
            path: path.to_path_buf(),
        };
        let conn = Connection::open(path)?;
        // fail fast instead of waiting on the current owner
        conn.busy_timeout(Duration::ZERO)?;

        let taken = conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS lease (id INTEGER PRIMARY KEY CHECK (id = 1), pid INTEGER NOT NULL);
                 BEGIN EXCLUSIVE;",
            )
            .and_then(|()| {
                conn.execute(
                    "INSERT OR REPLACE INTO lease (id, pid) VALUES (1, ?1)",
                    [std::process::id()],
                )
            });
        match taken {
            Ok(_) => {
                log::debug!("acquired instance lease at {:?}", path);
                Ok(Self { _conn: conn })
            }
            Err(e) if is_busy(&e) => Err(held()),
            Err(e) => Err(e.into()),
        }
    }
}
