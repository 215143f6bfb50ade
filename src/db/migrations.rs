use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS alarm_store (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS asset_cache (
            cache_name    TEXT NOT NULL,
            path          TEXT NOT NULL,
            content_type  TEXT,
            body          BLOB NOT NULL,
            cached_at     TEXT DEFAULT (datetime('now')),
            PRIMARY KEY (cache_name, path)
        );

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;
    Ok(())
}
