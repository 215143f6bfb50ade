use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

// ─── Alarm store ─────────────────────────────────────────────────────────────

pub struct AlarmRepo;

impl AlarmRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM alarm_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    /// Replace the whole record stored under `key`.
    pub fn put(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO alarm_store (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

// ─── Asset cache ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub struct AssetRepo;

impl AssetRepo {
    pub fn get(conn: &Connection, cache_name: &str, path: &str) -> Result<Option<CachedAsset>> {
        conn.query_row(
            "SELECT path, content_type, body FROM asset_cache
             WHERE cache_name = ?1 AND path = ?2",
            params![cache_name, path],
            |row| {
                Ok(CachedAsset {
                    path: row.get(0)?,
                    content_type: row.get(1)?,
                    body: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    /// Write every asset or none of them.
    pub fn put_all(conn: &mut Connection, cache_name: &str, assets: &[CachedAsset]) -> Result<()> {
        let tx = conn.transaction()?;
        for asset in assets {
            tx.execute(
                "INSERT OR REPLACE INTO asset_cache (cache_name, path, content_type, body)
                 VALUES (?1, ?2, ?3, ?4)",
                params![cache_name, asset.path, asset.content_type, asset.body],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn paths(conn: &Connection, cache_name: &str) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT path FROM asset_cache WHERE cache_name = ?1 ORDER BY path")?;
        let rows = stmt.query_map(params![cache_name], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(anyhow::Error::from)
    }

    #[cfg(test)]
    pub fn cache_names(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT DISTINCT cache_name FROM asset_cache ORDER BY cache_name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(anyhow::Error::from)
    }

    /// Drop every cache except `keep`. Returns the number of rows removed.
    pub fn delete_other_caches(conn: &Connection, keep: &str) -> Result<usize> {
        let removed = conn.execute(
            "DELETE FROM asset_cache WHERE cache_name <> ?1",
            params![keep],
        )?;
        Ok(removed)
    }
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map(Option::flatten)
        .map_err(anyhow::Error::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn asset(path: &str, body: &[u8]) -> CachedAsset {
        CachedAsset {
            path: path.to_string(),
            content_type: None,
            body: body.to_vec(),
        }
    }

    #[test]
    fn alarm_record_is_replaced_whole() {
        let conn = open_in_memory().unwrap();
        assert_eq!(AlarmRepo::get(&conn, "prayers").unwrap(), None);
        AlarmRepo::put(&conn, "prayers", "{\"Fajr\":1}").unwrap();
        AlarmRepo::put(&conn, "prayers", "{}").unwrap();
        assert_eq!(AlarmRepo::get(&conn, "prayers").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn other_caches_are_reclaimed() {
        let mut conn = open_in_memory().unwrap();
        AssetRepo::put_all(&mut conn, "v1", &[asset("/a", b"old"), asset("/b", b"old")]).unwrap();
        AssetRepo::put_all(&mut conn, "v2", &[asset("/a", b"new")]).unwrap();

        assert_eq!(AssetRepo::delete_other_caches(&conn, "v2").unwrap(), 2);
        assert_eq!(AssetRepo::cache_names(&conn).unwrap(), vec!["v2".to_string()]);
        assert_eq!(AssetRepo::get(&conn, "v2", "/a").unwrap().unwrap().body, b"new");
    }

    #[test]
    fn meta_upserts() {
        let conn = open_in_memory().unwrap();
        MetaRepo::set(&conn, "location", "Karachi").unwrap();
        MetaRepo::set(&conn, "location", "Lahore").unwrap();
        assert_eq!(MetaRepo::get(&conn, "location").unwrap().as_deref(), Some("Lahore"));
        assert_eq!(MetaRepo::get(&conn, "missing").unwrap(), None);
    }
}
