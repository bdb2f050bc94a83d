use crate::error::{DleError, Result};
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

// --- Schema Definition ---

pub const SCHEMA_VERSION: u32 = 1;

const CREATE_METADATA_TABLE: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

const CREATE_PAGES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS pages (
    term TEXT PRIMARY KEY, -- Normalized search term
    html TEXT NOT NULL,
    fetched_at INTEGER NOT NULL -- Seconds since the Unix epoch
);";

const CREATE_PAGES_FETCHED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_pages_fetched_at ON pages (fetched_at);";

/// Summary of one cached results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedPage {
    pub term: String,
    pub fetched_at: i64,
    pub size: usize,
}

// --- Initialization Function ---

/// Creates all necessary tables and indices in the database if they don't exist.
/// Also checks and sets the schema version.
pub fn initialize_database(conn: &mut Connection) -> Result<()> {
    info!(
        "Initializing page cache schema (version {})...",
        SCHEMA_VERSION
    );
    let tx = conn.transaction()?;

    tx.execute(CREATE_METADATA_TABLE, [])?;
    tx.execute(CREATE_PAGES_TABLE, [])?;
    tx.execute(CREATE_PAGES_FETCHED_INDEX, [])?;

    let existing_version_str: Option<String> = tx
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match existing_version_str {
        Some(v_str) => {
            let existing_version: u32 = v_str.parse().map_err(|e| {
                DleError::Internal(format!(
                    "Failed to parse existing schema version '{}': {}",
                    v_str, e
                ))
            })?;
            match existing_version.cmp(&SCHEMA_VERSION) {
                std::cmp::Ordering::Less => {
                    warn!(
                        "Cache schema version ({}) is older than expected ({}). Dropping cached pages.",
                        existing_version, SCHEMA_VERSION
                    );
                    clear_pages(&tx)?;
                    tx.execute(
                        "UPDATE metadata SET value = ?1 WHERE key = 'schema_version'",
                        params![SCHEMA_VERSION.to_string()],
                    )?;
                }
                std::cmp::Ordering::Greater => {
                    warn!(
                        "Cache schema version ({}) is newer than expected ({}). Using potentially incompatible schema.",
                        existing_version, SCHEMA_VERSION
                    );
                }
                std::cmp::Ordering::Equal => {
                    debug!(
                        "Cache schema version ({}) matches expected version.",
                        existing_version
                    );
                }
            }
        }
        None => {
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )?;
            info!("Set initial schema version in metadata table.");
        }
    }

    tx.commit()?;
    debug!("Page cache schema initialization complete.");
    Ok(())
}

/// Cache key for a search term: trimmed and lowercased.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// --- Page Access ---

/// Returns the cached page for `term`, if any.
pub fn get_page(conn: &Connection, term: &str) -> Result<Option<String>> {
    let key = normalize_term(term);
    let html: Option<String> = conn
        .query_row(
            "SELECT html FROM pages WHERE term = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    debug!(
        "Cache {} for '{}'",
        if html.is_some() { "hit" } else { "miss" },
        key
    );
    Ok(html)
}

/// Stores (or replaces) the page fetched for `term`.
pub fn put_page(conn: &Connection, term: &str, html: &str) -> Result<()> {
    let key = normalize_term(term);
    conn.execute(
        "INSERT OR REPLACE INTO pages (term, html, fetched_at) VALUES (?1, ?2, ?3)",
        params![key, html, now_secs()],
    )?;
    debug!("Cached {} bytes for '{}'", html.len(), key);
    Ok(())
}

/// Lists cached pages, most recently fetched first.
pub fn list_pages(conn: &Connection) -> Result<Vec<CachedPage>> {
    let mut stmt = conn.prepare(
        "SELECT term, fetched_at, LENGTH(CAST(html AS BLOB)) FROM pages ORDER BY fetched_at DESC, term",
    )?;
    let pages = stmt
        .query_map([], |row| {
            Ok(CachedPage {
                term: row.get(0)?,
                fetched_at: row.get(1)?,
                size: row.get::<_, i64>(2)? as usize,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(pages)
}

pub fn count_pages(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
    Ok(count)
}

/// Helper to clear all cached pages, keeping the metadata.
pub fn clear_pages(tx: &Transaction) -> Result<()> {
    info!("Clearing cached pages...");
    let removed = tx.execute("DELETE FROM pages", [])?;
    info!("Removed {} cached pages.", removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_test_db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_database(&mut conn).unwrap();
        conn
    }

    #[test]
    fn test_initialize_sets_schema_version() {
        let conn = open_test_db();
        let version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
        assert_eq!(count_pages(&conn).unwrap(), 0);
    }

    #[test]
    fn test_put_and_get_page_normalizes_term() {
        let conn = open_test_db();
        put_page(&conn, " Casa ", "<html>casa</html>").unwrap();
        assert_eq!(
            get_page(&conn, "casa").unwrap().as_deref(),
            Some("<html>casa</html>")
        );
        assert_eq!(get_page(&conn, "perro").unwrap(), None);

        put_page(&conn, "casa", "<html>nueva</html>").unwrap();
        assert_eq!(count_pages(&conn).unwrap(), 1);
        assert_eq!(
            get_page(&conn, "CASA").unwrap().as_deref(),
            Some("<html>nueva</html>")
        );
    }

    #[test]
    fn test_list_and_clear_pages() {
        let mut conn = open_test_db();
        put_page(&conn, "año", "<p>ñ</p>").unwrap();
        put_page(&conn, "abajo", "<p>a</p>").unwrap();

        let pages = list_pages(&conn).unwrap();
        assert_eq!(pages.len(), 2);
        let entry = pages.iter().find(|p| p.term == "año").unwrap();
        assert_eq!(entry.size, "<p>ñ</p>".len());

        let tx = conn.transaction().unwrap();
        clear_pages(&tx).unwrap();
        tx.commit().unwrap();
        assert_eq!(count_pages(&conn).unwrap(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent_on_disk() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("pages.db");
        {
            let mut conn = Connection::open(&path).unwrap();
            initialize_database(&mut conn).unwrap();
            put_page(&conn, "casa", "<p>casa</p>").unwrap();
        }
        let mut conn = Connection::open(&path).unwrap();
        initialize_database(&mut conn).unwrap();
        assert_eq!(count_pages(&conn).unwrap(), 1);
    }

    #[test]
    fn test_older_schema_drops_pages() {
        let mut conn = open_test_db();
        put_page(&conn, "casa", "<p>casa</p>").unwrap();
        conn.execute(
            "UPDATE metadata SET value = '0' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();
        initialize_database(&mut conn).unwrap();
        assert_eq!(count_pages(&conn).unwrap(), 0);
    }
}
