// Declare modules
pub mod abbr;
pub mod article;
pub mod conjugation;
pub mod data;
pub mod db;
pub mod definition;
pub mod entry;
pub mod error;
pub mod lema;
pub mod node;
pub mod parse;
pub mod search;
pub mod sentence;
pub mod word;

// Re-export key types for easier use
pub use abbr::Abbr;
pub use article::Article;
pub use conjugation::{Conjugation, Mood, NonPersonal, Person, Tense};
pub use db::CachedPage;
pub use definition::Definition;
pub use entry::Entry;
pub use error::{DleError, Result, StructuralError};
pub use lema::{ArticleLema, EntryLema, LemaHeader};
pub use node::{DLE_MAIN_URL, ParsedNode};
pub use search::SearchResult;
pub use sentence::{Component, Sentence};
pub use word::Word;

use directories_next::ProjectDirs;
use log::{debug, error, info};
use parse::parse_search_result;
use reqwest::Client;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Subdirectory name within the user's cache directory.
pub const DLE_SUBDIR: &str = "dle-rs";

/// Options for creating a [`Dle`] client.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// Optional path to a specific page cache file to use or create.
    /// If None, the default location based on ProjectDirs will be used.
    pub db_path: Option<PathBuf>,
    /// Site to search instead of [`data::DEFAULT_BASE_URL`].
    pub base_url: Option<String>,
    /// Always fetch pages, overwriting whatever the cache holds.
    pub force_refresh: bool,
    /// Never touch the network; searches only succeed for cached terms.
    pub offline: bool,
}

/// Dictionary client: fetches result pages, caches them in SQLite and
/// parses them into [`SearchResult`]s.
#[derive(Clone)] // Clone is cheap due to Arc<Mutex<...>>
pub struct Dle {
    conn: Arc<Mutex<Connection>>,
    client: Client,
    base_url: Arc<String>,
    db_file_path: Arc<PathBuf>,
    force_refresh: bool,
    offline: bool,
}

// Helper function to open/create the database connection
fn open_db_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;

    // Use WAL mode for better concurrency (readers don't block writers)
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    Ok(conn)
}

impl Dle {
    /// Opens the client with default options (automatic cache path).
    pub async fn load() -> Result<Self> {
        Self::load_with_options(LoadOptions::default()).await
    }

    /// Opens the client with specific options.
    pub async fn load_with_options(options: LoadOptions) -> Result<Self> {
        let db_path = match options.db_path {
            Some(path) => {
                info!("Using provided database path: {:?}", path);
                path
            }
            None => Self::get_default_db_path()?,
        };
        info!("Using database path: {:?}", db_path);

        let mut conn = open_db_connection(&db_path)?;
        db::initialize_database(&mut conn)?;
        debug!("Page cache holds {} pages", db::count_pages(&conn)?);

        let base_url = options
            .base_url
            .unwrap_or_else(|| data::DEFAULT_BASE_URL.to_string());
        // Reject a malformed base URL up front.
        data::search_url(&base_url, "a")?;

        Ok(Dle {
            conn: Arc::new(Mutex::new(conn)),
            client: data::build_client()?,
            base_url: Arc::new(base_url),
            db_file_path: Arc::new(db_path),
            force_refresh: options.force_refresh,
            offline: options.offline,
        })
    }

    /// Gets the default path for the SQLite page cache.
    pub fn get_default_db_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("org", "DleRs", DLE_SUBDIR).ok_or(DleError::DataDirNotFound)?;
        let cache_dir = project_dirs.cache_dir();
        fs::create_dir_all(cache_dir)?;
        let db_filename = format!("dle-pages-v{}.db", db::SCHEMA_VERSION);
        Ok(cache_dir.join(db_filename))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_file_path
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DleError::Internal("Mutex poisoned".to_string()))
    }

    /// Raw results page for `term`, from the cache when possible.
    pub async fn search_html(&self, term: &str) -> Result<String> {
        if !self.force_refresh {
            let cached = db::get_page(&*self.lock_conn()?, term)?;
            if let Some(html) = cached {
                info!("Using cached page for '{}'", term);
                return Ok(html);
            }
        }
        if self.offline {
            return Err(DleError::InvalidArgument(format!(
                "'{}' is not cached and offline mode is on",
                term
            )));
        }

        let html = data::fetch_search_page(&self.client, &self.base_url, term).await?;
        db::put_page(&*self.lock_conn()?, term, &html)?;
        Ok(html)
    }

    /// Looks `term` up and parses the results page.
    pub async fn search(&self, term: &str) -> Result<SearchResult> {
        debug!("search: term='{}'", term);
        let html = self.search_html(term).await?;
        parse_search_result(html).await
    }

    /// Lists the pages currently held in the cache.
    pub fn cached_pages(&self) -> Result<Vec<CachedPage>> {
        db::list_pages(&*self.lock_conn()?)
    }

    /// Removes every cached page, keeping the cache file.
    pub fn clear_pages(&self) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        db::clear_pages(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Deletes the page cache file(s).
    ///
    /// If `db_path_override` is `Some`, it attempts to delete that specific file.
    /// If `db_path_override` is `None`, it calculates the default path and deletes that file.
    pub fn clear_database(db_path_override: Option<PathBuf>) -> Result<()> {
        let path_to_clear = match db_path_override {
            Some(path) => {
                info!("Attempting to clear specified database file: {:?}", path);
                path
            }
            None => {
                let default_path = Self::get_default_db_path()?;
                info!("Attempting to clear default database file: {:?}", default_path);
                default_path
            }
        };

        if !path_to_clear.exists() {
            info!(
                "Database file not found, nothing to clear: {:?}",
                path_to_clear
            );
            return Ok(());
        }

        match fs::remove_file(&path_to_clear) {
            Ok(_) => {
                info!("Successfully deleted database file: {:?}", path_to_clear);
                for suffix in ["-wal", "-shm"] {
                    let mut side_file = path_to_clear.clone().into_os_string();
                    side_file.push(suffix);
                    let side_file = PathBuf::from(side_file);
                    if side_file.exists() {
                        let _ = fs::remove_file(side_file); // Ignore error if deletion fails
                    }
                }
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete database file {:?}: {}", path_to_clear, e);
                Err(DleError::Io(e))
            }
        }
    }
}
