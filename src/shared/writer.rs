use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DATABASE_SUFFIX: &str = "sqlite";

// Schema of a converter database: one row per output file, keyed by its relative path.
const CREATE_FILES_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS files (key TEXT PRIMARY KEY, value TEXT NOT NULL)";

// Output sink for converted documents. Paths are always relative to the sink root.
pub trait OutputWriter {
    fn write(&mut self, relative: &Path, contents: &str) -> Result<()>;

    // Flush whatever the sink buffered. Called once, after the last write.
    fn finish(self: Box<Self>) -> Result<()>;
}

// Writes each output as a file under a base directory.
pub struct FilesystemWriter {
    base_dir: PathBuf,
    known_directories: HashSet<PathBuf>,
}

impl FilesystemWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            known_directories: HashSet::new(),
        }
    }
}

impl OutputWriter for FilesystemWriter {
    fn write(&mut self, relative: &Path, contents: &str) -> Result<()> {
        let path = self.base_dir.join(relative);
        if let Some(directory) = path.parent()
            && !self.known_directories.contains(directory)
        {
            fs::create_dir_all(directory).with_context(|| {
                format!("creating output directory failed: {}", directory.display())
            })?;
            self.known_directories.insert(directory.to_path_buf());
        }
        fs::write(&path, contents)
            .with_context(|| format!("writing output file failed: {}", path.display()))
    }

    fn finish(self: Box<Self>) -> Result<()> {
        debug!(
            "filesystem output complete under {} ({} directories)",
            self.base_dir.display(),
            self.known_directories.len()
        );
        Ok(())
    }
}

// Stores every output as a key/value row in one SQLite file, inside a single transaction.
pub struct SqliteWriter {
    conn: Connection,
    path: PathBuf,
    rows: usize,
}

impl SqliteWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("creating database directory failed: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database failed: {}", path.display()))?;
        conn.execute_batch(CREATE_FILES_TABLE)
            .with_context(|| format!("creating schema failed: {}", path.display()))?;
        conn.execute_batch("BEGIN")
            .context("starting database transaction failed")?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            rows: 0,
        })
    }
}

impl OutputWriter for SqliteWriter {
    fn write(&mut self, relative: &Path, contents: &str) -> Result<()> {
        let key = database_key(relative);
        self.conn
            .prepare_cached("INSERT OR REPLACE INTO files (key, value) VALUES (?1, ?2)")
            .and_then(|mut stmt| stmt.execute(params![key, contents]))
            .with_context(|| format!("storing {key} in {} failed", self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .with_context(|| format!("committing database failed: {}", self.path.display()))?;
        debug!("committed {} row(s) to {}", self.rows, self.path.display());
        Ok(())
    }
}

// Database keys use `/` regardless of the host path separator.
pub fn database_key(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// Database files always carry the `.sqlite` suffix; append it unless already present.
pub fn database_path(output: &Path) -> PathBuf {
    if output.extension().is_some_and(|ext| ext == DATABASE_SUFFIX) {
        return output.to_path_buf();
    }
    let mut name = output.as_os_str().to_owned();
    name.push(".");
    name.push(DATABASE_SUFFIX);
    PathBuf::from(name)
}

pub fn open_database(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        anyhow::bail!("database file not found: {}", path.display());
    }
    Connection::open(path).with_context(|| format!("opening database failed: {}", path.display()))
}

// All keys, in insertion order.
pub fn read_keys(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT key FROM files ORDER BY rowid")
        .context("querying keys failed")?;
    let keys = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .context("reading keys failed")?;
    Ok(keys)
}

// All key/value pairs, in insertion order.
pub fn read_entries(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM files ORDER BY rowid")
        .context("querying entries failed")?;
    let entries = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, String)>>>()
        .context("reading entries failed")?;
    Ok(entries)
}

pub fn read_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn
        .prepare_cached("SELECT value FROM files WHERE key = ?1")
        .context("querying value failed")?;
    let mut rows = stmt.query(params![key])?;
    let value = match rows.next()? {
        Some(row) => Some(row.get(0)?),
        None => None,
    };
    Ok(value)
}
