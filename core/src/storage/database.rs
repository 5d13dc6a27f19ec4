use crate::{Error, Result};
use rusqlite::Connection as SqliteConnection;
use std::path::{Path, PathBuf};

pub type Connection = SqliteConnection;

/// Version written by `schema.sql`
const SCHEMA_VERSION: i32 = 1;

/// Location of the document store on disk
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open the database, creating the file and any missing tables.
    ///
    /// Fails with [`Error::InvalidInput`] when the file was written by a
    /// different schema version.
    pub fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = SqliteConnection::open(&self.db_path)?;
        conn.execute_batch(include_str!("../../schema.sql"))?;

        let version = schema_version(&conn)?;
        if version != SCHEMA_VERSION {
            return Err(Error::InvalidInput(format!(
                "Unsupported schema version {} in {} (expected {})",
                version,
                self.db_path.display(),
                SCHEMA_VERSION
            )));
        }

        tracing::info!(path = %self.db_path.display(), "opened database");
        Ok(conn)
    }
}

fn schema_version(conn: &Connection) -> Result<i32> {
    let version: String = conn.query_row(
        "SELECT value FROM metadata WHERE key = 'schema_version'",
        [],
        |row| row.get(0),
    )?;

    version
        .parse::<i32>()
        .map_err(|_| Error::InvalidInput(format!("Invalid schema version: {}", version)))
}
