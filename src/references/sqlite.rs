//! SQLite reference source.
//!
//! For self-hosted deployments (and local testing) where the site's rows
//! live in a SQLite file rather than behind the hosted REST API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use std::path::Path;
use std::sync::Arc;

use super::backend::ReferenceSource;
use super::types::{ReferenceError, ReferenceRow, validate_identifier};

/// Reference source reading from a SQLite database.
///
/// The connection is guarded by a mutex and every query runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteReferenceSource {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReferenceSource {
    /// Opens the database at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open reference database: {}", path.display()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an existing connection (e.g., an in-memory database in tests).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn query_blocking(
        conn: &Connection,
        table: &str,
        column: &str,
    ) -> Result<Vec<ReferenceRow>, ReferenceError> {
        // Identifiers are validated, so quoting cannot be escaped
        let sql = format!("SELECT \"{column}\" FROM \"{table}\" WHERE \"{column}\" IS NOT NULL");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let value = match row.get_ref(0)? {
                ValueRef::Text(text) => ReferenceRow::new(String::from_utf8_lossy(text)),
                _ => ReferenceRow::null(),
            };
            values.push(value);
        }
        Ok(values)
    }
}

#[async_trait]
impl ReferenceSource for SqliteReferenceSource {
    async fn select_non_null(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<ReferenceRow>, ReferenceError> {
        validate_identifier(table)?;
        validate_identifier(column)?;

        let conn = self.conn.clone();
        let table = table.to_string();
        let column = column.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            Self::query_blocking(&conn, &table, &column)
        })
        .await
        .map_err(|e| ReferenceError::Database(format!("Task join error: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteReferenceSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE events (id INTEGER PRIMARY KEY, image_url TEXT);
             INSERT INTO events (image_url) VALUES ('https://x/images/events/a.jpg');
             INSERT INTO events (image_url) VALUES (NULL);
             INSERT INTO events (image_url) VALUES ('https://x/images/events/b.jpg');
             CREATE TABLE sponsorships (id INTEGER PRIMARY KEY, logo_url BLOB);
             INSERT INTO sponsorships (logo_url) VALUES (x'00ff');",
        )
        .unwrap();
        SqliteReferenceSource::from_connection(conn)
    }

    #[tokio::test]
    async fn test_select_non_null() {
        let source = seeded();
        let rows = source.select_non_null("events", "image_url").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.value.is_some()));
    }

    #[tokio::test]
    async fn test_non_text_values_dropped() {
        let source = seeded();
        let rows = source
            .select_non_null("sponsorships", "logo_url")
            .await
            .unwrap();
        assert_eq!(rows, vec![ReferenceRow::null()]);
    }

    #[tokio::test]
    async fn test_missing_table_is_error() {
        let source = seeded();
        let result = source.select_non_null("photos", "image_url").await;
        assert!(matches!(result, Err(ReferenceError::Database(_))));
    }

    #[tokio::test]
    async fn test_open_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("site.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE photos (image_url TEXT);
                 INSERT INTO photos VALUES ('https://x/images/gallery/p.jpg');",
            )
            .unwrap();
        }

        let source = SqliteReferenceSource::open(&path).unwrap();
        let rows = source.select_non_null("photos", "image_url").await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
