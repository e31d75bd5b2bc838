use crate::error::IngestError;
use crate::models::DocumentRecord;
use crate::traits::DocumentRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS pdf_documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL UNIQUE,
        upload_date TEXT NOT NULL
    );
";

/// Upload bookkeeping in a SQLite file.
#[derive(Clone)]
pub struct SqliteDocumentRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentRegistry {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, IngestError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, IngestError> {
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, work: F) -> Result<T, IngestError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, IngestError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            work(&conn)
        })
        .await
        .map_err(|error| IngestError::Worker(error.to_string()))?
    }
}

#[async_trait]
impl DocumentRegistry for SqliteDocumentRegistry {
    async fn record_upload(
        &self,
        filename: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<bool, IngestError> {
        let filename = filename.to_string();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO pdf_documents (filename, upload_date) VALUES (?1, ?2)",
                params![filename, uploaded_at.to_rfc3339()],
            )?;
            debug!(filename = %filename, inserted, "recorded upload");
            Ok(inserted == 1)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>, IngestError> {
        self.with_conn(|conn| {
            let mut statement =
                conn.prepare("SELECT filename, upload_date FROM pdf_documents ORDER BY id")?;
            let rows = statement.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (filename, upload_date) = row?;
                let uploaded_at = DateTime::parse_from_rfc3339(&upload_date)
                    .map_err(|error| IngestError::Metadata(error.to_string()))?
                    .with_timezone(&Utc);
                records.push(DocumentRecord {
                    filename,
                    uploaded_at,
                });
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn filenames_are_unique() -> Result<(), Box<dyn std::error::Error>> {
        let registry = SqliteDocumentRegistry::open_in_memory()?;
        assert!(registry.record_upload("report.pdf", Utc::now()).await?);
        assert!(!registry.record_upload("report.pdf", Utc::now()).await?);

        let records = registry.list().await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "report.pdf");
        Ok(())
    }

    #[tokio::test]
    async fn records_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("file_meta_data.db");

        let first = SqliteDocumentRegistry::open(&path)?;
        first.record_upload("a.pdf", Utc::now()).await?;
        drop(first);

        let reopened = SqliteDocumentRegistry::open(&path)?;
        assert!(!reopened.record_upload("a.pdf", Utc::now()).await?);
        assert_eq!(reopened.list().await?.len(), 1);
        Ok(())
    }
}
