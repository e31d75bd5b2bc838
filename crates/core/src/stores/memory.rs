use crate::error::IngestError;
use crate::models::DocumentRecord;
use crate::traits::DocumentRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct InMemoryDocumentRegistry {
    records: Mutex<Vec<DocumentRecord>>,
}

impl InMemoryDocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRegistry for InMemoryDocumentRegistry {
    async fn record_upload(
        &self,
        filename: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<bool, IngestError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.iter().any(|record| record.filename == filename) {
            return Ok(false);
        }
        records.push(DocumentRecord {
            filename: filename.to_string(),
            uploaded_at,
        });
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>, IngestError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
