use crate::error::{IngestError, SearchError};
use crate::models::DocumentRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Opaque text completion: a prompt in, the model's reply out.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, SearchError>;
}

/// Upload bookkeeping. Filenames are unique.
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    /// Returns `true` when the filename was inserted, `false` when it was
    /// already known.
    async fn record_upload(
        &self,
        filename: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<bool, IngestError>;

    async fn list(&self) -> Result<Vec<DocumentRecord>, IngestError>;
}
