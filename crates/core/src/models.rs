use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contiguous window of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Position of the passage in source order.
    pub index: usize,
    /// Character offset of the first character in the extracted text.
    pub char_start: usize,
    pub text: String,
}

impl Passage {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    /// Cosine distance to the query, `0.0` for an identical direction.
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub filename: String,
    pub checksum: String,
    pub page_count: usize,
    pub passage_count: usize,
    pub index_id: Uuid,
    pub generation: u64,
    /// `false` when the filename was already known to the metadata store.
    pub newly_recorded: bool,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub index_id: Uuid,
    pub passages: Vec<ScoredPassage>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Collapse runs of whitespace in extracted text before chunking.
    pub normalize_whitespace: bool,
    pub top_k: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            normalize_whitespace: false,
            top_k: 4,
        }
    }
}
