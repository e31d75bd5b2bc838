pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod stores;
pub mod synthesizer;
pub mod traits;

pub use chunking::{chunk_text, normalize_whitespace, ChunkingConfig};
#[cfg(feature = "fastembed")]
pub use embeddings::FastEmbedEmbedder;
pub use embeddings::{
    CharacterNgramEmbedder, TextEmbedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_MAX_INPUT_CHARS,
};
pub use error::{EmbeddingError, IngestError, SearchError};
pub use extractor::{extract_text, extract_text_from_file, LopdfExtractor, PageText, PdfExtractor};
pub use index::VectorIndex;
pub use ingest::{build_index, build_index_from_text, digest_bytes, BuiltIndex};
pub use llm::{ChatCompletionClient, CompletionSettings, DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL};
pub use models::{
    Answer, DocumentRecord, IngestReport, IngestionOptions, Passage, ScoredPassage,
};
pub use orchestrator::QaCoordinator;
pub use session::RetrievalSession;
pub use stores::{InMemoryDocumentRegistry, SqliteDocumentRegistry};
pub use synthesizer::{build_prompt, AnswerSynthesizer, SynthesisOptions};
pub use traits::{DocumentRegistry, TextCompleter};
