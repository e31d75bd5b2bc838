use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("embedding backend failed: {0}")]
    Backend(String),

    #[error("embedding dimension {actual} does not match model dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload has no file name")]
    MissingFileName,

    #[error("pdf extraction failed: {0}")]
    Extraction(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("document produced no passages: {0}")]
    EmptyIndex(String),

    #[error("passage {position} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("metadata store error: {0}")]
    Metadata(String),

    #[error("ingestion worker failed: {0}")]
    Worker(String),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::MissingFileName => "invalid_argument",
            Self::Extraction(_) => "extraction_error",
            Self::InvalidChunkConfig(_) => "config_error",
            Self::Embedding(_) => "embedding_error",
            Self::EmptyIndex(_) => "empty_index",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Metadata(_) => "metadata_error",
            Self::Worker(_) => "worker_error",
        }
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Metadata(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotReady(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("query embedder {query} does not match index embedder {index}")]
    ModelMismatch { index: String, query: String },

    #[error("answer synthesis failed: {0}")]
    Synthesis(String),

    #[error("answer synthesis timed out after {0:?}")]
    SynthesisTimeout(std::time::Duration),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("query worker failed: {0}")]
    Worker(String),
}

impl SearchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotReady(_) => "not_ready",
            Self::Embedding(_) => "embedding_error",
            Self::ModelMismatch { .. } => "model_mismatch",
            Self::Synthesis(_) | Self::Http(_) | Self::Serialization(_) => "synthesis_error",
            Self::SynthesisTimeout(_) => "synthesis_timeout",
            Self::Url(_) => "config_error",
            Self::Worker(_) => "worker_error",
        }
    }
}
