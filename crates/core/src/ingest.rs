use crate::chunking::{chunk_text, normalize_whitespace, ChunkingConfig};
use crate::embeddings::TextEmbedder;
use crate::error::{EmbeddingError, IngestError};
use crate::extractor::{join_pages, PdfExtractor};
use crate::index::VectorIndex;
use crate::models::IngestionOptions;
use sha2::{Digest, Sha256};
use tracing::info;

/// A fully built index plus what was learned about the source document.
#[derive(Debug)]
pub struct BuiltIndex {
    pub index: VectorIndex,
    pub page_count: usize,
    pub checksum: String,
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Extract, chunk, embed and index a PDF. CPU bound; run it off the async
/// executor.
pub fn build_index(
    bytes: &[u8],
    extractor: &dyn PdfExtractor,
    embedder: &dyn TextEmbedder,
    options: &IngestionOptions,
) -> Result<BuiltIndex, IngestError> {
    ChunkingConfig::from(options).validate()?;

    let checksum = digest_bytes(bytes);
    let pages = extractor.extract_pages(bytes)?;
    let text = join_pages(&pages);
    info!(
        checksum = %checksum,
        pages = pages.len(),
        chars = text.chars().count(),
        "extracted pdf text"
    );

    let index = build_index_from_text(&text, embedder, options)?;
    Ok(BuiltIndex {
        index,
        page_count: pages.len(),
        checksum,
    })
}

pub fn build_index_from_text(
    text: &str,
    embedder: &dyn TextEmbedder,
    options: &IngestionOptions,
) -> Result<VectorIndex, IngestError> {
    let config = ChunkingConfig::from(options);
    let text = if options.normalize_whitespace {
        normalize_whitespace(text)
    } else {
        text.to_string()
    };

    // Whitespace-only windows carry nothing to retrieve.
    let passages: Vec<_> = chunk_text(&text, config)?
        .into_iter()
        .filter(|passage| !passage.text.trim().is_empty())
        .collect();

    if passages.is_empty() {
        return Err(IngestError::EmptyIndex(
            "the document has no extractable text".to_string(),
        ));
    }

    let inputs: Vec<&str> = passages.iter().map(|passage| passage.text.as_str()).collect();
    let embeddings = embedder.embed_batch(&inputs)?;
    if embeddings.len() != passages.len() {
        return Err(EmbeddingError::Backend(format!(
            "embedding count {} doesn't match passage count {}",
            embeddings.len(),
            passages.len()
        ))
        .into());
    }

    info!(
        passages = passages.len(),
        chunk_size = config.size,
        chunk_overlap = config.overlap,
        model = embedder.model_id(),
        "embedded passages"
    );

    VectorIndex::build(passages.into_iter().zip(embeddings).collect(), embedder.model_id())
}
