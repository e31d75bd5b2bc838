use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    /// Returns the text of every page in page order. Pages without text are
    /// kept with an empty string so page counts stay faithful.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        // Parsed in memory; nothing outlives this call.
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::Extraction(error.to_string()))?;

        if document.is_encrypted() {
            return Err(IngestError::Extraction(
                "encrypted pdf documents are not supported".to_string(),
            ));
        }

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::Extraction(format!("page {page_no}: {error}")))?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        debug!(page_count = pages.len(), "extracted pdf pages");
        Ok(pages)
    }
}

/// Concatenates page texts in order with no separator between pages.
pub fn join_pages(pages: &[PageText]) -> String {
    pages.iter().map(|page| page.text.as_str()).collect()
}

pub fn extract_text(bytes: &[u8]) -> Result<String, IngestError> {
    let pages = LopdfExtractor.extract_pages(bytes)?;
    Ok(join_pages(&pages))
}

pub fn extract_text_from_file(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path)?;
    extract_text(&bytes)
}
