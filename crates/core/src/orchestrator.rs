use crate::embeddings::TextEmbedder;
use crate::error::{IngestError, SearchError};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::index::VectorIndex;
use crate::ingest::build_index;
use crate::models::{Answer, IngestReport, IngestionOptions, ScoredPassage};
use crate::session::RetrievalSession;
use crate::synthesizer::{AnswerSynthesizer, SynthesisOptions};
use crate::traits::{DocumentRegistry, TextCompleter};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Upload and ask use cases over one shared [`RetrievalSession`].
pub struct QaCoordinator {
    extractor: Arc<dyn PdfExtractor>,
    embedder: Arc<dyn TextEmbedder>,
    registry: Arc<dyn DocumentRegistry>,
    synthesizer: AnswerSynthesizer,
    session: Arc<RetrievalSession>,
    options: IngestionOptions,
    writer: Mutex<()>,
}

impl QaCoordinator {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        completer: Arc<dyn TextCompleter>,
        registry: Arc<dyn DocumentRegistry>,
    ) -> Self {
        Self {
            extractor: Arc::new(LopdfExtractor),
            embedder,
            registry,
            synthesizer: AnswerSynthesizer::new(completer, SynthesisOptions::default()),
            session: Arc::new(RetrievalSession::new()),
            options: IngestionOptions::default(),
            writer: Mutex::new(()),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PdfExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_options(mut self, options: IngestionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: AnswerSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_session(mut self, session: Arc<RetrievalSession>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Arc<RetrievalSession> {
        &self.session
    }

    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<dyn DocumentRegistry> {
        &self.registry
    }

    /// Builds a fresh index from `bytes` and installs it. The session is
    /// only touched after every stage has succeeded; a failed or dropped
    /// call leaves the previous index in place.
    pub async fn ingest_pdf(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestReport, IngestError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(IngestError::MissingFileName);
        }

        let _writer = self.writer.lock().await;

        let extractor = Arc::clone(&self.extractor);
        let embedder = Arc::clone(&self.embedder);
        let options = self.options.clone();
        let built = tokio::task::spawn_blocking(move || {
            build_index(&bytes, extractor.as_ref(), embedder.as_ref(), &options)
        })
        .await
        .map_err(|error| IngestError::Worker(error.to_string()))??;

        let ingested_at = Utc::now();
        let newly_recorded = self.registry.record_upload(filename, ingested_at).await?;
        if !newly_recorded {
            info!(filename, "filename already recorded, rebuilding index anyway");
        }

        let index_id = built.index.id();
        let passage_count = built.index.len();
        let generation = self.session.replace(built.index);

        Ok(IngestReport {
            filename: filename.to_string(),
            checksum: built.checksum,
            page_count: built.page_count,
            passage_count,
            index_id,
            generation,
            newly_recorded,
            ingested_at,
        })
    }

    /// Top `k` passages for `question` from the current index.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredPassage>, SearchError> {
        let index = self.session.current()?;
        self.retrieve_from(&index, question, k).await
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, SearchError> {
        // One snapshot for the whole request, even if an upload lands mid-way.
        let index = self.session.current()?;
        let passages = self.retrieve_from(&index, question, self.options.top_k).await?;
        debug!(
            index_id = %index.id(),
            hits = passages.len(),
            "retrieved passages for question"
        );

        let answer = self.synthesizer.synthesize(question, &passages).await?;
        Ok(Answer {
            question: question.to_string(),
            answer,
            index_id: index.id(),
            passages,
        })
    }

    async fn retrieve_from(
        &self,
        index: &VectorIndex,
        question: &str,
        k: usize,
    ) -> Result<Vec<ScoredPassage>, SearchError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SearchError::InvalidArgument("question is empty".to_string()));
        }
        if index.model_id() != self.embedder.model_id() {
            return Err(SearchError::ModelMismatch {
                index: index.model_id().to_string(),
                query: self.embedder.model_id().to_string(),
            });
        }

        let embedder = Arc::clone(&self.embedder);
        let text = question.to_string();
        let query_vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|error| SearchError::Worker(error.to_string()))??;

        index.query(&query_vector, k)
    }
}
