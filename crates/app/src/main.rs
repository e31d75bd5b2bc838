mod server;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_qa_core::{
    AnswerSynthesizer, CharacterNgramEmbedder, ChatCompletionClient, ChunkingConfig,
    CompletionSettings, IngestionOptions, QaCoordinator, SqliteDocumentRegistry,
    SynthesisOptions, TextCompleter, TextEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL,
};
use server::{run_server, ServerSettings, DEFAULT_ALLOWED_ORIGINS};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite file that records uploaded filenames
    #[arg(long, env = "PDF_QA_DATABASE", default_value = "file_meta_data.db")]
    database: PathBuf,

    /// Passage length in characters
    #[arg(long, default_value = "500")]
    chunk_size: usize,

    /// Characters shared by consecutive passages
    #[arg(long, default_value = "50")]
    chunk_overlap: usize,

    /// Collapse whitespace in extracted text before chunking
    #[arg(long, default_value_t = false)]
    normalize_whitespace: bool,

    /// Passages handed to the LLM per question
    #[arg(long, default_value = "4")]
    top_k: usize,

    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::Ngram)]
    embedder: EmbedderKind,

    /// Model name for the fastembed backend
    #[arg(long, default_value = "all-minilm-l6-v2")]
    embedding_model: String,

    /// Longer embedding input is truncated with a warning
    #[arg(long, default_value = "2000")]
    max_embed_chars: usize,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_ENDPOINT", default_value = DEFAULT_LLM_ENDPOINT)]
    llm_endpoint: String,

    /// Chat model name
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// API key for the completion endpoint
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    #[arg(long, default_value = "0.5")]
    llm_temperature: f32,

    #[arg(long, default_value = "1024")]
    llm_max_tokens: u32,

    /// Per-attempt timeout for the completion call
    #[arg(long, default_value = "60")]
    llm_timeout_secs: u64,

    /// Completion attempts per question (1 or 2)
    #[arg(long, default_value = "1")]
    llm_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Hashed character trigrams, no model download
    Ngram,
    /// Local sentence-transformer model (needs the `fastembed` feature)
    Fastembed,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload and ask HTTP API.
    Serve {
        /// Address to listen on
        #[arg(long, env = "PDF_QA_BIND", default_value = "127.0.0.1:8000")]
        bind: String,
        /// CORS origin allowed to call the API; repeat for several.
        #[arg(long = "allowed-origin")]
        allowed_origins: Vec<String>,
        /// Largest accepted upload in megabytes
        #[arg(long, default_value = "50")]
        max_upload_mb: usize,
    },
    /// Index one PDF and answer a single question about it.
    Ask {
        /// PDF file to index
        #[arg(long)]
        pdf: PathBuf,
        /// Question to ask
        #[arg(long)]
        question: String,
        /// Print the retrieved passages as well as the answer.
        #[arg(long, default_value_t = false)]
        show_passages: bool,
    },
}

impl Cli {
    fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            normalize_whitespace: self.normalize_whitespace,
            top_k: self.top_k,
        }
    }

    fn embedder(&self) -> anyhow::Result<Arc<dyn TextEmbedder>> {
        match self.embedder {
            EmbedderKind::Ngram => Ok(Arc::new(CharacterNgramEmbedder {
                dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
                max_input_chars: self.max_embed_chars,
            })),
            #[cfg(feature = "fastembed")]
            EmbedderKind::Fastembed => {
                let embedder = pdf_qa_core::FastEmbedEmbedder::new(&self.embedding_model, None)?
                    .with_max_input_chars(self.max_embed_chars);
                Ok(Arc::new(embedder))
            }
            #[cfg(not(feature = "fastembed"))]
            EmbedderKind::Fastembed => anyhow::bail!(
                "embedder `fastembed` ({}) requires building with `--features fastembed`",
                self.embedding_model
            ),
        }
    }

    fn validated_options(&self) -> anyhow::Result<IngestionOptions> {
        let options = self.ingestion_options();
        ChunkingConfig::from(&options).validate()?;
        if options.top_k == 0 {
            anyhow::bail!("--top-k must be at least 1");
        }
        Ok(options)
    }

    fn coordinator(&self) -> anyhow::Result<QaCoordinator> {
        let options = self.validated_options()?;

        let completer: Arc<dyn TextCompleter> = Arc::new(ChatCompletionClient::new(
            &self.llm_endpoint,
            self.llm_api_key.clone(),
            CompletionSettings {
                model: self.llm_model.clone(),
                temperature: self.llm_temperature,
                max_tokens: self.llm_max_tokens,
            },
        )?);
        let synthesizer = AnswerSynthesizer::new(
            Arc::clone(&completer),
            SynthesisOptions {
                timeout: Duration::from_secs(self.llm_timeout_secs),
                max_attempts: self.llm_attempts,
            },
        );
        let registry = SqliteDocumentRegistry::open(&self.database)
            .with_context(|| format!("opening {}", self.database.display()))?;

        Ok(
            QaCoordinator::new(self.embedder()?, completer, Arc::new(registry))
                .with_synthesizer(synthesizer)
                .with_options(options),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let qa = cli.coordinator()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        embedder = ?cli.embedder,
        "pdf-qa boot"
    );

    match cli.command {
        Command::Serve {
            bind,
            allowed_origins,
            max_upload_mb,
        } => {
            let allowed_origins = if allowed_origins.is_empty() {
                DEFAULT_ALLOWED_ORIGINS.iter().map(|origin| origin.to_string()).collect()
            } else {
                allowed_origins
            };
            let settings = ServerSettings {
                bind,
                allowed_origins,
                max_upload_bytes: max_upload_mb * 1024 * 1024,
            };
            run_server(Arc::new(qa), settings).await?;
        }
        Command::Ask {
            pdf,
            question,
            show_passages,
        } => {
            let bytes = tokio::fs::read(&pdf)
                .await
                .with_context(|| format!("reading {}", pdf.display()))?;
            let filename = pdf
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();

            let report = qa.ingest_pdf(&filename, bytes).await?;
            info!(
                filename = %report.filename,
                pages = report.page_count,
                passages = report.passage_count,
                "indexed pdf"
            );

            let answer = qa.ask(&question).await?;
            if show_passages {
                for hit in &answer.passages {
                    println!(
                        "[passage {}] distance={:.4}\n{}\n",
                        hit.passage.index,
                        hit.distance,
                        hit.passage.text.trim()
                    );
                }
            }
            println!("{}", answer.answer);
        }
    }

    Ok(())
}
