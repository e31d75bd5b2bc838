//! HTTP boundary for the question answering service.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Welcome message |
//! | `GET`  | `/health` | Status, version and whether a document is loaded |
//! | `POST` | `/upload-pdf` | Multipart field `file`; rebuilds the index |
//! | `POST` | `/ask` | `{ "question": "..." }` → `{ "answer": "..." }` |
//!
//! Errors use one body shape:
//!
//! ```json
//! { "error": { "code": "not_ready", "message": "Knowledge base not loaded. Upload a PDF first." } }
//! ```
//!
//! `not_ready` maps to 404 so clients can tell "upload first" apart from
//! server failures (5xx).

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pdf_qa_core::{IngestError, QaCoordinator, SearchError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost",
    "http://localhost:5173",
    "http://127.0.0.1",
    "http://127.0.0.1:5173",
];

#[derive(Clone)]
struct AppState {
    qa: Arc<QaCoordinator>,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

pub fn router(qa: Arc<QaCoordinator>, settings: &ServerSettings) -> anyhow::Result<Router> {
    let origins = settings
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Ok(Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/upload-pdf", post(handle_upload))
        .route("/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(cors)
        .with_state(AppState { qa }))
}

pub async fn run_server(qa: Arc<QaCoordinator>, settings: ServerSettings) -> anyhow::Result<()> {
    let app = router(qa, &settings)?;
    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!(bind = %settings.bind, "pdf-qa server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(error = %error, "failed to listen for shutdown signal");
            }
        })
        .await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(code = %self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(error: IngestError) -> Self {
        let status = match &error {
            IngestError::MissingFileName | IngestError::InvalidChunkConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            IngestError::Extraction(_) | IngestError::EmptyIndex(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IngestError::Io(_)
            | IngestError::Embedding(_)
            | IngestError::DimensionMismatch { .. }
            | IngestError::Metadata(_)
            | IngestError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, error.kind(), format!("Processing failed: {error}"))
    }
}

impl From<SearchError> for AppError {
    fn from(error: SearchError) -> Self {
        let status = match &error {
            SearchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            SearchError::NotReady(_) => StatusCode::NOT_FOUND,
            SearchError::ModelMismatch { .. } => StatusCode::CONFLICT,
            SearchError::Synthesis(_) | SearchError::Http(_) | SearchError::Serialization(_) => {
                StatusCode::BAD_GATEWAY
            }
            SearchError::SynthesisTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SearchError::Embedding(_) | SearchError::Url(_) | SearchError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, error.kind(), error.to_string())
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to the PDF question answering API",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    ready: bool,
    generation: u64,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = state.qa.session();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ready: session.is_ready(),
        generation: session.generation(),
    })
}

// ============ POST /upload-pdf ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    filename: String,
    pages: usize,
    passages: usize,
    index_id: String,
    newly_recorded: bool,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| bad_request(error.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| bad_request("the `file` field must carry a filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|error| bad_request(error.to_string()))?;

        info!(filename = %filename, bytes = bytes.len(), "received upload");
        let report = state.qa.ingest_pdf(&filename, bytes.to_vec()).await?;

        return Ok(Json(UploadResponse {
            message: "PDF uploaded, processed, and indexed successfully".to_string(),
            filename: report.filename,
            pages: report.page_count,
            passages: report.passage_count,
            index_id: report.index_id.to_string(),
            newly_recorded: report.newly_recorded,
        }));
    }

    Err(bad_request("multipart field `file` is required"))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    let answer = state.qa.ask(&request.question).await?;
    Ok(Json(AskResponse {
        answer: answer.answer,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pdf_qa_core::{
        CharacterNgramEmbedder, InMemoryDocumentRegistry, IngestionOptions, PageText,
        PdfExtractor, TextCompleter,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    struct Utf8Extractor;

    impl PdfExtractor for Utf8Extractor {
        fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
            let text = std::str::from_utf8(bytes)
                .map_err(|error| IngestError::Extraction(error.to_string()))?;
            Ok(vec![PageText {
                number: 1,
                text: text.to_string(),
            }])
        }
    }

    struct FixedCompleter;

    #[async_trait]
    impl TextCompleter for FixedCompleter {
        async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
            if prompt.contains("sky is blue") {
                Ok("The sky is blue.".to_string())
            } else {
                Ok("I don't know.".to_string())
            }
        }
    }

    fn app() -> Router {
        let qa = QaCoordinator::new(
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(FixedCompleter),
            Arc::new(InMemoryDocumentRegistry::new()),
        )
        .with_extractor(Arc::new(Utf8Extractor))
        .with_options(IngestionOptions {
            chunk_size: 20,
            chunk_overlap: 5,
            ..Default::default()
        });

        let settings = ServerSettings {
            bind: "127.0.0.1:0".to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            max_upload_bytes: 1024 * 1024,
        };
        router(Arc::new(qa), &settings).expect("router should build")
    }

    fn upload_request(filename: &str, content: &str) -> Request<Body> {
        let boundary = "pdfqaboundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/upload-pdf")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn ask_request(question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "question": question }).to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn ask_before_upload_is_not_found() {
        let response = app().oneshot(ask_request("What color is the sky?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "not_ready");
    }

    #[tokio::test]
    async fn upload_then_ask_answers_from_document() {
        let app = app();

        let response = app
            .clone()
            .oneshot(upload_request("colors.pdf", "The sky is blue. Grass is green."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["filename"], "colors.pdf");
        assert_eq!(body["passages"], 2);

        let response = app.clone().oneshot(ask_request("What color is the sky?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["answer"], "The sky is blue.");

        let health = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(health).await;
        assert_eq!(body["ready"], true);
        assert_eq!(body["generation"], 1);
    }

    #[tokio::test]
    async fn malformed_question_body_uses_error_shape() {
        let request = Request::builder()
            .method("POST")
            .uri("/ask")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"q": 1}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("question"));
    }

    #[tokio::test]
    async fn empty_document_is_unprocessable() {
        let response = app().oneshot(upload_request("scan.pdf", "   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "empty_index");
    }

    #[tokio::test]
    async fn missing_file_field_is_bad_request() {
        let boundary = "pdfqaboundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/upload-pdf")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn synthesis_failures_are_gateway_errors() {
        let error = AppError::from(SearchError::Synthesis("quota".to_string()));
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(error.code, "synthesis_error");

        let error = AppError::from(SearchError::SynthesisTimeout(std::time::Duration::from_secs(1)));
        assert_eq!(error.status, StatusCode::GATEWAY_TIMEOUT);
    }
}
