//! REST handlers.
//!
//! | Method | Path              | Purpose                              |
//! |--------|-------------------|--------------------------------------|
//! | POST   | `/sessions`       | start a conversation                 |
//! | GET    | `/sessions/{id}`  | conversation with full history       |
//! | POST   | `/messages`       | ask a question in a session          |
//! | POST   | `/knowledge`      | upload a document (multipart)        |
//! | GET    | `/knowledge`      | list documents, newest first         |
//! | DELETE | `/knowledge/{id}` | remove a document                    |
//! | GET    | `/health`         | liveness                             |
//! | GET    | `/status`         | storage, credential, outcome counts  |

use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use deskmate_agent::OutcomeSnapshot;
use deskmate_core::knowledge::KnowledgeDocument;
use deskmate_core::provider::CredentialStatus;
use deskmate_core::session::Session;
use deskmate_ingest::Upload;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::SharedState;
use crate::error::ApiError;

// ── Sessions ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `POST /sessions`: the body is optional; an empty body means anonymous.
pub async fn create_session(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let request: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?
    };

    let session = state.sessions.create(request.user_id.as_deref()).await?;
    info!(session_id = %session.id, user_id = %session.user_id, "Session created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /sessions/{id}`
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.find_by_id(&id).await?))
}

// ── Messages ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub response: String,
    pub session_id: String,
}

/// `POST /messages`
pub async fn send_message(
    State(state): State<SharedState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let reply = state
        .orchestrator
        .handle_message(
            request.session_id.as_deref().unwrap_or_default(),
            request.message.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(MessageResponse {
        response: reply.response,
        session_id: reply.session_id,
    }))
}

// ── Knowledge ─────────────────────────────────────────────────────────────

/// `POST /knowledge`, as a multipart form.
///
/// Fields: `file` (required), `declaredType`, `filename`, `size`. The type
/// and name default to the file part's own content type and file name.
pub async fn upload_knowledge(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<KnowledgeDocument>), ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut file: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    let mut declared_type: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut declared_size: Option<u64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let part_name = field.file_name().map(str::to_string);
                let part_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                file = Some((bytes.to_vec(), part_name, part_type));
            }
            "declaredType" | "filename" | "size" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                let value = value.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "declaredType" => declared_type = Some(value),
                    "filename" => filename = Some(value),
                    _ => declared_size = value.parse().ok(),
                }
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (bytes, part_name, part_type) =
        file.ok_or_else(|| ApiError::bad_request("file is required"))?;
    let declared_type = declared_type
        .or(part_type)
        .ok_or_else(|| ApiError::bad_request("declaredType is required"))?;

    if let Some(size) = declared_size.filter(|s| *s != bytes.len() as u64) {
        debug!(declared = size, received = bytes.len(), "Declared size differs from upload");
    }

    let document = state
        .ingestor
        .ingest(Upload {
            filename: filename.or(part_name).unwrap_or_default(),
            declared_type,
            bytes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

/// `GET /knowledge`
pub async fn list_knowledge(
    State(state): State<SharedState>,
) -> Result<Json<Vec<KnowledgeDocument>>, ApiError> {
    Ok(Json(state.knowledge.list_all().await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// `DELETE /knowledge/{id}`
pub async fn delete_knowledge(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.knowledge.delete_by_id(&id).await?;
    info!(id = %id, "Knowledge document deleted");
    Ok(Json(DeleteResponse {
        success: true,
        message: "Knowledge document deleted successfully".into(),
    }))
}

// ── Health & status ───────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: chrono::Utc::now(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub server: &'static str,
    pub version: &'static str,
    pub uptime_secs: i64,
    pub storage: StorageStatus,
    pub provider: ProviderStatus,
    pub context_strategy: String,
    pub outcomes: OutcomeSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    pub backend: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub model: String,
    pub credential: CredentialStatus,
}

/// `GET /status` never fails; an unreachable store is reported, not raised.
pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let ping = match state.knowledge.ping().await {
        Ok(()) => state.sessions.ping().await,
        Err(e) => Err(e),
    };

    let storage = match ping {
        Ok(()) => StorageStatus {
            backend: state.knowledge.name().to_string(),
            connected: true,
            documents: state.knowledge.count().await.ok(),
            error: None,
        },
        Err(e) => StorageStatus {
            backend: state.knowledge.name().to_string(),
            connected: false,
            documents: None,
            error: Some(e.to_string()),
        },
    };

    let provider = state.orchestrator.provider();

    Json(StatusResponse {
        server: "running",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        storage,
        provider: ProviderStatus {
            name: provider.name().to_string(),
            model: state.provider_model.clone(),
            credential: provider.credential_status(),
        },
        context_strategy: state.orchestrator.assembler().strategy_name().to_string(),
        outcomes: state.orchestrator.metrics(),
    })
}
