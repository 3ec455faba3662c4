//! HTTP API gateway for Deskmate.
//!
//! Exposes the chat, session and knowledge endpoints consumed by the chat
//! and admin UIs, plus health and status probes.
//!
//! Built on Axum. All collaborators are constructed once in [`start`] (or by
//! tests) and shared through [`AppState`].

pub mod api;
pub mod error;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use deskmate_agent::{ChatOrchestrator, ContextAssembler};
use deskmate_config::{AppConfig, GatewayConfig};
use deskmate_core::knowledge::KnowledgeStore;
use deskmate_core::provider::{CompletionProvider, CredentialStatus};
use deskmate_core::session::SessionStore;
use deskmate_ingest::KnowledgeIngestor;
use deskmate_providers::{ChatCompletionsProvider, FallbackResponder};
use deskmate_store::Stores;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

pub use error::{ApiError, ErrorResponse};

/// Multipart framing and text fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct AppState {
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub ingestor: Arc<KnowledgeIngestor>,
    pub gateway: GatewayConfig,
    pub provider_model: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the orchestrator and ingestor around already-built stores and provider.
    pub fn new(stores: Stores, provider: Arc<dyn CompletionProvider>, config: &AppConfig) -> Self {
        let orchestrator = ChatOrchestrator::new(
            stores.knowledge.clone(),
            stores.sessions.clone(),
            provider,
            FallbackResponder::from_seed(config.fallback.seed),
        )
        .with_assembler(ContextAssembler::from_config(&config.context));

        let ingestor =
            KnowledgeIngestor::new(stores.knowledge.clone(), config.gateway.max_upload_bytes);

        Self {
            knowledge: stores.knowledge,
            sessions: stores.sessions,
            orchestrator: Arc::new(orchestrator),
            ingestor: Arc::new(ingestor),
            gateway: config.gateway.clone(),
            provider_model: config.provider.model.clone(),
            started_at: chrono::Utc::now(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the Axum router with all routes.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.gateway.max_upload_bytes + MULTIPART_OVERHEAD;
    let cors = cors_layer(&state.gateway.cors_origins);

    Router::new()
        .route("/sessions", post(api::create_session))
        .route("/sessions/{id}", get(api::get_session))
        .route("/messages", post(api::send_message))
        .route(
            "/knowledge",
            post(api::upload_knowledge).get(api::list_knowledge),
        )
        .route("/knowledge/{id}", delete(api::delete_knowledge))
        .route("/health", get(api::health))
        .route("/status", get(api::status))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Opens the stores, builds the provider, and serves until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let stores = deskmate_store::open(&config.storage).await?;
    info!(backend = stores.knowledge.name(), "Storage ready");

    let provider = Arc::new(ChatCompletionsProvider::from_config(&config.provider));
    match provider.credential_status() {
        CredentialStatus::Configured => {
            info!(provider = %config.provider.name, model = %config.provider.model, "Completion provider configured")
        }
        CredentialStatus::InvalidFormat => error!(
            provider = %config.provider.name,
            prefix = %config.provider.credential_prefix,
            "API key has the wrong format; every answer will be a fallback"
        ),
        CredentialStatus::NotConfigured => warn!(
            provider = %config.provider.name,
            "No API key configured; every answer will be a fallback"
        ),
    }

    let state = Arc::new(AppState::new(stores, provider, &config));
    let app = build_router(state);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
