//! HTTP API over the transaction processor

use crate::bridge::BridgeValidator;
use crate::config::ApiConfig;
use crate::error::{EngineError, EngineResult};
use crate::handlers::TransactionProcessor;
use crate::intent::{parse_intent, TransactionIntent};
use crate::log_store::{LogEntry, TransactionLogStore};
use crate::remote::SwapApi;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<TransactionProcessor>,
    pub validator: Arc<BridgeValidator>,
    pub swaps: Arc<dyn SwapApi>,
    pub log_store: Arc<dyn TransactionLogStore>,
    pub request_deadline: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/transactions", post(process_transaction))
        .route("/transactions/:user_id", get(list_transactions))
        .route("/bridge/tokens", get(bridge_tokens))
        .route("/swaps/:swap_id", get(swap_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server until `shutdown` is cancelled
pub async fn run_server(
    config: ApiConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> EngineResult<()> {
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

/// Engine errors rendered as JSON with a matching status code
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.root() {
            EngineError::Validation(_) | EngineError::IntentParse(_) => StatusCode::BAD_REQUEST,
            EngineError::UnsupportedAction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::RemoteApi { .. }
            | EngineError::Transport(_)
            | EngineError::MalformedResponse { .. }
            | EngineError::RetriesExhausted { .. } => StatusCode::BAD_GATEWAY,
            EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EngineError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Config(_) | EngineError::Io(_) | EngineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Process an intent and record the outcome for the user
async fn process_transaction(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let intent = match (request.intent, request.raw_intent) {
        (Some(intent), _) => intent,
        (None, Some(raw)) => parse_intent(&raw)?,
        (None, None) => {
            return Err(EngineError::Validation(
                "Either intent or rawIntent is required".to_string(),
            )
            .into())
        }
    };

    let result = state
        .processor
        .process_with_deadline(&intent, state.request_deadline)
        .await;

    let entry = match &result {
        Ok(processed) => LogEntry::success(&request.user_id, processed.clone()),
        Err(e) => LogEntry::failure(&request.user_id, &intent.action, e.to_string()),
    };
    if let Err(e) = state.log_store.record(entry).await {
        warn!("Failed to record transaction log for {}: {}", request.user_id, e);
    }

    Ok(Json(result?))
}

async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.log_store.list_for_user(&user_id).await?;
    Ok(Json(entries))
}

/// Tokens that can be bridged between two networks
async fn bridge_tokens(
    State(state): State<AppState>,
    Query(query): Query<TokensQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let source_network = state.validator.format_network(&query.source);
    let destination_network = state.validator.format_network(&query.destination);
    let tokens = state
        .validator
        .available_tokens(&source_network, &destination_network)
        .await?;

    Ok(Json(TokensResponse {
        source_network,
        destination_network,
        tokens,
    }))
}

async fn swap_status(
    State(state): State<AppState>,
    Path(swap_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let swap = state.swaps.get_swap_status(&swap_id).await?;
    Ok(Json(swap))
}

// Request and response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    #[serde(alias = "user_id")]
    user_id: String,
    #[serde(default)]
    intent: Option<TransactionIntent>,
    #[serde(default, alias = "raw_intent")]
    raw_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokensQuery {
    source: String,
    destination: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct TokensResponse {
    source_network: String,
    destination_network: String,
    tokens: Vec<String>,
}
