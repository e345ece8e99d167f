//! HTTP API.
//!
//! - `POST /agent/invoke`: run the agent on `{"input": ...}`
//! - `GET /agent/tools`: registered tool schemas
//! - `GET /health`: liveness

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use runtime::{Agent, Backend, ModelError, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const DEFAULT_INPUT: &str = "What is 2 + 2?";

/// Shared state for all handlers.
pub struct AppState<B> {
    pub agent: Arc<Agent<B>>,
    /// Fired on shutdown; in-flight runs are cancelled with it.
    pub shutdown: CancellationToken,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            agent: Arc::clone(&self.agent),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<B: Backend + 'static> AppState<B> {
    pub fn new(agent: Agent<B>, shutdown: CancellationToken) -> Self {
        Self {
            agent: Arc::new(agent),
            shutdown,
        }
    }
}

/// Build the application router.
pub fn router<B: Backend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/agent/invoke", post(invoke::<B>))
        .route("/agent/tools", get(list_tools::<B>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request body for `/agent/invoke`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    #[serde(default = "default_input")]
    pub input: String,
}

fn default_input() -> String {
    DEFAULT_INPUT.to_string()
}

/// Response body for `/agent/invoke`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub output: String,
    pub metadata: RunMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    /// Tool rounds the run took.
    pub rounds: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// A failed request, rendered without transcript contents.
#[derive(Debug)]
pub enum ApiError {
    /// The body was not a valid invoke request.
    InvalidRequest(JsonRejection),
    Run(runtime::Error),
}

impl From<runtime::Error> for ApiError {
    fn from(error: runtime::Error) -> Self {
        Self::Run(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Run(
                runtime::Error::Model(ModelError::Unavailable(_)) | runtime::Error::Cancelled,
            ) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Run(runtime::Error::Model(_)) => StatusCode::BAD_GATEWAY,
            Self::Run(runtime::Error::MaxRoundsExceeded(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Run(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Run(e) => e.kind(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::InvalidRequest(rejection) => rejection.body_text(),
            // Provider bodies can echo the request; keep them out of responses.
            Self::Run(runtime::Error::Model(ModelError::Unavailable(_))) => {
                "the model service is unavailable".to_string()
            }
            Self::Run(runtime::Error::Model(_)) => {
                "the model returned a response that could not be used".to_string()
            }
            Self::Run(other) => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.message(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

async fn invoke<B: Backend + 'static>(
    State(state): State<AppState<B>>,
    payload: Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<InvokeResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state
        .agent
        .run_with_cancel(&request.input, state.shutdown.child_token())
        .await?;

    Ok(Json(InvokeResponse {
        output: outcome.output,
        metadata: RunMetadata {
            run_id: outcome.run_id,
            rounds: outcome.rounds,
        },
    }))
}

async fn list_tools<B: Backend + 'static>(State(state): State<AppState<B>>) -> Json<Vec<Value>> {
    Json(tool_schemas(state.agent.registry()))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Tool specs as `{name, description, parameters}` with JSON Schema parameters.
pub fn tool_schemas(registry: &ToolRegistry) -> Vec<Value> {
    registry
        .specs()
        .iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "parameters": spec.json_schema(),
            })
        })
        .collect()
}
