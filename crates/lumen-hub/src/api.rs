//! REST API server — the Lumen hub endpoints.
//!
//! Endpoints:
//! - GET  /v1/health — Health check
//! - GET  /v1/providers — List providers and whether each is enabled
//! - GET  /v1/models/{provider} — List models for a provider
//! - POST /v1/chat — Relay a conversation and return the reply
//! - POST /v1/theme/generate — Run the theme generation pipeline

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lumen_core::error::LumenError;
use lumen_core::message::ChatMessage;
use lumen_core::provider::ChatRequest;
use lumen_core::theme::LintReport;

use crate::middleware::{logging_middleware, rate_limit_middleware};
use crate::providers::{ProviderInfo, ProviderRegistry};
use crate::theme::generate::{generate_theme, ThemeGenerationRequest, ThemePayload};

/// Shared API state. The registry is immutable after startup and every
/// generation request is independently stateless, so no locking is
/// needed across concurrent requests.
pub struct ApiState {
    pub providers: ProviderRegistry,
}

type SharedState = Arc<ApiState>;

// ─── Request/Response types ────────────────────────────────

#[derive(Deserialize)]
pub struct ChatApiRequest {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct ChatApiResponse {
    pub content: String,
    pub model: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Wire response for theme generation, success and failure alike.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeGenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint_results: Option<LintReport>,
}

/// Map a pipeline error onto the wire contract: content/validation
/// failures are 400s with a user-facing message, anything unexpected is
/// a 500. The lint report rides along when the error carries one.
fn theme_failure(err: LumenError) -> (StatusCode, ThemeGenerationResponse) {
    let status = match err {
        LumenError::Validation(_)
        | LumenError::ProviderDisabled(_)
        | LumenError::ParseContract(_)
        | LumenError::SecurityRejection(_)
        | LumenError::EmptyTheme { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = err.to_string();
    let lint_results = match err {
        LumenError::EmptyTheme { report } => Some(report),
        _ => None,
    };
    (
        status,
        ThemeGenerationResponse {
            success: false,
            theme: None,
            error: Some(message),
            lint_results,
        },
    )
}

// ─── Handlers ──────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn list_providers(State(state): State<SharedState>) -> Json<Vec<ProviderInfo>> {
    Json(state.providers.list())
}

async fn list_models(
    State(state): State<SharedState>,
    Path(provider): Path<String>,
) -> Result<Json<Vec<String>>, (StatusCode, Json<ErrorResponse>)> {
    let provider = state.providers.get(&provider).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    match provider.list_models().await {
        Ok(models) => Ok(Json(models)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatApiRequest>,
) -> Result<Json<ChatApiResponse>, (StatusCode, Json<ErrorResponse>)> {
    let provider = state.providers.get(&req.provider).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    if !provider.is_enabled() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: LumenError::ProviderDisabled(req.provider.clone()).to_string(),
            }),
        ));
    }

    match provider
        .chat(ChatRequest {
            messages: req.messages,
            model: req.model,
            ..Default::default()
        })
        .await
    {
        Ok(response) => Ok(Json(ChatApiResponse {
            content: response.content.unwrap_or_default(),
            model: response.model,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

async fn theme_generate(
    State(state): State<SharedState>,
    Json(req): Json<ThemeGenerationRequest>,
) -> (StatusCode, Json<ThemeGenerationResponse>) {
    let provider = match state.providers.get(&req.provider) {
        Ok(p) => p,
        Err(e) => {
            let (status, body) = theme_failure(e);
            return (status, Json(body));
        }
    };

    match generate_theme(provider.as_ref(), &req).await {
        Ok(success) => (
            StatusCode::OK,
            Json(ThemeGenerationResponse {
                success: true,
                theme: Some(success.theme),
                error: None,
                lint_results: Some(success.lint),
            }),
        ),
        Err(e) => {
            warn!("theme generation failed: {}", e);
            let (status, body) = theme_failure(e);
            (status, Json(body))
        }
    }
}

// ─── Server builder ────────────────────────────────────────

/// Build the API router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/providers", get(list_providers))
        .route("/v1/models/{provider}", get(list_models))
        .route("/v1/chat", post(chat))
        .route("/v1/theme/generate", post(theme_generate))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Start the API server.
pub async fn start_server(state: ApiState, host: &str, port: u16) -> anyhow::Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("🌐 Lumen hub listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_failures_are_400s() {
        for err in [
            LumenError::Validation("x".to_string()),
            LumenError::ProviderDisabled("openai".to_string()),
            LumenError::ParseContract("no fenced CSS block found".to_string()),
            LumenError::SecurityRejection("url(".to_string()),
            LumenError::EmptyTheme {
                report: LintReport::default(),
            },
        ] {
            let (status, body) = theme_failure(err);
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(!body.success);
            assert!(body.error.is_some());
        }
    }

    #[test]
    fn unexpected_failures_are_500s() {
        let (status, _) = theme_failure(LumenError::Provider("boom".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn empty_theme_failure_carries_the_lint_report() {
        let report = LintReport {
            valid: true,
            warnings: vec!["Removed --x: not in the whitelist".to_string()],
            errors: vec![],
        };
        let (_, body) = theme_failure(LumenError::EmptyTheme { report });
        assert_eq!(body.lint_results.unwrap().warnings.len(), 1);
    }
}
