//! Gateway HTTP server — Axum-based routing and admin surface

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Form, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use shunt_core::{file_extension, RouteError, RouteResolver};
use shunt_store::RuleDb;

use crate::pages;
use crate::protocol::{AddFileRuleForm, AddPromptRuleForm, ChatCompletionForm, UploadResponse};

/// Shared state for all request handlers
#[derive(Clone)]
pub struct GatewayState {
    pub resolver: Arc<RouteResolver>,
    pub db: Arc<RuleDb>,
    pub uploads_dir: PathBuf,
    pub start_time: std::time::Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    /// Create a new gateway server
    pub fn new(bind: SocketAddr, db: Arc<RuleDb>, uploads_dir: PathBuf) -> Self {
        let state = GatewayState {
            resolver: Arc::new(RouteResolver::new(db.clone())),
            db,
            uploads_dir,
            start_time: std::time::Instant::now(),
        };
        Self { state, bind }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(pages::home_page))
            .route("/admin", get(pages::admin_page))
            .route("/models", get(models_handler))
            .route("/v1/chat/completions", post(chat_handler))
            .route("/upload/", post(upload_handler))
            .route("/admin/add_regex", post(add_prompt_rule_handler))
            .route("/admin/rules", get(prompt_rules_handler))
            .route("/admin/add_file_routing", post(add_file_rule_handler))
            .route("/admin/file_rules", get(file_rules_handler))
            .route("/api/status", get(status_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}", self.bind);

        axum::serve(listener, router).await?;

        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

// ── HTTP Handlers ──

async fn chat_handler(
    State(state): State<GatewayState>,
    Form(form): Form<ChatCompletionForm>,
) -> Response {
    match state
        .resolver
        .resolve_chat(&form.provider, &form.model, &form.prompt)
        .await
    {
        Ok(resolution) => Json(resolution).into_response(),
        Err(e) => error_response(e),
    }
}

async fn models_handler(State(state): State<GatewayState>) -> Response {
    match state.db.list_models().await {
        Ok(models) => {
            let names: Vec<String> = models.into_iter().map(|m| m.name).collect();
            Json(names).into_response()
        }
        Err(e) => error_response(RouteError::Store(e)),
    }
}

async fn upload_handler(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(data) => {
                        upload = Some((filename, data));
                        break;
                    }
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(serde_json::json!({"error": format!("failed to read upload: {}", e)})),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("malformed multipart body: {}", e)})),
                )
                    .into_response();
            }
        }
    }

    let Some((filename, data)) = upload else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "missing 'file' field"})),
        )
            .into_response();
    };

    // Strip any path components the client put in the filename
    let filename = Path::new(&filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    if let Err(e) = tokio::fs::create_dir_all(&state.uploads_dir).await {
        error!("Failed to create uploads dir {:?}: {}", state.uploads_dir, e);
        return storage_error();
    }
    let dest = state.uploads_dir.join(&filename);
    if let Err(e) = tokio::fs::write(&dest, &data).await {
        error!("Failed to persist upload {:?}: {}", dest, e);
        return storage_error();
    }
    debug!("Stored upload {:?} ({} bytes)", dest, data.len());

    match state.resolver.resolve_file(&file_extension(&filename)).await {
        Ok(resolution) => Json(UploadResponse {
            filename,
            provider: resolution.provider,
            model: resolution.model,
            response: resolution.response,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn add_prompt_rule_handler(
    State(state): State<GatewayState>,
    Form(form): Form<AddPromptRuleForm>,
) -> Response {
    match state
        .resolver
        .add_prompt_rule(&form.original_model, &form.regex_pattern, &form.redirect_model)
        .await
    {
        Ok(id) => {
            debug!("Added prompt rule #{} via admin", id);
            Redirect::to("/admin").into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn prompt_rules_handler(State(state): State<GatewayState>) -> Response {
    match state.db.list_prompt_rules().await {
        Ok(rules) => Json(rules).into_response(),
        Err(e) => error_response(RouteError::Store(e)),
    }
}

async fn add_file_rule_handler(
    State(state): State<GatewayState>,
    Form(form): Form<AddFileRuleForm>,
) -> Response {
    match state
        .resolver
        .add_file_rule(&form.file_type, &form.redirect_provider, &form.redirect_model)
        .await
    {
        Ok(id) => {
            debug!("Added file rule #{} via admin", id);
            Redirect::to("/admin").into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn file_rules_handler(State(state): State<GatewayState>) -> Response {
    match state.db.list_file_rules().await {
        Ok(rules) => Json(rules).into_response(),
        Err(e) => error_response(RouteError::Store(e)),
    }
}

async fn status_handler(State(state): State<GatewayState>) -> Response {
    let uptime = state.start_time.elapsed().as_secs();
    match state.db.stats().await {
        Ok(stats) => Json(serde_json::json!({
            "status": "ok",
            "models": stats.models,
            "prompt_rules": stats.prompt_rules,
            "file_rules": stats.file_rules,
            "uptime_secs": uptime,
        }))
        .into_response(),
        Err(e) => error_response(RouteError::Store(e)),
    }
}

/// Map a routing error onto the HTTP surface.
/// An unknown model is acknowledged with an error payload, not an HTTP
/// failure; rule rejections are client errors; store failures are opaque 500s.
fn error_response(err: RouteError) -> Response {
    match &err {
        RouteError::UnknownModel { .. } => (
            StatusCode::OK,
            Json(serde_json::json!({"error": "Model not supported"})),
        )
            .into_response(),
        RouteError::InvalidPattern { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": err.to_string()})),
        )
            .into_response(),
        RouteError::DuplicateFileType { .. } => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": err.to_string()})),
        )
            .into_response(),
        RouteError::Store(e) => {
            error!("Store failure: {:#}", e);
            storage_error()
        }
    }
}

fn storage_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "internal error"})),
    )
        .into_response()
}
