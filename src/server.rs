//! HTTP server.
//!
//! Exposes task CRUD plus the summary and chat endpoints as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/todos` | Create a task (201) |
//! | `GET`  | `/todos?skip=&limit=` | Page through tasks in id order |
//! | `GET`  | `/todos/{id}` | Fetch one task |
//! | `PUT`, `PATCH` | `/todos/{id}` | Partial update |
//! | `DELETE` | `/todos/{id}` | Hard delete |
//! | `POST` | `/api/tasks/summary` | Two-sentence summary of all tasks |
//! | `POST` | `/api/chat?query=&selected_text=` | Ask about the task list |
//!
//! # Error Contract
//!
//! Error responses carry a single `detail` string:
//!
//! ```json
//! { "detail": "Todo not found" }
//! ```
//!
//! Validation failures and malformed bodies or parameters are `422`, unknown
//! ids are `404`, and storage failures are `500`. The summary and chat
//! endpoints answer `200` with placeholder text when generation fails.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::models::{NewTask, Task, TaskUpdate};
use crate::state::AppState;
use crate::store::{TaskError, MAX_PAGE_SIZE};

/// Build the router with all routes and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/todos", get(handle_list).post(handle_create))
        .route(
            "/todos/{id}",
            get(handle_get)
                .put(handle_update)
                .patch(handle_update)
                .delete(handle_delete),
        )
        .route("/api/tasks/summary", post(handle_summary))
        .route("/api/chat", post(handle_chat))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind`. The server runs
/// until the process is terminated.
pub async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("todo server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct Detail {
    detail: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(Detail { detail: self.detail })).into_response()
    }
}

fn unprocessable(detail: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        detail: detail.into(),
    }
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Validation(msg) => unprocessable(msg),
            TaskError::NotFound(_) => AppError {
                status: StatusCode::NOT_FOUND,
                detail: err.to_string(),
            },
            TaskError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    detail: "Internal server error".to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        unprocessable(rejection.body_text())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /todos ============

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    MAX_PAGE_SIZE
}

async fn handle_create(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let Json(new) = payload?;
    let task = state.todos.create(new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn handle_list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Task>>, AppError> {
    let Query(params) = params?;
    Ok(Json(state.todos.list(params.skip, params.limit).await?))
}

async fn handle_get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Task>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.todos.get(id).await?))
}

async fn handle_update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> Result<Json<Task>, AppError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    Ok(Json(state.todos.update(id, update).await?))
}

async fn handle_delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Path(id) = id?;
    if !state.todos.delete(id).await? {
        return Err(TaskError::NotFound(id).into());
    }
    Ok(Json(serde_json::json!({ "detail": "Todo deleted successfully" })))
}

// ============ POST /api/tasks/summary ============

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn handle_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        summary: state.assistant.summarize().await,
    })
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatParams {
    query: String,
    #[serde(default)]
    selected_text: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    params: Result<Query<ChatParams>, QueryRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Query(params) = params?;
    Ok(Json(ChatResponse {
        response: state
            .assistant
            .chat(&params.query, &params.selected_text)
            .await,
    }))
}
