//! Request routing
//!
//! ```text
//! GET     /, /index.html      UI document (no auth)
//! GET     /api/entries        {entries, count}, optional ?type=
//! GET     /api/latest         newest entry
//! GET     /api/entry/:id      single entry
//! POST    /api/push           create entry
//! DELETE  /api/entry/:id      remove entry
//! OPTIONS *                   CORS preflight (no auth)
//! ```
//!
//! Everything under `/api` passes the token check before any store access.
//! Any other method or path answers 404 `{"error": "not found"}`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use super::body::read_limited;
use super::error::ApiError;
use super::ui;
use crate::classify::classify;
use crate::config::Config;
use crate::security::TokenAuthenticator;
use crate::store::{self, Change, Entry, EntryStore, EntryType};

const ALLOWED_METHODS: &str = "GET, POST, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, X-Token, Authorization";

/// State shared by all handlers
#[derive(Debug)]
pub struct AppState {
    /// Entry persistence
    pub store: EntryStore,
    /// Token check for `/api`
    pub auth: TokenAuthenticator,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl AppState {
    /// Build state from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: EntryStore::new(config.storage.data_path.clone()),
            auth: TokenAuthenticator::new(config.token().map(str::to_string)),
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

/// Body of `POST /api/push`
#[derive(Debug, Default, Deserialize)]
pub struct PushRequest {
    /// Payload
    #[serde(default)]
    pub content: Option<String>,
    /// Title
    #[serde(default)]
    pub label: Option<String>,
    /// Declared type; inferred when absent or empty
    #[serde(default, rename = "type")]
    pub entry_type: Option<String>,
    /// Original file name
    #[serde(default)]
    pub filename: Option<String>,
}

/// Response of `POST /api/push`
#[derive(Debug, Serialize, Deserialize)]
pub struct PushResponse {
    /// Always true
    pub ok: bool,
    /// Id of the new entry
    pub id: String,
    /// Resolved type
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

/// Response of `GET /api/entries`
#[derive(Debug, Serialize, Deserialize)]
pub struct EntriesResponse {
    /// Entries, newest first
    pub entries: Vec<Entry>,
    /// Number of entries returned
    pub count: usize,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(rename = "type")]
    entry_type: Option<String>,
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/entries", get(list_entries).fallback(not_found))
        .route("/latest", get(latest_entry).fallback(not_found))
        .route(
            "/entry/:id",
            get(get_entry).delete(delete_entry).fallback(not_found),
        )
        .route("/push", post(push_entry).fallback(not_found))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/", get(ui::index).fallback(not_found))
        .route("/index.html", get(ui::index).fallback(not_found))
        .nest("/api", api)
        .fallback(not_found)
        .layer(middleware::from_fn(catch_panic))
        .layer(middleware::from_fn(cors))
        .layer(middleware::from_fn(log_request))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.auth.authorize(request.headers()) {
        debug!("Rejected unauthorized {} {}", request.method(), request.uri().path());
        // Consume the body so the connection can carry the next request
        let _ = read_limited(request.into_body(), state.max_body_bytes).await;
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        return response;
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

async fn catch_panic(request: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            error!("Request handler panicked");
            ApiError::Internal("internal server error".to_string()).into_response()
        }
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_success() {
        debug!("{} {} {} ({} ms)", method, path, status.as_u16(), elapsed_ms);
    } else {
        info!("{} {} {} ({} ms)", method, path, status.as_u16(), elapsed_ms);
    }

    response
}

async fn not_found() -> ApiError {
    ApiError::NotFound("not found")
}

async fn list_entries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<EntriesResponse>, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let filter = parse_type(params.entry_type.as_deref())?;

    let mut entries = state.store.snapshot().await?;
    if let Some(entry_type) = filter {
        entries.retain(|e| e.entry_type == entry_type);
    }

    let count = entries.len();
    Ok(Json(EntriesResponse { entries, count }))
}

async fn latest_entry(State(state): State<Arc<AppState>>) -> Result<Json<Entry>, ApiError> {
    state
        .store
        .snapshot()
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or(ApiError::NotFound("empty"))
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    state
        .store
        .snapshot()
        .await?
        .into_iter()
        .find(|e| e.id == id)
        .map(Json)
        .ok_or(ApiError::NotFound("not found"))
}

async fn push_entry(
    State(state): State<Arc<AppState>>,
    body: Body,
) -> Result<(StatusCode, Json<PushResponse>), ApiError> {
    let bytes = read_limited(body, state.max_body_bytes).await?;

    let request: PushRequest = if bytes.is_empty() {
        PushRequest::default()
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?
    };

    let declared = parse_type(request.entry_type.as_deref())?;
    let raw = request.content.unwrap_or_default();

    // Encoded payloads are kept verbatim; text is trimmed
    let content = match declared {
        Some(t) if t.is_encoded_payload() => raw,
        _ => raw.trim().to_string(),
    };
    if content.is_empty() {
        return Err(ApiError::BadRequest("content required".to_string()));
    }

    let entry_type = declared.unwrap_or_else(|| classify(&content));
    let preview = preview(&content, entry_type);

    let entry = state
        .store
        .update(move |entries| {
            let mut entry = Entry::new(content, entry_type, request.label, request.filename);
            if entries.iter().any(|e| e.id == entry.id) {
                entry.id = store::fresh_id(entries);
            }
            *entries = store::insert_newest(std::mem::take(entries), entry.clone());
            Change::Persist(entry)
        })
        .await?;

    info!("+ [{:5}] {} ({})", entry.entry_type, preview, entry.id);

    Ok((
        StatusCode::CREATED,
        Json(PushResponse {
            ok: true,
            id: entry.id,
            entry_type: entry.entry_type,
        }),
    ))
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target = id.clone();
    let removed = state
        .store
        .update(move |entries| {
            let (remaining, removed) = store::remove_by_id(std::mem::take(entries), &target);
            *entries = remaining;
            if removed {
                Change::Persist(true)
            } else {
                Change::Discard(false)
            }
        })
        .await?;

    if !removed {
        return Err(ApiError::NotFound("not found"));
    }

    info!("- {}", id);
    Ok(Json(json!({ "ok": true })))
}

/// Parse an optional type name; empty means "not given"
fn parse_type(value: Option<&str>) -> Result<Option<EntryType>, ApiError> {
    match value {
        None | Some("") => Ok(None),
        Some(name) => name
            .parse::<EntryType>()
            .map(Some)
            .map_err(|e| ApiError::BadRequest(e.to_string())),
    }
}

fn preview(content: &str, entry_type: EntryType) -> String {
    if entry_type.is_encoded_payload() {
        return format!("<{} bytes>", content.len());
    }
    content
        .chars()
        .take(60)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type(None).unwrap(), None);
        assert_eq!(parse_type(Some("")).unwrap(), None);
        assert_eq!(parse_type(Some("image")).unwrap(), Some(EntryType::Image));
        assert!(matches!(
            parse_type(Some("movie")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("a\nb", EntryType::Text), "a b");
        assert_eq!(preview(&"x".repeat(100), EntryType::Text).len(), 60);
        assert_eq!(
            preview("data:image/png;base64,AAAA", EntryType::Image),
            "<26 bytes>"
        );
    }
}
