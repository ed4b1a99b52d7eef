//! HTTP surface: `GET /search`, `GET|PUT /search/allowed`, `GET /health`.
//!
//! Errors are returned as `{"error": {"code": "...", "message": "..."}}` with:
//!
//! | error                       | status |
//! |-----------------------------|--------|
//! | unknown collection, malformed query, validation | 400 |
//! | authorization, anonymous caller | 401 |
//! | authorization, signed-in caller | 403 |
//! | store timeout               | 408    |
//! | any other store failure     | 500    |

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use bson::Bson;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::access::CallerContext;
use crate::admin::AdminConfig;
use crate::allowlist::AllowListStore;
use crate::auth::{Authenticator, StaticTokens, bearer_token};
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::errors::{DbError, SearchError};
use crate::gateway::{DEFAULT_LIMIT, DEFAULT_SORT, SearchGateway, SearchRequest};
use crate::kinds::CollectionRegistry;
use crate::query::Order;
use crate::settings::{FileSettings, Settings};

mod built {
    include!(concat!(env!("OUT_DIR"), "/compiled_features.rs"));
}

/// Everything a handler needs, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SearchGateway>,
    pub admin: AdminConfig,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    #[must_use]
    pub fn new(gateway: SearchGateway, auth: Arc<dyn Authenticator>) -> Self {
        let admin = AdminConfig::new(gateway.allow_list().clone());
        Self { gateway: Arc::new(gateway), admin, auth }
    }

    /// Assembles settings, the seeded in-memory store, the gateway and the
    /// token table described by `cfg`.
    ///
    /// # Errors
    /// Fails when persisted settings or seed files cannot be read.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, SearchError> {
        let settings = match &cfg.settings_path {
            Some(p) => Settings::new(Arc::new(FileSettings::new(p))),
            None => Settings::in_memory(),
        };
        let allow_list = Arc::new(AllowListStore::open(settings, Arc::new(CollectionRegistry::standard()))?);
        let engine = Arc::new(Engine::new());
        if let Some(dir) = &cfg.seed_dir {
            crate::seed::seed_dir(&engine, dir, true)?;
        }
        let gateway = SearchGateway::new(allow_list, engine).with_timeout_ms(cfg.query_timeout_ms);
        Ok(Self::new(gateway, Arc::new(StaticTokens::from_principals(&cfg.principals))))
    }

    fn caller(&self, headers: &HeaderMap) -> CallerContext {
        let token = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).and_then(bearer_token);
        self.auth.authenticate(token)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/search", get(handle_search))
        .route("/search/allowed", get(handle_get_allowed).put(handle_put_allowed))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Binds `cfg.bind_addr()` and serves until the process is stopped.
///
/// # Errors
/// Fails when the state cannot be assembled or the address cannot be bound.
pub async fn run_server(cfg: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(cfg)?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr()).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
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
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    field: Option<String>,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "bad_request".into(), message: message.into(), field: None }
    }

    fn from_search(err: SearchError, caller: &CallerContext) -> Self {
        let status = match &err {
            SearchError::UnknownCollection(_) | SearchError::MalformedQuery(_) | SearchError::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            SearchError::Authorization(_) if caller.is_anonymous() => StatusCode::UNAUTHORIZED,
            SearchError::Authorization(_) => StatusCode::FORBIDDEN,
            SearchError::Store(DbError::Timeout { .. }) => StatusCode::REQUEST_TIMEOUT,
            SearchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let field = match &err {
            SearchError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        Self { status, code: err.code().to_string(), message: err.to_string(), field }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: ErrorDetail { code: self.code, message: self.message, field: self.field } };
        (self.status, Json(body)).into_response()
    }
}

// ============ GET /search ============

/// Raw query parameters; numbers are parsed by hand so bad input gets a JSON error body.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(rename = "type")]
    kind: Option<String>,
    q: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
    sort: Option<String>,
    sortdir: Option<String>,
}

fn parse_param<T: std::str::FromStr>(name: &str, raw: Option<&str>, default: T) -> Result<T, AppError> {
    match raw {
        None | Some("") => Ok(default),
        Some(s) => s.parse().map_err(|_| AppError::bad_request(format!("Invalid value for {name}: {s}"))),
    }
}

impl SearchParams {
    fn into_request(self) -> Result<SearchRequest, AppError> {
        let kind = self.kind.ok_or_else(|| AppError::bad_request("Parameter 'type' is required."))?;
        let q = self.q.ok_or_else(|| AppError::bad_request("Parameter 'q' is required."))?;
        let limit = parse_param("limit", self.limit.as_deref(), DEFAULT_LIMIT)?;
        let offset = parse_param("offset", self.offset.as_deref(), 0usize)?;
        let dir = parse_param("sortdir", self.sortdir.as_deref(), 1i32)?;
        let sort = self.sort.filter(|s| !s.is_empty()).unwrap_or_else(|| DEFAULT_SORT.to_string());
        Ok(SearchRequest::new(kind, q)
            .with_limit(limit)
            .with_offset(offset)
            .with_sort(sort, Order::from_direction(dir)))
    }
}

async fn handle_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Value>>, AppError> {
    let caller = state.caller(&headers);
    let req = params.into_request()?;
    let gateway = state.gateway.clone();
    let blocking_caller = caller.clone();
    let result = tokio::task::spawn_blocking(move || gateway.search(&blocking_caller, &req))
        .await
        .map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".into(),
            message: e.to_string(),
            field: None,
        })?;
    let docs = result.map_err(|e| AppError::from_search(e, &caller))?;
    Ok(Json(docs.into_iter().map(|d| Bson::Document(d).into_relaxed_extjson()).collect()))
}

// ============ GET|PUT /search/allowed ============

#[derive(Debug, Default, Deserialize)]
struct AllowedParams {
    default: Option<String>,
}

async fn handle_get_allowed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AllowedParams>,
) -> Result<Json<Value>, AppError> {
    let caller = state.caller(&headers);
    let default = parse_param("default", params.default.as_deref(), false)?;
    let list = state.admin.get_allowed(&caller, default).map_err(|e| AppError::from_search(e, &caller))?;
    Ok(Json(list.to_value()))
}

async fn handle_put_allowed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let caller = state.caller(&headers);
    let list = state.admin.set_allowed(&caller, &body).map_err(|e| AppError::from_search(e, &caller))?;
    Ok(Json(list.to_value()))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    features: Vec<String>,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        features: built::COMPILED_FEATURES.iter().map(|s| (*s).to_string()).collect(),
    })
}
