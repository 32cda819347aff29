use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::store::{Reaction, ReactionStore, ReactionType, StoreError, ToggleAction};

pub struct AppState {
    pub store: Arc<ReactionStore>,
    pub default_page_size: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/reactions", post(toggle_reaction).get(list_reactions))
        .route("/reactions/:id", delete(remove_reaction))
        .route("/reactions/counts", get(reaction_counts))
        .route("/reactions/lookup", post(lookup_reactions))
        .route("/health", get(health))
        .with_state(state)
}

// Custom error type
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

// Request/response bodies

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub user_id: i64,
    pub article_id: String,
    pub reaction_type: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub action: ToggleAction,
    pub reaction: Option<Reaction>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub article_id: String,
    #[serde(default = "default_page")]
    pub page: usize,
    pub size: Option<usize>,
}

fn default_page() -> usize {
    1
}

#[derive(Serialize)]
pub struct ListResponse {
    pub items: Vec<Reaction>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
}

#[derive(Deserialize)]
pub struct CountsQuery {
    pub article_id: String,
}

#[derive(Serialize)]
pub struct CountsResponse {
    pub article_id: String,
    pub counts: BTreeMap<ReactionType, u64>,
    pub total: u64,
}

#[derive(Deserialize)]
pub struct LookupRequest {
    pub user_id: i64,
    #[serde(default)]
    pub article_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub user_reactions: HashMap<String, ReactionType>,
    pub reactions_count: HashMap<String, BTreeMap<ReactionType, u64>>,
}

// Route handlers

pub async fn toggle_reaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ToggleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .store
        .toggle(req.user_id, &req.article_id, &req.reaction_type)?;
    debug!(
        user_id = req.user_id,
        article_id = %req.article_id,
        action = ?outcome.action,
        "reaction toggled"
    );

    let status = if outcome.action == ToggleAction::Created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ToggleResponse {
            success: true,
            action: outcome.action,
            reaction: outcome.reaction,
        }),
    ))
}

pub async fn remove_reaction(
    State(state): State<Arc<AppState>>,
    Path(reaction_id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_id(&headers)?;
    state.store.remove_by_id(reaction_id, user_id)?;
    debug!(reaction_id, user_id, "reaction removed");

    Ok(Json(json!({
        "success": true,
        "message": "Reaction deleted successfully"
    })))
}

/// Caller identity arrives out-of-band in the `x-user-id` header.
fn caller_id(headers: &HeaderMap) -> Result<i64, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| ApiError::bad_request("missing or invalid x-user-id header"))
}

pub async fn list_reactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let size = query.size.unwrap_or(state.default_page_size);
    let (items, total) = state
        .store
        .list_by_article(&query.article_id, query.page, size)?;

    Ok(Json(ListResponse {
        items,
        total,
        page: query.page,
        size,
    }))
}

pub async fn reaction_counts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CountsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (counts, total) = state.store.counts_by_article(&query.article_id);

    Ok(Json(CountsResponse {
        article_id: query.article_id,
        counts,
        total,
    }))
}

/// Batch annotation call used when rendering a feed page: the viewer's own
/// reaction plus the per-type counts for each listed article.
pub async fn lookup_reactions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LookupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_reactions = state.store.reactions_for_user(req.user_id, &req.article_ids);

    let mut reactions_count = HashMap::new();
    for article_id in &req.article_ids {
        if article_id.is_empty() {
            continue;
        }
        let (counts, _) = state.store.counts_by_article(article_id);
        reactions_count.insert(article_id.clone(), counts);
    }

    Ok(Json(LookupResponse {
        user_reactions,
        reactions_count,
    }))
}

pub async fn health() -> impl IntoResponse {
    "OK"
}
