//! HTTP surface.
//!
//! `GET /` returns plain-text usage help; `GET /api/v1/fetch` runs the
//! pipeline. The identifier is checked by hand rather than through
//! extractor rejection so error bodies keep the documented `{detail}`
//! shape.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiError;
use crate::pipeline::{self, FetchOutput};
use crate::state::AppState;

const USAGE: &str = "linkmirror: resolve an item identifier to a shareable download link.\n\
\n\
  GET /api/v1/fetch?id=<identifier>[&selector_hint=<css selector>]\n\
\n\
Returns {\"id\", \"url\", \"cached\"} on success and {\"detail\"} on failure.\n\
Resolved links are cached; repeated requests for the same identifier\n\
are served without re-rendering the target page.\n";

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(usage))
        .route("/api/v1/fetch", get(fetch))
        .with_state(state)
}

async fn usage() -> &'static str {
    USAGE
}

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub id: Option<String>,
    pub selector_hint: Option<String>,
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<FetchOutput>, ApiError> {
    let id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("id parameter required"))?;

    let output = pipeline::fetch_link(&state, id, query.selector_hint.as_deref()).await?;
    Ok(Json(output))
}
