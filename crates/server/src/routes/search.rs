use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    services::catalog::MediaSummary,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_games))
        .route("/movies", get(search_movies))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    fn text(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }
}

async fn search_games(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, AppError>,
) -> Result<Json<Vec<MediaSummary>>> {
    let text = query.text();
    if text.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let items = state.catalog.search_games(text).await?;
    Ok(Json(items))
}

async fn search_movies(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, AppError>,
) -> Result<Json<Vec<MediaSummary>>> {
    let text = query.text();
    if text.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let items = state.catalog.search_movies(text).await?;
    Ok(Json(items))
}
