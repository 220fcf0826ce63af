use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Genre, MediaType},
    routes::AppState,
};

/// Handler for genre list endpoint
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<String>,
) -> AppResult<Json<Vec<Genre>>> {
    let media_type: MediaType = media_type.parse()?;
    let mut genres = state.tmdb.genres(media_type).await?;
    genres.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(genres))
}
