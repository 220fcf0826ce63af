use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{MediaDetails, MediaType, SearchFilters, SearchPage, StreamingAvailability, TitleId},
    routes::AppState,
    services::title_search,
};

/// Handler for title search endpoint
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(filters): Query<SearchFilters>,
) -> AppResult<Json<SearchPage>> {
    tracing::info!(
        request_id = %request_id,
        query = ?filters.query,
        scope = filters.scope.as_str(),
        genre = ?filters.genre,
        year = ?filters.release_year,
        "Processing search request"
    );

    let page = title_search::search_media(&state.tmdb, &filters).await?;
    Ok(Json(page))
}

/// Handler for title details endpoint
pub async fn details(
    State(state): State<Arc<AppState>>,
    Path((media_type, id)): Path<(String, u64)>,
) -> AppResult<Json<MediaDetails>> {
    let media_type: MediaType = media_type.parse()?;
    let details = state.tmdb.details(media_type, id).await?;
    Ok(Json(details))
}

/// Handler for streaming availability endpoint
pub async fn availability(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path((media_type, id)): Path<(String, u64)>,
) -> AppResult<Json<StreamingAvailability>> {
    let media_type: MediaType = media_type.parse()?;
    let title_id = TitleId::tmdb(media_type, id);

    tracing::info!(
        request_id = %request_id,
        title_id = %title_id,
        provider = state.streaming_provider.name(),
        "Processing availability request"
    );

    let availability = state.streaming_provider.fetch_availability(&title_id).await?;
    Ok(Json(availability))
}

/// Upper bound on titles per batch availability request
pub const MAX_BATCH_TITLES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct BatchTitle {
    pub media_type: MediaType,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct BatchAvailabilityRequest {
    pub titles: Vec<BatchTitle>,
}

/// Handler for batch availability endpoint
pub async fn batch_availability(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<BatchAvailabilityRequest>,
) -> AppResult<Json<Vec<StreamingAvailability>>> {
    if request.titles.is_empty() || request.titles.len() > MAX_BATCH_TITLES {
        return Err(AppError::InvalidInput(format!(
            "Provide between 1 and {} titles, got {}",
            MAX_BATCH_TITLES,
            request.titles.len()
        )));
    }

    let title_ids: Vec<TitleId> = request
        .titles
        .into_iter()
        .map(|t| TitleId::tmdb(t.media_type, t.id))
        .collect();

    tracing::info!(
        request_id = %request_id,
        titles = title_ids.len(),
        provider = state.streaming_provider.name(),
        "Processing batch availability request"
    );

    let results = state
        .streaming_provider
        .fetch_availability_batch(title_ids)
        .await?;
    Ok(Json(results))
}
