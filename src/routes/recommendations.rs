use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{MediaType, Recommendation, SearchScope},
    routes::AppState,
};

/// Either a TMDB title (`tmdb_id` + `media_type`) or a free-text `query`
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<Recommendation>> {
    tracing::info!(
        request_id = %request_id,
        tmdb_id = ?request.tmdb_id,
        query = ?request.query,
        "Processing recommendation request"
    );

    let recommendation = match (request.tmdb_id, request.query.as_deref()) {
        (Some(tmdb_id), _) => {
            let media_type: MediaType = request
                .media_type
                .as_deref()
                .ok_or_else(|| {
                    AppError::InvalidInput("media_type is required with tmdb_id".to_string())
                })?
                .parse()?;
            state.recommendations.recommend(media_type, tmdb_id).await?
        }
        (None, Some(query)) => {
            let scope: SearchScope = match request.media_type.as_deref() {
                Some(media_type) => media_type.parse()?,
                None => SearchScope::Multi,
            };
            state
                .recommendations
                .recommend_for_query(query, scope)
                .await?
        }
        (None, None) => {
            return Err(AppError::InvalidInput(
                "Provide either tmdb_id and media_type, or query".to_string(),
            ))
        }
    };

    tracing::info!(
        request_id = %request_id,
        title = %recommendation.details.title,
        "Recommendation generated"
    );

    Ok(Json(recommendation))
}
