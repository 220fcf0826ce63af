use chrono::Datelike;
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{MediaType, SearchFilters, SearchPage, Title, TitleId},
    services::tmdb::TmdbClient,
};

/// TMDB serves at most 500 pages of any listing
pub const MAX_PAGE: u32 = 500;
const FIRST_FILM_YEAR: i32 = 1874;

/// Search dispatch for combined filters
///
/// A text query with a genre searches by text, then keeps rows tagged with
/// that genre. Without a query a genre or release year goes to discovery,
/// which needs a concrete media type and falls back to movies for the multi
/// scope.
pub async fn search_media(tmdb: &TmdbClient, filters: &SearchFilters) -> AppResult<SearchPage> {
    let page = validate_page(filters.page)?;
    let year = validate_year(filters.release_year)?;
    let discover_type = filters.scope.media_type().unwrap_or(MediaType::Movie);

    let query = filters
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());
    let genre = filters
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty());

    match (query, genre) {
        (Some(query), Some(genre)) => {
            // Unknown names must still be reported, not silently filter everything out
            match filters.scope.media_type() {
                Some(media_type) => tmdb.ensure_genre(&[media_type], genre).await?,
                None => tmdb.ensure_genre(&[MediaType::Movie, MediaType::Tv], genre).await?,
            }
            let mut results = tmdb.search(query, filters.scope, page).await?;
            results.results = keep_genre(tmdb, results.results, genre).await?;
            if let Some(year) = year {
                results.results.retain(|t| t.release_year == Some(year));
            }
            Ok(results)
        }
        (None, Some(genre)) => {
            let genre = tmdb.resolve_genre(discover_type, genre).await?;
            tmdb.discover(discover_type, Some(genre.id), year, page).await
        }
        (Some(query), None) => {
            let mut results = tmdb.search(query, filters.scope, page).await?;
            if let Some(year) = year {
                results.results.retain(|t| t.release_year == Some(year));
            }
            Ok(results)
        }
        (None, None) if year.is_some() => tmdb.discover(discover_type, None, year, page).await,
        (None, None) => Err(AppError::InvalidInput(
            "Provide a search query, a genre or a release year".to_string(),
        )),
    }
}

/// Genre ids differ between movies and TV, so each media type is filtered
/// against its own genre list. Relevance order is preserved.
async fn keep_genre(
    tmdb: &TmdbClient,
    mut titles: Vec<Title>,
    genre: &str,
) -> AppResult<Vec<Title>> {
    let names = [genre.to_string()];
    let mut kept: HashSet<TitleId> = HashSet::new();

    for media_type in [MediaType::Movie, MediaType::Tv] {
        let candidates: Vec<Title> = titles
            .iter()
            .filter(|t| t.media_type == media_type)
            .cloned()
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let matching = tmdb.filter_by_genre(media_type, candidates, &names).await?;
        kept.extend(matching.iter().map(Title::id));
    }

    titles.retain(|t| kept.contains(&t.id()));
    Ok(titles)
}

pub(crate) fn validate_page(page: Option<u32>) -> AppResult<u32> {
    match page.unwrap_or(1) {
        p @ 1..=MAX_PAGE => Ok(p),
        p => Err(AppError::InvalidInput(format!(
            "Page must be between 1 and {}, got {}",
            MAX_PAGE, p
        ))),
    }
}

pub(crate) fn validate_year(year: Option<i32>) -> AppResult<Option<i32>> {
    let Some(year) = year else {
        return Ok(None);
    };
    let latest = chrono::Utc::now().year() + 5;
    if (FIRST_FILM_YEAR..=latest).contains(&year) {
        Ok(Some(year))
    } else {
        Err(AppError::InvalidInput(format!(
            "Release year must be between {} and {}, got {}",
            FIRST_FILM_YEAR, latest, year
        )))
    }
}
