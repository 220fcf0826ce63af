/// TMDB (The Movie Database) API client
///
/// Provides text search, genre/year discovery, full title details and genre
/// lists. Every call is authenticated with the v3 `api_key` query parameter
/// and goes through the read-through cache.
///
/// API docs: https://developer.themoviedb.org/docs
use crate::{
    cached,
    db::{
        redis::{DETAILS_CACHE_TTL, GENRES_CACHE_TTL, SEARCH_CACHE_TTL},
        Cache, CacheKey,
    },
    error::{AppError, AppResult},
    models::{
        tmdb::{TmdbDetails, TmdbGenreList, TmdbPage, TmdbStatus},
        Genre, MediaDetails, MediaType, SearchPage, SearchScope, Title,
    },
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
/// Longest `Retry-After` worth waiting for inside a request
pub const MAX_RETRY_WAIT_SECS: u64 = 30;

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Cache,
    max_retries: u32,
}

impl TmdbClient {
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        language: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            http_client: HttpClient::builder().timeout(timeout).build()?,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            cache,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Authenticated GET, retrying rate-limited responses
    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let response = self
                .http_client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(params)
                .send()
                .await?;

            let status = response.status();

            if status.is_success() {
                let body = response.text().await?;
                return serde_json::from_str(&body).map_err(|e| {
                    tracing::error!(error = %e, path = %path, "Failed to deserialize TMDB response");
                    AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.max_retries {
                    return Err(AppError::RateLimited(
                        "TMDB rate limit exceeded, retries exhausted".to_string(),
                    ));
                }

                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok());
                let Some(wait_secs) = retry_wait_secs(retry_after, attempt) else {
                    tracing::warn!(path = %path, retry_after = ?retry_after, "TMDB asked for a long back-off");
                    return Err(AppError::RateLimited(format!(
                        "TMDB rate limit exceeded, retry after {}s",
                        retry_after.unwrap_or_default().trim()
                    )));
                };

                tracing::warn!(path = %path, attempt, wait_secs, "TMDB rate limited, backing off");
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TmdbStatus>(&body)
                .ok()
                .and_then(|s| s.status_message)
                .unwrap_or(body);

            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    AppError::Configuration(format!("TMDB rejected the API key: {}", message))
                }
                StatusCode::NOT_FOUND => AppError::NotFound(format!("TMDB {}: {}", path, message)),
                _ => AppError::ExternalApi(format!(
                    "TMDB API returned status {}: {}",
                    status, message
                )),
            });
        }
    }

    /// Text search across movies, TV or both
    pub async fn search(&self, query: &str, scope: SearchScope, page: u32) -> AppResult<SearchPage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::Search {
                scope,
                page,
                query: query.to_string(),
            },
            SEARCH_CACHE_TTL,
            async move {
                let raw: TmdbPage = self
                    .get(
                        &format!("/search/{}", scope.as_str()),
                        &[
                            ("query", query.to_string()),
                            ("language", self.language.clone()),
                            ("page", page.to_string()),
                            ("include_adult", "false".to_string()),
                        ],
                    )
                    .await?;

                let results = raw.into_search_page(scope.media_type());

                tracing::info!(
                    query = %query,
                    scope = scope.as_str(),
                    results = results.results.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                Ok::<_, AppError>(results)
            }
        )
    }

    /// Discovery by genre and/or release year, most popular first
    pub async fn discover(
        &self,
        media_type: MediaType,
        genre_id: Option<u32>,
        year: Option<i32>,
        page: u32,
    ) -> AppResult<SearchPage> {
        cached!(
            self.cache,
            CacheKey::Discover {
                media_type,
                genre_id,
                year,
                page,
            },
            SEARCH_CACHE_TTL,
            async move {
                let mut params = vec![
                    ("language", self.language.clone()),
                    ("page", page.to_string()),
                    ("sort_by", "popularity.desc".to_string()),
                ];
                if let Some(genre_id) = genre_id {
                    params.push(("with_genres", genre_id.to_string()));
                }
                if let Some(year) = year {
                    let key = match media_type {
                        MediaType::Movie => "primary_release_year",
                        MediaType::Tv => "first_air_date_year",
                    };
                    params.push((key, year.to_string()));
                }

                let raw: TmdbPage = self
                    .get(&format!("/discover/{}", media_type), &params)
                    .await?;
                let results = raw.into_search_page(Some(media_type));

                tracing::info!(
                    media_type = %media_type,
                    genre_id = ?genre_id,
                    year = ?year,
                    results = results.results.len(),
                    provider = "tmdb",
                    "Discovery completed"
                );

                Ok::<_, AppError>(results)
            }
        )
    }

    /// Full metadata including credits and external ids
    pub async fn details(&self, media_type: MediaType, id: u64) -> AppResult<MediaDetails> {
        cached!(
            self.cache,
            CacheKey::Details(media_type, id),
            DETAILS_CACHE_TTL,
            async move {
                let raw: TmdbDetails = self
                    .get(
                        &format!("/{}/{}", media_type, id),
                        &[
                            ("language", self.language.clone()),
                            ("append_to_response", "credits,external_ids".to_string()),
                        ],
                    )
                    .await?;

                let details = raw.into_details(media_type);
                tracing::info!(
                    tmdb_id = id,
                    media_type = %media_type,
                    title = %details.title,
                    provider = "tmdb",
                    "Details fetched"
                );

                Ok::<_, AppError>(details)
            }
        )
    }

    /// Genre list for one media type
    pub async fn genres(&self, media_type: MediaType) -> AppResult<Vec<Genre>> {
        cached!(
            self.cache,
            CacheKey::Genres(media_type),
            GENRES_CACHE_TTL,
            async move {
                let raw: TmdbGenreList = self
                    .get(
                        &format!("/genre/{}/list", media_type),
                        &[("language", self.language.clone())],
                    )
                    .await?;
                Ok::<_, AppError>(raw.genres)
            }
        )
    }

    /// Case-insensitive genre lookup by name
    pub async fn resolve_genre(&self, media_type: MediaType, name: &str) -> AppResult<Genre> {
        let genres = self.genres(media_type).await?;
        find_genre(&genres, name).cloned().ok_or_else(|| {
            let mut available: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
            available.sort_unstable();
            AppError::InvalidInput(format!(
                "Genre '{}' not found for {}. Available genres: {}",
                name.trim(),
                media_type,
                available.join(", ")
            ))
        })
    }

    /// Checks that `name` is a genre of at least one of `media_types`
    ///
    /// The error lists every genre name of those media types, sorted.
    pub async fn ensure_genre(&self, media_types: &[MediaType], name: &str) -> AppResult<()> {
        let mut available: BTreeSet<String> = BTreeSet::new();
        for &media_type in media_types {
            let genres = self.genres(media_type).await?;
            if find_genre(&genres, name).is_some() {
                return Ok(());
            }
            available.extend(genres.into_iter().map(|g| g.name));
        }

        let kinds: Vec<&str> = media_types.iter().map(MediaType::as_str).collect();
        Err(AppError::InvalidInput(format!(
            "Genre '{}' not found for {}. Available genres: {}",
            name.trim(),
            kinds.join(" or "),
            available.into_iter().collect::<Vec<_>>().join(", ")
        )))
    }

    /// Keeps titles tagged with any of the named genres
    ///
    /// Names that match no genre are ignored; if none match, nothing is kept.
    pub async fn filter_by_genre(
        &self,
        media_type: MediaType,
        titles: Vec<Title>,
        names: &[String],
    ) -> AppResult<Vec<Title>> {
        let genres = self.genres(media_type).await?;
        Ok(retain_genres(&genres, titles, names))
    }
}

/// Seconds to wait before retrying a 429, or `None` when it is not worth waiting
///
/// Uses `Retry-After` in seconds when it parses, otherwise 2^attempt.
fn retry_wait_secs(retry_after: Option<&str>, attempt: u32) -> Option<u64> {
    let wait = retry_after
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or_else(|| 2u64.saturating_pow(attempt));
    (wait <= MAX_RETRY_WAIT_SECS).then_some(wait)
}

fn find_genre<'a>(genres: &'a [Genre], name: &str) -> Option<&'a Genre> {
    let name = name.trim();
    genres.iter().find(|g| g.name.eq_ignore_ascii_case(name))
}

fn retain_genres(genres: &[Genre], titles: Vec<Title>, names: &[String]) -> Vec<Title> {
    let wanted: HashSet<u32> = names
        .iter()
        .filter_map(|n| find_genre(genres, n))
        .map(|g| g.id)
        .collect();

    titles
        .into_iter()
        .filter(|t| t.genre_ids.iter().any(|id| wanted.contains(id)))
        .collect()
}
