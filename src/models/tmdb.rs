//! Raw TMDB API payloads and their conversion into domain models

use serde::Deserialize;

use super::{CastMember, Genre, MediaDetails, MediaType, SearchPage, Title};

const TOP_CAST: usize = 10;

/// Paged response from `/search/*` and `/discover/*`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
    #[serde(default)]
    pub results: Vec<TmdbResult>,
}

fn first_page() -> u32 {
    1
}

impl TmdbPage {
    /// Converts the page, using `fallback` for rows without a `media_type`
    pub fn into_search_page(self, fallback: Option<MediaType>) -> SearchPage {
        SearchPage {
            page: self.page,
            total_pages: self.total_pages,
            total_results: self.total_results,
            results: self
                .results
                .into_iter()
                .filter_map(|r| r.into_title(fallback))
                .collect(),
        }
    }
}

/// A single search or discovery row; movies carry `title`, TV carries `name`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbResult {
    pub id: u64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl TmdbResult {
    /// Returns `None` for rows that are neither movies nor TV (e.g. people)
    pub fn into_title(self, fallback: Option<MediaType>) -> Option<Title> {
        let media_type = match self.media_type.as_deref() {
            Some("movie") => MediaType::Movie,
            Some("tv") => MediaType::Tv,
            Some(_) => return None,
            None => fallback?,
        };

        let release_year = parse_year(self.release_date.as_deref())
            .or_else(|| parse_year(self.first_air_date.as_deref()));

        Some(Title {
            tmdb_id: self.id,
            media_type,
            title: non_empty(self.title)
                .or_else(|| non_empty(self.name))
                .unwrap_or_else(|| "N/A".to_string()),
            release_year,
            overview: non_empty(self.overview).unwrap_or_else(|| "No overview".to_string()),
            popularity: self.popularity.unwrap_or(0.0),
            vote_average: self.vote_average,
            genre_ids: self.genre_ids,
        })
    }
}

/// Response from `/genre/{type}/list`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

/// Response from `/{type}/{id}?append_to_response=credits,external_ids`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub external_ids: Option<TmdbExternalIds>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub created_by: Vec<TmdbCreator>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCreator {
    pub name: String,
}

impl TmdbDetails {
    pub fn into_details(self, media_type: MediaType) -> MediaDetails {
        let credits = self.credits.unwrap_or_default();

        let mut cast = credits.cast;
        cast.sort_by_key(|c| c.order.unwrap_or(u32::MAX));
        let cast = cast
            .into_iter()
            .take(TOP_CAST)
            .map(|c| CastMember {
                name: c.name,
                character: non_empty(c.character),
            })
            .collect();

        let directors = match media_type {
            MediaType::Movie => credits
                .crew
                .into_iter()
                .filter(|c| c.job.as_deref() == Some("Director"))
                .map(|c| c.name)
                .collect(),
            MediaType::Tv => self.created_by.into_iter().map(|c| c.name).collect(),
        };

        let imdb_id = non_empty(self.imdb_id)
            .or_else(|| self.external_ids.and_then(|ids| non_empty(ids.imdb_id)));

        MediaDetails {
            tmdb_id: self.id,
            media_type,
            title: non_empty(self.title)
                .or_else(|| non_empty(self.name))
                .unwrap_or_else(|| "Unknown".to_string()),
            overview: non_empty(self.overview),
            tagline: non_empty(self.tagline),
            genres: self.genres,
            release_year: parse_year(self.release_date.as_deref())
                .or_else(|| parse_year(self.first_air_date.as_deref())),
            runtime_minutes: self
                .runtime
                .filter(|r| *r > 0)
                .or_else(|| self.episode_run_time.first().copied()),
            vote_average: self.vote_average,
            imdb_id,
            cast,
            directors,
        }
    }
}

/// Error body TMDB returns alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbStatus {
    #[serde(default)]
    pub status_message: Option<String>,
}

/// Year prefix of a `YYYY-MM-DD` date
pub fn parse_year(date: Option<&str>) -> Option<i32> {
    let year = date?.split('-').next()?;
    if year.len() != 4 {
        return None;
    }
    year.parse().ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
