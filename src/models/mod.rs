use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

pub mod tmdb;
pub mod watchmode;

/// Kind of title as TMDB addresses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Path segment used by TMDB and WatchMode
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaType::Movie),
            "tv" | "series" | "show" => Ok(MediaType::Tv),
            other => Err(AppError::InvalidInput(format!(
                "Unknown media type '{}', expected 'movie' or 'tv'",
                other
            ))),
        }
    }
}

/// Which TMDB search endpoint to hit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    #[default]
    Multi,
    Movie,
    Tv,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Multi => "multi",
            SearchScope::Movie => "movie",
            SearchScope::Tv => "tv",
        }
    }

    /// Concrete media type, if the scope names one
    pub fn media_type(&self) -> Option<MediaType> {
        match self {
            SearchScope::Multi => None,
            SearchScope::Movie => Some(MediaType::Movie),
            SearchScope::Tv => Some(MediaType::Tv),
        }
    }
}

impl From<MediaType> for SearchScope {
    fn from(media_type: MediaType) -> Self {
        match media_type {
            MediaType::Movie => SearchScope::Movie,
            MediaType::Tv => SearchScope::Tv,
        }
    }
}

impl FromStr for SearchScope {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("multi") {
            return Ok(SearchScope::Multi);
        }
        s.parse::<MediaType>().map(SearchScope::from)
    }
}

/// Identifier for a title in one of the upstream ID systems
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TitleId {
    /// TMDB ID, which is only unique together with its media type
    Tmdb { media_type: MediaType, id: u64 },
    /// IMDB ID (e.g., "tt0133093")
    Imdb(String),
    /// WatchMode-specific ID
    Watchmode(u64),
}

impl TitleId {
    pub fn tmdb(media_type: MediaType, id: u64) -> Self {
        TitleId::Tmdb { media_type, id }
    }
}

impl Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // WatchMode accepts `movie-603` / `tv-1396` as a title id
            TitleId::Tmdb { media_type, id } => write!(f, "{}-{}", media_type, id),
            TitleId::Imdb(id) => write!(f, "{}", id),
            TitleId::Watchmode(id) => write!(f, "{}", id),
        }
    }
}

/// A movie or TV show as listed by search and discovery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Title {
    pub tmdb_id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub release_year: Option<i32>,
    pub overview: String,
    pub popularity: f64,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl Title {
    pub fn id(&self) -> TitleId {
        TitleId::tmdb(self.media_type, self.tmdb_id)
    }
}

/// One page of search or discovery results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
    pub results: Vec<Title>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
}

/// Full metadata for a single title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaDetails {
    pub tmdb_id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub genres: Vec<Genre>,
    pub release_year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub vote_average: Option<f64>,
    pub imdb_id: Option<String>,
    pub cast: Vec<CastMember>,
    /// Directors for movies, creators for TV
    pub directors: Vec<String>,
}

impl MediaDetails {
    pub fn id(&self) -> TitleId {
        TitleId::tmdb(self.media_type, self.tmdb_id)
    }

    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(|g| g.name.as_str()).collect()
    }
}

/// Search request combining a text query with discovery filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    #[serde(default, rename = "q")]
    pub query: Option<String>,
    #[serde(default, rename = "type")]
    pub scope: SearchScope,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, rename = "year")]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub page: Option<u32>,
}

/// Streaming availability data for a single title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingAvailability {
    pub id: TitleId,
    pub services: Vec<ServiceAvailability>,
    pub cached_at: DateTime<Utc>,
}

impl StreamingAvailability {
    /// Services that need no purchase beyond a subscription
    pub fn included(&self) -> impl Iterator<Item = &ServiceAvailability> {
        self.services.iter().filter(|s| {
            matches!(
                s.availability_type,
                AvailabilityType::Subscription | AvailabilityType::Free
            )
        })
    }
}

/// Availability details for one service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceAvailability {
    pub service_id: String,
    pub service_name: String,
    pub availability_type: AvailabilityType,
    pub region: Option<String>,
    pub quality: Option<String>,
    pub price: Option<f64>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityType {
    Subscription,
    Rent,
    Buy,
    Free,
    Addon,
}

impl Display for AvailabilityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AvailabilityType::Subscription => "subscription",
            AvailabilityType::Rent => "rent",
            AvailabilityType::Buy => "buy",
            AvailabilityType::Free => "free",
            AvailabilityType::Addon => "add-on",
        };
        f.pad(label)
    }
}

/// Generated recommendation with the data it was built from
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub details: MediaDetails,
    pub availability: Option<StreamingAvailability>,
    pub recommendation: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}
