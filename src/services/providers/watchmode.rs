/// WatchMode API provider
///
/// API Flow:
/// 1. TMDB titles: /v1/title/{movie|tv}-{tmdb_id}/sources/ (no lookup needed)
/// 2. WatchMode titles: /v1/title/{watchmode_id}/sources/
/// 3. IMDB titles: /v1/search/ to find the WatchMode ID, then (2)
///
/// WatchMode returns one source row per service, offer type, region and
/// format; rows are normalized and collapsed to one per service/type/region.
use crate::{
    cached,
    db::{redis::AVAIL_CACHE_TTL, Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        watchmode::{WatchmodeSearchResponse, WatchmodeSource, WatchmodeStatus},
        AvailabilityType, ServiceAvailability, StreamingAvailability, TitleId,
    },
    services::providers::StreamingProvider,
};
use chrono::Utc;
use reqwest::{Client as HttpClient, Response, StatusCode};
use std::time::Duration;

const ID_MAPPING_CACHE_TTL: u64 = 2592000; // 30 days

/// WatchMode source IDs of the major services, mapped to stable IDs and names
const KNOWN_SERVICES: &[(u64, &str, &str)] = &[
    (203, "netflix", "Netflix"),
    (157, "hulu", "Hulu"),
    (26, "prime_video", "Prime Video"),
    (372, "disney_plus", "Disney+"),
    (387, "max", "Max"),
    (371, "apple_tv_plus", "Apple TV+"),
    (389, "peacock", "Peacock"),
    (444, "paramount_plus", "Paramount+"),
];

#[derive(Clone)]
pub struct WatchmodeProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    regions: Vec<String>,
    cache: Cache,
}

impl WatchmodeProvider {
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        regions: Vec<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            http_client: HttpClient::builder().timeout(timeout).build()?,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            regions,
            cache,
        })
    }

    /// Convert WatchMode service ID to a stable service ID and display name
    fn map_service(source_id: u64, source_name: &str) -> (String, String) {
        KNOWN_SERVICES
            .iter()
            .find(|(id, _, _)| *id == source_id)
            .map(|(_, id, name)| (id.to_string(), name.to_string()))
            .unwrap_or_else(|| (slugify(source_name), source_name.to_string()))
    }

    /// Convert WatchMode source type to our AvailabilityType
    fn parse_availability_type(source_type: &str) -> Option<AvailabilityType> {
        match source_type.to_lowercase().as_str() {
            "sub" | "subscription" => Some(AvailabilityType::Subscription),
            "rent" => Some(AvailabilityType::Rent),
            "buy" | "purchase" => Some(AvailabilityType::Buy),
            "free" => Some(AvailabilityType::Free),
            "addon" | "tve" => Some(AvailabilityType::Addon),
            _ => None,
        }
    }

    /// Normalizes raw source rows, dropping unknown offer types and duplicates
    fn convert_sources(sources: Vec<WatchmodeSource>) -> Vec<ServiceAvailability> {
        let mut services: Vec<ServiceAvailability> = Vec::new();

        for source in sources {
            let Some(availability_type) = Self::parse_availability_type(&source.source_type) else {
                tracing::debug!(
                    watchmode_service_id = source.source_id,
                    source_type = %source.source_type,
                    "Skipping unknown WatchMode source type"
                );
                continue;
            };

            let (service_id, service_name) = Self::map_service(source.source_id, &source.name);
            let candidate = ServiceAvailability {
                service_id,
                service_name,
                availability_type,
                region: source.region,
                quality: source.format,
                price: source.price,
                link: source.web_url,
            };

            let existing = services.iter_mut().find(|s| {
                s.service_id == candidate.service_id
                    && s.availability_type == candidate.availability_type
                    && s.region == candidate.region
            });

            match existing {
                Some(existing) => {
                    if quality_rank(candidate.quality.as_deref())
                        > quality_rank(existing.quality.as_deref())
                    {
                        *existing = candidate;
                    }
                }
                None => services.push(candidate),
            }
        }

        services
    }

    /// Maps non-2xx responses onto application errors
    async fn check_response(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<WatchmodeStatus>(&body)
            .ok()
            .and_then(|s| s.status_message)
            .unwrap_or(body);

        Err(match status {
            StatusCode::UNAUTHORIZED => {
                AppError::Configuration(format!("WatchMode rejected the API key: {}", message))
            }
            StatusCode::NOT_FOUND => AppError::NotFound(format!("WatchMode: {}", message)),
            StatusCode::TOO_MANY_REQUESTS => {
                AppError::RateLimited(format!("WatchMode quota exceeded: {}", message))
            }
            _ => AppError::ExternalApi(format!(
                "WatchMode API returned status {}: {}",
                status, message
            )),
        })
    }

    /// Lookup WatchMode ID by IMDB ID
    async fn get_watchmode_id(&self, imdb_id: &str) -> AppResult<u64> {
        cached!(
            self.cache,
            CacheKey::ImdbToWatchmode(imdb_id.to_string()),
            ID_MAPPING_CACHE_TTL,
            async move {
                let url = format!("{}/v1/search/", self.api_url);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("apiKey", self.api_key.as_str()),
                        ("search_field", "imdb_id"),
                        ("search_value", imdb_id),
                    ])
                    .send()
                    .await?;

                let search_response: WatchmodeSearchResponse =
                    Self::check_response(response).await?.json().await?;

                let title = search_response.title_results.first().ok_or_else(|| {
                    AppError::NotFound(format!("No WatchMode title for IMDB ID {}", imdb_id))
                })?;

                tracing::debug!(
                    imdb_id = %imdb_id,
                    watchmode_id = title.id,
                    name = %title.name,
                    "Resolved WatchMode ID"
                );
                Ok::<_, AppError>(title.id)
            }
        )
    }

    async fn fetch_sources(&self, path_id: &str) -> AppResult<Vec<WatchmodeSource>> {
        let url = format!("{}/v1/title/{}/sources/", self.api_url, path_id);
        let regions = self.regions.join(",");

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())]);
        if !regions.is_empty() {
            request = request.query(&[("regions", regions.as_str())]);
        }

        let response = Self::check_response(request.send().await?).await?;
        let response_text = response.text().await?;
        tracing::debug!(response = %response_text, "Raw WatchMode API response");

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize WatchMode response"
            );
            AppError::ExternalApi(format!("Failed to parse WatchMode response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl StreamingProvider for WatchmodeProvider {
    async fn fetch_availability(&self, title_id: &TitleId) -> AppResult<StreamingAvailability> {
        cached!(
            self.cache,
            CacheKey::Availability(title_id.to_string()),
            AVAIL_CACHE_TTL,
            async move {
                let path_id = match title_id {
                    TitleId::Tmdb { .. } | TitleId::Watchmode(_) => title_id.to_string(),
                    TitleId::Imdb(imdb_id) => self.get_watchmode_id(imdb_id).await?.to_string(),
                };

                let sources = self.fetch_sources(&path_id).await?;
                let source_rows = sources.len();
                let services = Self::convert_sources(sources);

                tracing::info!(
                    title_id = %title_id,
                    source_rows,
                    services = services.len(),
                    provider = "watchmode",
                    "Availability fetched"
                );

                Ok::<_, AppError>(StreamingAvailability {
                    id: title_id.clone(),
                    services,
                    cached_at: Utc::now(),
                })
            }
        )
    }

    fn clone_for_task(&self) -> Box<dyn StreamingProvider> {
        Box::new(self.clone())
    }

    fn name(&self) -> &'static str {
        "watchmode"
    }
}

fn quality_rank(quality: Option<&str>) -> u8 {
    match quality.map(|q| q.to_uppercase()).as_deref() {
        Some("4K") | Some("UHD") => 3,
        Some("HD") => 2,
        Some("SD") => 1,
        _ => 0,
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if c == '+' {
            slug.push_str("_plus");
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}
