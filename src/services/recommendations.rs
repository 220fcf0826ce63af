use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        MediaDetails, MediaType, Recommendation, SearchScope, StreamingAvailability, TitleId,
    },
    services::{openai::LanguageModel, providers::StreamingProvider, tmdb::TmdbClient},
};

pub const SYSTEM_PROMPT: &str = "You are a movie and TV show recommendation expert.";

const PROMPT_CAST: usize = 5;

/// Generates recommendations: TMDB metadata, then WatchMode availability, then the LLM
#[derive(Clone)]
pub struct RecommendationService {
    tmdb: Arc<TmdbClient>,
    provider: Arc<dyn StreamingProvider>,
    llm: Arc<dyn LanguageModel>,
}

impl RecommendationService {
    pub fn new(
        tmdb: Arc<TmdbClient>,
        provider: Arc<dyn StreamingProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self { tmdb, provider, llm }
    }

    /// Recommendation for a known TMDB title
    pub async fn recommend(&self, media_type: MediaType, tmdb_id: u64) -> AppResult<Recommendation> {
        let details = self.tmdb.details(media_type, tmdb_id).await?;
        recommend_for_details(self.provider.as_ref(), self.llm.as_ref(), details).await
    }

    /// Recommendation for the best search match of `query`
    pub async fn recommend_for_query(
        &self,
        query: &str,
        scope: SearchScope,
    ) -> AppResult<Recommendation> {
        let page = self.tmdb.search(query, scope, 1).await?;
        let first = page.results.into_iter().next().ok_or_else(|| {
            AppError::NotFound(format!("No titles found for '{}'", query.trim()))
        })?;

        tracing::info!(
            query = %query,
            tmdb_id = first.tmdb_id,
            media_type = %first.media_type,
            title = %first.title,
            "Recommending top search match"
        );

        self.recommend(first.media_type, first.tmdb_id).await
    }
}

/// Runs the availability and language-model stages for already-fetched details
///
/// Availability is optional context: a failed lookup is logged and the
/// recommendation is generated without it.
pub async fn recommend_for_details(
    provider: &dyn StreamingProvider,
    llm: &dyn LanguageModel,
    details: MediaDetails,
) -> AppResult<Recommendation> {
    let title_id: TitleId = details.id();

    let availability = match provider.fetch_availability(&title_id).await {
        Ok(availability) => Some(availability),
        Err(e) => {
            tracing::warn!(
                title_id = %title_id,
                provider = provider.name(),
                error = %e,
                "Availability lookup failed, recommending without it"
            );
            None
        }
    };

    let prompt = build_prompt(&details, availability.as_ref());
    let recommendation = llm.complete(SYSTEM_PROMPT, &prompt).await?;

    Ok(Recommendation {
        details,
        availability,
        recommendation,
        model: llm.model(),
        generated_at: Utc::now(),
    })
}

/// Builds the user prompt from title metadata and streaming availability
pub fn build_prompt(details: &MediaDetails, availability: Option<&StreamingAvailability>) -> String {
    let mut prompt =
        String::from("Given the following media details, provide a personalized recommendation:\n");

    let year = details
        .release_year
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    prompt.push_str(&format!("Title: {}{}\n", details.title, year));

    let kind = match details.media_type {
        MediaType::Movie => "Movie",
        MediaType::Tv => "TV series",
    };
    prompt.push_str(&format!("Type: {}\n", kind));

    if let Some(tagline) = &details.tagline {
        prompt.push_str(&format!("Tagline: {}\n", tagline));
    }

    prompt.push_str(&format!(
        "Overview: {}\n",
        details
            .overview
            .as_deref()
            .unwrap_or("No overview available")
    ));

    let genres = details.genre_names();
    if !genres.is_empty() {
        prompt.push_str(&format!("Genres: {}\n", genres.join(", ")));
    }

    if !details.directors.is_empty() {
        let label = match details.media_type {
            MediaType::Movie => "Directed by",
            MediaType::Tv => "Created by",
        };
        prompt.push_str(&format!("{}: {}\n", label, details.directors.join(", ")));
    }

    if !details.cast.is_empty() {
        let cast: Vec<&str> = details
            .cast
            .iter()
            .take(PROMPT_CAST)
            .map(|c| c.name.as_str())
            .collect();
        prompt.push_str(&format!("Starring: {}\n", cast.join(", ")));
    }

    prompt.push_str(&where_to_watch(availability));

    prompt.push_str(
        "\nWrite a compelling recommendation that highlights unique aspects of this media \
         and mentions where it can be watched.",
    );
    prompt
}

fn where_to_watch(availability: Option<&StreamingAvailability>) -> String {
    let Some(availability) = availability else {
        return "Where to watch: unknown\n".to_string();
    };

    if availability.services.is_empty() {
        return "Where to watch: not currently available on any tracked service\n".to_string();
    }

    let mut included: Vec<&str> = Vec::new();
    for service in availability.included() {
        if !included.contains(&service.service_name.as_str()) {
            included.push(&service.service_name);
        }
    }

    let mut other: Vec<String> = Vec::new();
    for service in &availability.services {
        if included.contains(&service.service_name.as_str()) {
            continue;
        }
        let entry = format!("{} ({})", service.service_name, service.availability_type);
        if !other.contains(&entry) {
            other.push(entry);
        }
    }

    let mut block = String::from("Where to watch:\n");
    if !included.is_empty() {
        block.push_str(&format!("- Included with: {}\n", included.join(", ")));
    }
    if !other.is_empty() {
        block.push_str(&format!("- Also on: {}\n", other.join(", ")));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityType, CastMember, Genre, ServiceAvailability};
    use crate::services::openai::MockLanguageModel;

    fn matrix() -> MediaDetails {
        MediaDetails {
            tmdb_id: 603,
            media_type: MediaType::Movie,
            title: "The Matrix".to_string(),
            overview: Some("A hacker learns the truth about reality.".to_string()),
            tagline: None,
            genres: vec![
                Genre {
                    id: 28,
                    name: "Action".to_string(),
                },
                Genre {
                    id: 878,
                    name: "Science Fiction".to_string(),
                },
            ],
            release_year: Some(1999),
            runtime_minutes: Some(136),
            vote_average: Some(8.2),
            imdb_id: Some("tt0133093".to_string()),
            cast: vec![CastMember {
                name: "Keanu Reeves".to_string(),
                character: Some("Neo".to_string()),
            }],
            directors: vec!["Lana Wachowski".to_string(), "Lilly Wachowski".to_string()],
        }
    }

    fn service(name: &str, kind: AvailabilityType) -> ServiceAvailability {
        ServiceAvailability {
            service_id: name.to_lowercase(),
            service_name: name.to_string(),
            availability_type: kind,
            region: Some("US".to_string()),
            quality: None,
            price: None,
            link: None,
        }
    }

    #[derive(Clone)]
    struct FixedProvider(Option<Vec<ServiceAvailability>>);

    #[async_trait::async_trait]
    impl StreamingProvider for FixedProvider {
        async fn fetch_availability(&self, title_id: &TitleId) -> AppResult<StreamingAvailability> {
            match &self.0 {
                Some(services) => Ok(StreamingAvailability {
                    id: title_id.clone(),
                    services: services.clone(),
                    cached_at: Utc::now(),
                }),
                None => Err(AppError::ExternalApi("WatchMode is down".to_string())),
            }
        }

        fn clone_for_task(&self) -> Box<dyn StreamingProvider> {
            Box::new(self.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_build_prompt_includes_metadata() {
        let prompt = build_prompt(&matrix(), None);
        assert!(prompt.contains("Title: The Matrix (1999)"));
        assert!(prompt.contains("Type: Movie"));
        assert!(prompt.contains("Overview: A hacker learns the truth about reality."));
        assert!(prompt.contains("Genres: Action, Science Fiction"));
        assert!(prompt.contains("Directed by: Lana Wachowski, Lilly Wachowski"));
        assert!(prompt.contains("Starring: Keanu Reeves"));
        assert!(prompt.contains("Where to watch: unknown"));
    }

    #[test]
    fn test_build_prompt_missing_overview() {
        let mut details = matrix();
        details.overview = None;
        details.genres.clear();
        let prompt = build_prompt(&details, None);
        assert!(prompt.contains("Overview: No overview available"));
        assert!(!prompt.contains("Genres:"));
    }

    #[test]
    fn test_build_prompt_groups_services() {
        let availability = StreamingAvailability {
            id: TitleId::tmdb(MediaType::Movie, 603),
            services: vec![
                service("Apple TV", AvailabilityType::Rent),
                service("Max", AvailabilityType::Subscription),
                service("Max", AvailabilityType::Subscription),
                service("Apple TV", AvailabilityType::Buy),
                service("Tubi", AvailabilityType::Free),
            ],
            cached_at: Utc::now(),
        };

        let prompt = build_prompt(&matrix(), Some(&availability));
        assert!(prompt.contains("- Included with: Max, Tubi\n"));
        assert!(prompt.contains("- Also on: Apple TV (rent), Apple TV (buy)\n"));
    }

    #[test]
    fn test_build_prompt_no_services() {
        let availability = StreamingAvailability {
            id: TitleId::tmdb(MediaType::Movie, 603),
            services: vec![],
            cached_at: Utc::now(),
        };
        let prompt = build_prompt(&matrix(), Some(&availability));
        assert!(prompt.contains("not currently available"));
    }

    #[tokio::test]
    async fn test_recommend_for_details_uses_llm_output() {
        let mut llm = MockLanguageModel::new();
        llm.expect_complete()
            .withf(|system, prompt| {
                system.to_string() == SYSTEM_PROMPT && prompt.contains("Included with: Netflix")
            })
            .times(1)
            .returning(|_, _| Ok("Watch it tonight.".to_string()));
        llm.expect_model().return_const("gpt-test".to_string());

        let provider = FixedProvider(Some(vec![service(
            "Netflix",
            AvailabilityType::Subscription,
        )]));

        let recommendation = recommend_for_details(&provider, &llm, matrix()).await.unwrap();
        assert_eq!(recommendation.recommendation, "Watch it tonight.");
        assert_eq!(recommendation.model, "gpt-test");
        assert_eq!(recommendation.availability.unwrap().services.len(), 1);
    }

    #[tokio::test]
    async fn test_recommend_for_details_tolerates_availability_failure() {
        let mut llm = MockLanguageModel::new();
        llm.expect_complete()
            .withf(|_, prompt| prompt.contains("Where to watch: unknown"))
            .times(1)
            .returning(|_, _| Ok("Still great.".to_string()));
        llm.expect_model().return_const("gpt-test".to_string());

        let recommendation = recommend_for_details(&FixedProvider(None), &llm, matrix())
            .await
            .unwrap();
        assert!(recommendation.availability.is_none());
        assert_eq!(recommendation.recommendation, "Still great.");
    }

    #[tokio::test]
    async fn test_recommend_for_details_propagates_llm_failure() {
        let mut llm = MockLanguageModel::new();
        llm.expect_complete()
            .returning(|_, _| Err(AppError::RateLimited("slow down".to_string())));

        let err = recommend_for_details(&FixedProvider(Some(vec![])), &llm, matrix())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
    }
}
