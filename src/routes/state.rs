use std::sync::Arc;

use crate::{
    config::Config,
    db::{Cache, CacheWriterHandle},
    services::{
        LanguageModel, OpenAiClient, RecommendationService, StreamingProvider, TmdbClient,
        WatchmodeProvider,
    },
};

/// Shared handles used by every handler
pub struct AppState {
    pub tmdb: Arc<TmdbClient>,
    pub streaming_provider: Arc<dyn StreamingProvider>,
    pub recommendations: RecommendationService,
}

impl AppState {
    pub fn new(
        tmdb: Arc<TmdbClient>,
        streaming_provider: Arc<dyn StreamingProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let recommendations =
            RecommendationService::new(tmdb.clone(), streaming_provider.clone(), llm);
        Self {
            tmdb,
            streaming_provider,
            recommendations,
        }
    }

    /// Wires the upstream clients described by `config`
    ///
    /// Must run inside a tokio runtime: the cache writer task is spawned here.
    pub fn from_config(config: &Config) -> anyhow::Result<(Self, CacheWriterHandle)> {
        let (cache, cache_handle) = Cache::from_url(config.redis_url.as_deref())?;
        let timeout = config.http_timeout();

        let tmdb = TmdbClient::new(
            cache.clone(),
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.tmdb_language.clone(),
            timeout,
        )?;

        let watchmode = WatchmodeProvider::new(
            cache,
            config.watchmode_api_key.clone(),
            config.watchmode_api_url.clone(),
            config.regions(),
            timeout,
        )?;

        let openai = OpenAiClient::new(
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
            config.openai_model.clone(),
            timeout,
        )?;

        tracing::info!(
            model = %config.openai_model,
            regions = %config.watchmode_regions,
            cache = cache_label(config),
            "Clients configured"
        );

        let state = Self::new(Arc::new(tmdb), Arc::new(watchmode), Arc::new(openai));
        Ok((state, cache_handle))
    }
}

fn cache_label(config: &Config) -> &'static str {
    if config.redis_url.is_some() {
        "redis"
    } else {
        "disabled"
    }
}
