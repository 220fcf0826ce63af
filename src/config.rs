use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB API key (v3 `api_key` query parameter)
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// WatchMode API key
    pub watchmode_api_key: String,

    /// WatchMode API base URL
    #[serde(default = "default_watchmode_api_url")]
    pub watchmode_api_url: String,

    /// Comma separated WatchMode region codes
    #[serde(default = "default_watchmode_regions")]
    pub watchmode_regions: String,

    /// OpenAI API key
    pub openai_api_key: String,

    /// OpenAI API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Chat model used for recommendations
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Language passed to TMDB (`TMDB_LANGUAGE`; plain `LANGUAGE` belongs to the locale)
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Redis connection URL; caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout applied to every upstream HTTP request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_watchmode_api_url() -> String {
    "https://api.watchmode.com".to_string()
}

fn default_watchmode_regions() -> String {
    "US".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = envy::from_iter::<_, Config>(vars).map_err(|e| match e {
            // envy reports the field name; users set the variable
            envy::Error::MissingValue(field) => anyhow::anyhow!(
                "Failed to load config: {} is not set",
                field.to_uppercase()
            ),
            other => anyhow::anyhow!("Failed to load config: {}", other),
        })?;
        config.validate()?;
        // `REDIS_URL=` in a .env file means no cache
        config.redis_url = config.redis_url.filter(|url| !url.trim().is_empty());
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let keys = [
            ("TMDB_API_KEY", &self.tmdb_api_key),
            ("WATCHMODE_API_KEY", &self.watchmode_api_key),
            ("OPENAI_API_KEY", &self.openai_api_key),
        ];
        for (name, value) in keys {
            if value.trim().is_empty() {
                anyhow::bail!("Failed to load config: {} is empty", name);
            }
        }
        Ok(())
    }

    /// Region codes WatchMode results are restricted to
    pub fn regions(&self) -> Vec<String> {
        self.watchmode_regions
            .split(',')
            .map(|r| r.trim().to_uppercase())
            .filter(|r| !r.is_empty())
            .collect()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Socket address string for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
