pub mod openai;
pub mod providers;
pub mod recommendations;
pub mod title_search;
pub mod tmdb;

pub use openai::{LanguageModel, OpenAiClient};
pub use providers::{StreamingProvider, WatchmodeProvider};
pub use recommendations::RecommendationService;
pub use tmdb::TmdbClient;
