//! Raw WatchMode API payloads

use serde::Deserialize;

/// Row of `/v1/search/` results
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeTitle {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSearchResponse {
    #[serde(default)]
    pub title_results: Vec<WatchmodeTitle>,
}

/// Row of `/v1/title/{id}/sources/`
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSource {
    pub source_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Error body WatchMode returns alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchmodeStatus {
    #[serde(default)]
    pub status_message: Option<String>,
}
