use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use media_info_api::db::Cache;
use media_info_api::routes::{create_router, AppState};
use media_info_api::services::{OpenAiClient, TmdbClient, WatchmodeProvider};

/// One mock server stands in for TMDB, WatchMode and OpenAI; their paths don't overlap
async fn create_test_server() -> (TestServer, ServerGuard) {
    let upstream = Server::new_async().await;
    let (cache, _handle) = Cache::disabled();
    let timeout = Duration::from_secs(5);

    let tmdb = TmdbClient::new(
        cache.clone(),
        "tmdb_key".to_string(),
        upstream.url(),
        "en-US".to_string(),
        timeout,
    )
    .unwrap();
    let watchmode = WatchmodeProvider::new(
        cache,
        "wm_key".to_string(),
        upstream.url(),
        vec!["US".to_string()],
        timeout,
    )
    .unwrap();
    let openai = OpenAiClient::new(
        "sk-test".to_string(),
        upstream.url(),
        "gpt-3.5-turbo".to_string(),
        timeout,
    )
    .unwrap();

    let state = AppState::new(Arc::new(tmdb), Arc::new(watchmode), Arc::new(openai));
    let server = TestServer::new(create_router(Arc::new(state))).unwrap();
    (server, upstream)
}

const MATRIX: &str = r#"{
    "id": 603,
    "title": "The Matrix",
    "overview": "Set in the 22nd century...",
    "release_date": "1999-03-30",
    "runtime": 136,
    "genres": [{"id": 878, "name": "Science Fiction"}],
    "imdb_id": "tt0133093",
    "credits": {"cast": [{"name": "Keanu Reeves", "character": "Neo", "order": 0}], "crew": []}
}"#;

#[tokio::test]
async fn test_health_check() {
    let (server, _upstream) = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (server, _upstream) = create_test_server().await;

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("test-req-1"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "test-req-1");

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert_eq!(generated.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn test_search_titles() {
    let (server, mut upstream) = create_test_server().await;

    let mock = upstream
        .mock("GET", "/search/multi")
        .match_query(Matcher::UrlEncoded("query".into(), "matrix".into()))
        .with_status(200)
        .with_body(r#"{"page":1,"results":[{"id":603,"media_type":"movie","title":"The Matrix","release_date":"1999-03-30","popularity":80.5}],"total_pages":1,"total_results":1}"#)
        .create_async()
        .await;

    let response = server
        .get("/api/v1/titles/search")
        .add_query_param("q", "matrix")
        .await;

    response.assert_status_ok();
    mock.assert_async().await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["total_results"], 1);
    assert_eq!(body["results"][0]["tmdb_id"], 603);
    assert_eq!(body["results"][0]["media_type"], "movie");
    assert_eq!(body["results"][0]["release_year"], 1999);
}

#[tokio::test]
async fn test_search_text_with_genre_filters_results() {
    let (server, mut upstream) = create_test_server().await;

    let _genres = upstream
        .mock("GET", "/genre/movie/list")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"genres":[{"id":27,"name":"Horror"},{"id":35,"name":"Comedy"}]}"#)
        .create_async()
        .await;

    let _search = upstream
        .mock("GET", "/search/movie")
        .match_query(Matcher::UrlEncoded("query".into(), "house".into()))
        .with_status(200)
        .with_body(r#"{"page":1,"results":[
            {"id":1,"title":"House","genre_ids":[27]},
            {"id":2,"title":"Funny House","genre_ids":[35]},
            {"id":3,"title":"Haunted House","genre_ids":[35,27]}
        ],"total_pages":1,"total_results":3}"#)
        .create_async()
        .await;

    let response = server
        .get("/api/v1/titles/search")
        .add_query_param("q", "house")
        .add_query_param("type", "movie")
        .add_query_param("genre", "horror")
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let ids: Vec<u64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["tmdb_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_search_without_filters_is_bad_request() {
    let (server, _upstream) = create_test_server().await;

    let response = server.get("/api/v1/titles/search").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("search query"));
}

#[tokio::test]
async fn test_title_details() {
    let (server, mut upstream) = create_test_server().await;

    let _mock = upstream
        .mock("GET", "/movie/603")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(MATRIX)
        .create_async()
        .await;

    let response = server.get("/api/v1/titles/movie/603").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["title"], "The Matrix");
    assert_eq!(body["imdb_id"], "tt0133093");
    assert_eq!(body["cast"][0]["character"], "Neo");
}

#[tokio::test]
async fn test_unknown_media_type_is_bad_request() {
    let (server, _upstream) = create_test_server().await;

    let response = server.get("/api/v1/titles/person/287").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_title_is_not_found() {
    let (server, mut upstream) = create_test_server().await;

    let _mock = upstream
        .mock("GET", "/tv/424242")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"status_message":"The resource you requested could not be found."}"#)
        .create_async()
        .await;

    let response = server.get("/api/v1/titles/tv/424242").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_availability() {
    let (server, mut upstream) = create_test_server().await;

    let _mock = upstream
        .mock("GET", "/v1/title/tv-66732/sources/")
        .match_query(Matcher::UrlEncoded("apiKey".into(), "wm_key".into()))
        .with_status(200)
        .with_body(r#"[{"source_id":203,"name":"Netflix","type":"sub","region":"US","format":"4K"}]"#)
        .create_async()
        .await;

    let response = server.get("/api/v1/titles/tv/66732/availability").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["services"][0]["service_id"], "netflix");
    assert_eq!(body["services"][0]["availability_type"], "subscription");
}

#[tokio::test]
async fn test_batch_availability_limits() {
    let (server, _upstream) = create_test_server().await;

    let response = server
        .post("/api/v1/availability")
        .json(&json!({ "titles": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_availability() {
    let (server, mut upstream) = create_test_server().await;

    let _mock = upstream
        .mock("GET", "/v1/title/movie-603/sources/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"source_id":387,"name":"Max","type":"sub","region":"US"}]"#)
        .create_async()
        .await;

    let response = server
        .post("/api/v1/availability")
        .json(&json!({ "titles": [{ "media_type": "movie", "id": 603 }] }))
        .await;

    response.assert_status_ok();
    let body: Vec<serde_json::Value> = response.json();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["services"][0]["service_name"], "Max");
}

#[tokio::test]
async fn test_genres_sorted_by_name() {
    let (server, mut upstream) = create_test_server().await;

    let _mock = upstream
        .mock("GET", "/genre/tv/list")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"genres":[{"id":37,"name":"Western"},{"id":16,"name":"Animation"}]}"#)
        .create_async()
        .await;

    let response = server.get("/api/v1/genres/tv").await;

    response.assert_status_ok();
    let body: Vec<serde_json::Value> = response.json();
    assert_eq!(body[0]["name"], "Animation");
    assert_eq!(body[1]["name"], "Western");
}

#[tokio::test]
async fn test_recommendation_by_tmdb_id() {
    let (server, mut upstream) = create_test_server().await;

    let _details = upstream
        .mock("GET", "/movie/603")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(MATRIX)
        .create_async()
        .await;

    let _sources = upstream
        .mock("GET", "/v1/title/movie-603/sources/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"source_id":387,"name":"Max","type":"sub","region":"US"}]"#)
        .create_async()
        .await;

    let completion = upstream
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::Regex("Included with: Max".to_string()))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  A landmark of sci-fi. Stream it on Max.  "}}]}"#)
        .create_async()
        .await;

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "tmdb_id": 603, "media_type": "movie" }))
        .await;

    response.assert_status_ok();
    completion.assert_async().await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["details"]["title"], "The Matrix");
    assert_eq!(body["recommendation"], "A landmark of sci-fi. Stream it on Max.");
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["availability"]["services"][0]["service_id"], "max");
}

#[tokio::test]
async fn test_recommendation_survives_availability_outage() {
    let (server, mut upstream) = create_test_server().await;

    let _details = upstream
        .mock("GET", "/movie/603")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(MATRIX)
        .create_async()
        .await;

    let _sources = upstream
        .mock("GET", "/v1/title/movie-603/sources/")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let _completion = upstream
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"Worth a watch."}}]}"#)
        .create_async()
        .await;

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "tmdb_id": 603, "media_type": "movie" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["availability"].is_null());
    assert_eq!(body["recommendation"], "Worth a watch.");
}

#[tokio::test]
async fn test_recommendation_by_query_without_results() {
    let (server, mut upstream) = create_test_server().await;

    let _search = upstream
        .mock("GET", "/search/multi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"page":1,"results":[],"total_pages":0,"total_results":0}"#)
        .create_async()
        .await;

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "query": "qwertyuiop" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendation_requires_input() {
    let (server, _upstream) = create_test_server().await;

    let response = server.post("/api/v1/recommendations").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "tmdb_id": 603 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_llm_rate_limit_maps_to_429() {
    let (server, mut upstream) = create_test_server().await;

    let _details = upstream
        .mock("GET", "/movie/603")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(MATRIX)
        .create_async()
        .await;

    let _sources = upstream
        .mock("GET", "/v1/title/movie-603/sources/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let _completion = upstream
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"Rate limit reached for requests"}}"#)
        .create_async()
        .await;

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "tmdb_id": 603, "media_type": "movie" }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Rate limit reached"));
}
