use std::sync::Arc;

use crate::{
    cli::{
        render_availability, render_details, render_genres, render_recommendation,
        render_search_page, Cli, Command, DiscoverCmd, ExitCode, Output, SearchCmd,
    },
    config::Config,
    error::AppResult,
    models::{Genre, SearchFilters, SearchPage, TitleId},
    routes::{create_router, AppState},
    services::title_search,
};

/// Runs the parsed command line against a freshly wired state
pub async fn run(cli: Cli, config: Config) -> ExitCode {
    let out = Output::new(&cli);

    let (state, cache_handle) = match AppState::from_config(&config) {
        Ok(wired) => wired,
        Err(e) => return out.error(format!("{:#}", e)),
    };
    let state = Arc::new(state);

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state, &config).await,
        Command::Search(cmd) => search(&state, &out, cmd).await,
        Command::Discover(cmd) => discover(&state, &out, cmd).await,
        Command::Details(cmd) => {
            let details = state.tmdb.details(cmd.media_type, cmd.id).await;
            print_result(&out, details, render_details)
        }
        Command::Where(cmd) => {
            let title_id = TitleId::tmdb(cmd.media_type, cmd.id);
            let availability = state.streaming_provider.fetch_availability(&title_id).await;
            print_result(&out, availability, render_availability)
        }
        Command::Genres(cmd) => {
            let genres = state.tmdb.genres(cmd.media_type).await.map(|mut genres| {
                genres.sort_by(|a, b| a.name.cmp(&b.name));
                genres
            });
            print_result(&out, genres, |g: &Vec<Genre>| render_genres(g))
        }
        Command::Recommend(cmd) => {
            let recommendation = state
                .recommendations
                .recommend_for_query(&cmd.query, cmd.scope)
                .await;
            print_result(&out, recommendation, render_recommendation)
        }
    };

    // Flush pending cache writes before the runtime goes away
    cache_handle.shutdown().await;

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => out.error(format!("{:#}", e)),
    }
}

async fn search(state: &AppState, out: &Output, cmd: SearchCmd) -> anyhow::Result<()> {
    let filters = SearchFilters {
        query: cmd.query,
        scope: cmd.scope,
        genre: cmd.genre,
        release_year: cmd.year,
        page: cmd.page,
    };
    let page = title_search::search_media(&state.tmdb, &filters).await;
    print_result(out, page, render_search_page)
}

async fn discover(state: &AppState, out: &Output, cmd: DiscoverCmd) -> anyhow::Result<()> {
    let page = discover_page(state, &cmd).await;
    print_result(out, page, render_search_page)
}

async fn discover_page(state: &AppState, cmd: &DiscoverCmd) -> AppResult<SearchPage> {
    let page = title_search::validate_page(cmd.page)?;
    let year = title_search::validate_year(cmd.year)?;
    let genre_id = match cmd.genre.as_deref() {
        Some(name) => Some(state.tmdb.resolve_genre(cmd.media_type, name).await?.id),
        None => None,
    };
    state
        .tmdb
        .discover(cmd.media_type, genre_id, year, page)
        .await
}

fn print_result<T: serde::Serialize>(
    out: &Output,
    result: AppResult<T>,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    let data = result?;
    out.print(&data, text)
}

async fn serve(state: Arc<AppState>, config: &Config) -> anyhow::Result<()> {
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
