//! Command-line front end
//!
//! Without a subcommand the HTTP API is served. Every pipeline stage is also
//! reachable directly:
//!
//! ```bash
//! media-info search "stranger things"
//! media-info search --genre "science fiction" --year 1999 --type movie
//! media-info details 603 --type movie
//! media-info where 66732 --type tv --json
//! media-info recommend "the matrix"
//! ```

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt::Write as _;

use crate::models::{
    Genre, MediaDetails, MediaType, Recommendation, SearchPage, SearchScope,
    StreamingAvailability,
};

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

/// Movie and TV lookups backed by TMDB, WatchMode and OpenAI
#[derive(Parser, Debug)]
#[command(name = "media-info", version)]
pub struct Cli {
    /// Print JSON instead of text
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Subcommand to run (omit to serve the HTTP API)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Serve,

    /// Search titles by text, genre and/or release year
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Browse popular titles by genre and/or release year
    Discover(DiscoverCmd),

    /// Show full details for a TMDB title
    #[command(visible_alias = "i")]
    Details(TitleCmd),

    /// Show where a TMDB title can be streamed
    Where(TitleCmd),

    /// List genres for a media type
    Genres(GenresCmd),

    /// Generate a recommendation for the best match of a query
    #[command(visible_alias = "rec")]
    Recommend(RecommendCmd),
}

#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords); optional when filtering by genre or year
    pub query: Option<String>,

    /// multi, movie or tv
    #[arg(long = "type", short = 't', default_value = "multi")]
    pub scope: SearchScope,

    /// Genre name, e.g. "Science Fiction"
    #[arg(long, short = 'g')]
    pub genre: Option<String>,

    /// Release year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    #[arg(long, short = 'p')]
    pub page: Option<u32>,
}

#[derive(Args, Debug)]
pub struct DiscoverCmd {
    /// movie or tv
    #[arg(long = "type", short = 't', default_value = "movie")]
    pub media_type: MediaType,

    #[arg(long, short = 'g')]
    pub genre: Option<String>,

    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    #[arg(long, short = 'p')]
    pub page: Option<u32>,
}

#[derive(Args, Debug)]
pub struct TitleCmd {
    /// TMDB ID
    pub id: u64,

    /// movie or tv
    #[arg(long = "type", short = 't')]
    pub media_type: MediaType,
}

#[derive(Args, Debug)]
pub struct GenresCmd {
    /// movie or tv
    #[arg(long = "type", short = 't', default_value = "movie")]
    pub media_type: MediaType,
}

#[derive(Args, Debug)]
pub struct RecommendCmd {
    /// Title to look up
    pub query: String,

    /// multi, movie or tv
    #[arg(long = "type", short = 't', default_value = "multi")]
    pub scope: SearchScope,
}

/// Writes command results to stdout and errors to stderr
pub struct Output {
    pub json: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self { json: cli.json }
    }

    /// Prints JSON when requested, otherwise the rendered text
    pub fn print<T: Serialize>(&self, data: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(data)?);
        } else {
            print!("{}", text(data));
        }
        Ok(())
    }

    pub fn error(&self, msg: impl std::fmt::Display) -> ExitCode {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg.to_string() }));
        } else {
            eprintln!("Error: {}", msg);
        }
        ExitCode::Error
    }
}

const RULE: &str = "--------------------------------------------------";

pub fn render_search_page(page: &SearchPage) -> String {
    if page.results.is_empty() {
        return "No results found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "--- Results page {}/{} ({} total) ---",
        page.page,
        page.total_pages.max(1),
        page.total_results
    );
    for title in &page.results {
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Title: {} [{} {}]", title.title, title.media_type, title.tmdb_id);
        let _ = writeln!(
            out,
            "Release Year: {}",
            title
                .release_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        );
        let _ = writeln!(out, "Overview: {}", title.overview);
        let _ = writeln!(out, "Popularity: {:.1}", title.popularity);
    }
    let _ = writeln!(out, "{}", RULE);
    out
}

pub fn render_details(details: &MediaDetails) -> String {
    let mut out = String::new();
    let year = details
        .release_year
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    let _ = writeln!(out, "{}{}", details.title, year);
    if let Some(tagline) = &details.tagline {
        let _ = writeln!(out, "\"{}\"", tagline);
    }
    let genres = details.genre_names();
    if !genres.is_empty() {
        let _ = writeln!(out, "Genres: {}", genres.join(", "));
    }
    if let Some(runtime) = details.runtime_minutes {
        let _ = writeln!(out, "Runtime: {} min", runtime);
    }
    if let Some(rating) = details.vote_average {
        let _ = writeln!(out, "Rating: {:.1}/10", rating);
    }
    if !details.directors.is_empty() {
        let label = match details.media_type {
            MediaType::Movie => "Directed by",
            MediaType::Tv => "Created by",
        };
        let _ = writeln!(out, "{}: {}", label, details.directors.join(", "));
    }
    if !details.cast.is_empty() {
        let _ = writeln!(out, "Cast:");
        for member in &details.cast {
            match &member.character {
                Some(character) => {
                    let _ = writeln!(out, "  {} as {}", member.name, character);
                }
                None => {
                    let _ = writeln!(out, "  {}", member.name);
                }
            }
        }
    }
    let _ = writeln!(
        out,
        "\n{}",
        details.overview.as_deref().unwrap_or("No overview available")
    );
    out
}

pub fn render_availability(availability: &StreamingAvailability) -> String {
    if availability.services.is_empty() {
        return format!("{}: not available on any tracked service\n", availability.id);
    }

    let mut out = String::new();
    for service in &availability.services {
        let _ = write!(out, "{:<20} {:<13}", service.service_name, service.availability_type);
        if let Some(region) = &service.region {
            let _ = write!(out, " {}", region);
        }
        if let Some(quality) = &service.quality {
            let _ = write!(out, " {}", quality);
        }
        if let Some(price) = service.price {
            let _ = write!(out, " ${:.2}", price);
        }
        if let Some(link) = &service.link {
            let _ = write!(out, " {}", link);
        }
        out.push('\n');
    }
    out
}

pub fn render_genres(genres: &[Genre]) -> String {
    genres.iter().map(|g| format!("{:>6}  {}\n", g.id, g.name)).collect()
}

pub fn render_recommendation(recommendation: &Recommendation) -> String {
    let mut out = render_details(&recommendation.details);
    let _ = writeln!(out, "\nWhere to watch:");
    match &recommendation.availability {
        Some(availability) => out.push_str(&render_availability(availability)),
        None => out.push_str("unknown (availability lookup failed)\n"),
    }
    let _ = writeln!(out, "\nRecommendation ({}):", recommendation.model);
    let _ = writeln!(out, "{}", recommendation.recommendation);
    out
}
