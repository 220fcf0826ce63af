use clap::Parser;
use tracing_subscriber::EnvFilter;

use media_info_api::{
    cli::{Cli, Output},
    commands,
    config::Config,
};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Logs go to stderr so `--json` output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("media_info_api=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let out = Output::new(&cli);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => return out.error(format!("{:#}", e)).into(),
    };

    commands::run(cli, config).await.into()
}
