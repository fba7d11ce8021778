use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blobstream_replay::commands::{
    self,
    cli::{Cli, Commands},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format)?;

    match cli.command {
        Commands::Start(args) => commands::command::start(args).await?,
        Commands::Verify(args) => commands::command::verify(args).await?,
        Commands::Version {} => commands::command::version(),
    }

    Ok(())
}

/// `RUST_LOG` takes precedence over the configured level so per-module
/// directives keep working.
fn init_tracing(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new(level),
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        "json" => builder.json().init(),
        "plain" => builder.init(),
        other => bail!("unsupported log format {other}, expected plain or json"),
    }
    Ok(())
}
