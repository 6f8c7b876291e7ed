use anyhow::{Context, Result};
use clap::Parser;
use relaybird::feeds::twitter::TwitterTimeline;
use relaybird::poster::dry_run::DryRunPoster;
use relaybird::poster::mastodon::MastodonPoster;
use relaybird::poster::media::HttpMediaFetcher;
use relaybird::poster::Destination;
use relaybird::{cursor, Config, Relay, Rewriter};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "relaybird")]
#[command(about = "Mirror new tweets from one account onto Mastodon", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/relaybird/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cursor file to resume from, overriding cursor_path in the config
    #[arg(long)]
    cursor: Option<PathBuf>,

    /// Log what would be posted without posting or saving the cursor
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,relaybird=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;
    tracing::debug!(path = %config_path.display(), "Configuration loaded");

    let cursor_path = cli.cursor.unwrap_or_else(|| config.cursor_path.clone());
    let cursor = cursor::load(&cursor_path);

    let source = TwitterTimeline::new(
        config.twitter.api_base.clone(),
        config.twitter.bearer_token.clone(),
    );
    let media = HttpMediaFetcher::new(config.max_media_bytes);
    let destination: Box<dyn Destination> = if cli.dry_run {
        Box::new(DryRunPoster::new())
    } else {
        Box::new(MastodonPoster::new(
            config.mastodon.server.clone(),
            config.mastodon.access_token.clone(),
        ))
    };

    let relay = Relay::new(
        &source,
        destination.as_ref(),
        &media,
        Rewriter::new(config.source_domain.clone()),
        config.relay_options(),
    );
    let report = relay.run(cursor).await?;

    if !cli.dry_run {
        cursor::store(&cursor_path, report.cursor)?;
    }

    tracing::info!(
        forwarded = report.forwarded.len(),
        skipped = report.skipped.len(),
        degraded = report.degraded().count(),
        cursor = ?report.cursor.last_id(),
        "Run complete"
    );

    if let Some(err) = report.halted {
        return Err(err).context("Relay stopped before the end of the batch");
    }

    Ok(())
}
