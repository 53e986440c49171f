use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use play_publish::auth::Authenticator;
use play_publish::client::PublisherClient;
use play_publish::config::{PublishArgs, PublishConfig};
use play_publish::notes::{self, ReleaseNotesDir};
use play_publish::publish::shadowing::CleanupOutcome;
use play_publish::publish::Publisher;

#[derive(Parser)]
#[command(name = "play-publish")]
#[command(about = "Publish Android app binaries to Google Play tracks")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    publish: PublishArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload binaries, update the target track and commit (default)
    Publish(PublishArgs),
    /// List the release notes found in a whatsnew directory
    Notes {
        /// Directory containing whatsnew-<locale> files
        dir: PathBuf,
    },
}

/// Initialize tracing on stderr so stdout stays free for command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "play_publish=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Publish(args)) => publish(args).await?,
        Some(Commands::Notes { dir }) => {
            let notes = notes::read_localized_notes(&dir)?;
            if notes.is_empty() {
                println!("No release notes found in {}", dir.display());
            }
            for (locale, text) in notes {
                println!("{}: {} characters", locale, text.chars().count());
            }
        }
        None => publish(cli.publish).await?,
    }

    Ok(())
}

async fn publish(args: PublishArgs) -> anyhow::Result<()> {
    let config = PublishConfig::from_args(args).context("Issue with input")?;
    config.log_summary();

    let token = Authenticator::new()
        .access_token(&config.credentials)
        .await
        .context("Failed to create publisher client")?;
    let client = PublisherClient::with_urls(&config.api_url, &config.upload_url, Some(token));
    tracing::info!("Client created");

    let notes = ReleaseNotesDir::new(config.whatsnew_dir.clone());
    let publisher = Publisher::new(client, config);
    let report = publisher.run(&notes).await?;

    for cleanup in &report.cleanup {
        match cleanup.outcome {
            CleanupOutcome::Cleared { releases } => {
                tracing::info!("Cleared {} release(s) on track {}", releases, cleanup.track)
            }
            CleanupOutcome::NothingToClear => {
                tracing::info!("Nothing to clear on track {}", cleanup.track)
            }
            CleanupOutcome::Empty => tracing::info!("Track {} had no releases", cleanup.track),
        }
    }
    tracing::info!(
        "Published versions {:?} to {} in edit {}",
        report.version_codes(),
        report.track.track,
        report.edit_id
    );

    Ok(())
}
