/// Encore - playback coordinator console
use clap::Parser;
use encore_cli::{
    config::AppConfig,
    library::Playlist,
    repl,
    sim::{CatalogResolver, SimulatedDevice},
};
use encore_playback::{PlayerStateSnapshot, PlayerStatus, QueueEntryId};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Drive the Encore player from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Playlist to queue at startup
    #[arg(short, long)]
    playlist: Option<PathBuf>,

    /// Start playing the first queued track right away
    #[arg(long)]
    autoplay: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing on stderr so it does not interleave with the prompt
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore_cli=info,encore_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let playlist = match cli.playlist.or_else(|| config.library.playlist.clone()) {
        Some(path) => Playlist::load(&path)?,
        None => Playlist::default(),
    };
    info!(tracks = playlist.len(), "Playlist loaded");

    let (device, device_events) = SimulatedDevice::new(&config.simulation);
    let resolver = CatalogResolver::from_playlist(&playlist, &config.simulation);
    let player = encore_playback::spawn(
        config.player.clone(),
        Arc::new(resolver),
        device,
        device_events,
    )?;

    if !playlist.is_empty() {
        player.add_to_queue(playlist.identities()).await?;
        if cli.autoplay {
            player.play().await?;
        }
    }

    let watcher = tokio::spawn(print_changes(player.player_snapshots()));

    println!("{}", repl::HELP);
    repl::run(&player, &playlist).await?;

    info!("Shutting down");
    watcher.abort();
    player.shutdown().await?;

    Ok(())
}

/// Print a status line whenever the status or the current track changes
async fn print_changes(mut snapshots: watch::Receiver<PlayerStateSnapshot>) {
    let mut last: Option<(PlayerStatus, Option<QueueEntryId>)> = None;

    while snapshots.changed().await.is_ok() {
        let line = {
            let snapshot = snapshots.borrow_and_update();
            let key = (
                snapshot.status,
                snapshot.current.as_ref().map(|c| c.entry_id),
            );
            if last == Some(key) {
                continue;
            }
            last = Some(key);
            repl::format_status(&snapshot)
        };
        println!("\r{line}");
    }
}
