use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reorderify as lib;
use lib::aggregate;
use lib::api::spotify::SpotifyClient;
use lib::api::spotify_auth;
use lib::config::Config;
use lib::reorder::{reorder_playlist, ReorderOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "reorderify", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Spotify access token (from `reorderify auth`)
    #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize with Spotify (interactive) and print the tokens
    Auth,
    /// Exchange a refresh token for a new access token
    Refresh {
        #[arg(long)]
        refresh_token: String,
    },
    /// List all playlists, sorted by name
    Playlists,
    /// List the catalog tracks of a playlist
    Tracks {
        /// Playlist name (defaults to `default_playlist` from the config)
        #[arg(long)]
        playlist: Option<String>,
    },
    /// Copy a playlist into a new `<name><suffix>` backup playlist
    Backup {
        #[arg(long)]
        playlist: Option<String>,
    },
    /// Reverse the track order of a playlist
    Reorder {
        #[arg(long)]
        playlist: Option<String>,

        /// Reverse a backup copy (first `dry_run_track_limit` tracks) instead of the original
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate config file and exit
    ConfigValidate,
}

fn init_logging(cfg: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Bridge `log` records (HTTP client) into tracing.
    let _ = LogTracer::init();
    std::fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("creating log dir {}", cfg.log_dir.display()))?;
    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(&cfg.log_dir, "reorderify.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber_global::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;
    Ok(guard)
}

fn require_token(token: Option<String>) -> Result<String> {
    token.ok_or_else(|| anyhow::anyhow!("an access token is required: pass --access-token or set SPOTIFY_ACCESS_TOKEN (run `reorderify auth` to obtain one)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(p) => format!("loading config from {}", p.display()),
        None => "loading config".to_string(),
    })?;

    if let Commands::ConfigValidate = cli.command {
        match cfg.validate() {
            Ok(()) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }
    cfg.validate().context("invalid config")?;

    let _guard = init_logging(&cfg)?;

    let client = SpotifyClient::with_timeout(Duration::from_secs(cfg.request_timeout_secs))
        .context("building http client")?;
    let playlist_name = |arg: Option<String>| arg.unwrap_or_else(|| cfg.default_playlist.clone());

    match cli.command {
        Commands::Auth => {
            let tr = spotify_auth::run_spotify_auth(&cfg).await.context("spotify authorization")?;
            println!("access_token={}", tr.access_token);
            if let Some(rt) = tr.refresh_token {
                println!("refresh_token={}", rt);
            }
            println!("expires_in={}", tr.expires_in);
        }
        Commands::Refresh { refresh_token } => {
            let tr = spotify_auth::refresh_access_token(&cfg, &refresh_token)
                .await
                .context("refreshing access token")?;
            println!("access_token={}", tr.access_token);
        }
        Commands::Playlists => {
            let token = require_token(cli.access_token)?;
            let playlists = aggregate::list_all_playlists(&client, &token)
                .await
                .context("listing playlists")?;
            for p in &playlists {
                println!("{}\t{}\t{} tracks\t{}", p.id, p.name, p.track_count, p.snapshot_id);
            }
        }
        Commands::Tracks { playlist } => {
            let token = require_token(cli.access_token)?;
            let name = playlist_name(playlist);
            let pl = aggregate::find_playlist_by_name(&client, &token, &name).await?;
            let tracks = aggregate::list_all_tracks(&client, &token, &pl.id, pl.track_count, cfg.page_concurrency)
                .await
                .with_context(|| format!("fetching tracks of {}", name))?;
            for t in &tracks {
                println!("{}", t);
            }
        }
        Commands::Backup { playlist } => {
            let token = require_token(cli.access_token)?;
            let name = playlist_name(playlist);
            let pl = aggregate::find_playlist_by_name(&client, &token, &name).await?;
            let tracks = aggregate::list_all_tracks(&client, &token, &pl.id, pl.track_count, cfg.page_concurrency)
                .await
                .with_context(|| format!("fetching tracks of {}", name))?;
            let backup_id = lib::backup::create_backup(&client, &token, &name, &cfg.backup_suffix)
                .await
                .context("creating backup playlist")?;
            let report = lib::backup::append_all(
                &client,
                &token,
                &tracks,
                &backup_id,
                cfg.max_batch_size,
                &cfg.retry_policy(),
            )
            .await
            .context("copying tracks into backup")?;
            println!(
                "Backed up {} tracks into {} ({} batches)",
                tracks.len(),
                lib::backup::backup_playlist_name(&name, &cfg.backup_suffix),
                report.batches
            );
        }
        Commands::Reorder { playlist, dry_run } => {
            let token = require_token(cli.access_token)?;
            let name = playlist_name(playlist);
            let pl = aggregate::find_playlist_by_name(&client, &token, &name).await?;
            let opts = ReorderOptions::from_config(&cfg, dry_run);
            let outcome = reorder_playlist(&client, &token, &pl, &opts)
                .await
                .with_context(|| format!("reversing {}", name))?;
            println!("{}", outcome);
        }
        Commands::ConfigValidate => {}
    }

    Ok(())
}
