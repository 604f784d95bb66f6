#![forbid(unsafe_code)]

//! `chunibot`: Slack bot running guess-the-song rounds.
//!
//! Bootstraps configuration, the `SQLite` catalog, the Slack Socket Mode
//! integration, and the HTTP login relay.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use chunibot::config::GlobalConfig;
use chunibot::game::jacket::HttpJacketSource;
use chunibot::game::round::GuessGame;
use chunibot::game::session_manager::SessionManager;
use chunibot::persistence::db;
use chunibot::persistence::leaderboard_repo::LeaderboardRepo;
use chunibot::persistence::song_repo::SongRepo;
use chunibot::slack::client::SlackService;
use chunibot::slack::notifier::SlackNotifier;
use chunibot::state::AppState;
use chunibot::web::{relay::LoginRelay, server};
use chunibot::{AppError, Result};

/// Time given to the send queue to flush round results on shutdown.
const SHUTDOWN_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "chunibot", about = "Guess-the-song Slack bot", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Import a JSON song catalog into the database and exit.
    #[arg(long)]
    import_songs: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("chunibot bootstrap");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.db_path).await?);
    info!(path = %config.db_path.display(), "database connected");

    if let Some(path) = args.import_songs {
        let raw = std::fs::read_to_string(&path)
            .map_err(|err| AppError::Io(format!("cannot read song catalog: {err}")))?;
        let count = SongRepo::new(db).import_json(&raw).await?;
        info!(count, "song catalog imported");
        return Ok(());
    }

    // Load Slack credentials from keyring / env vars.
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Slack and game wiring ───────────────────────────
    let http = reqwest::Client::new();
    let (slack, queue_handle) = SlackService::start(&config.slack, http.clone()).map_err(|err| {
        error!(%err, "slack service start failed");
        err
    })?;
    let slack = Arc::new(slack);

    let sessions = SessionManager::new(config.guess.timeout(), config.guess.similarity_threshold);
    let game = GuessGame::new(
        sessions,
        Arc::new(SongRepo::new(Arc::clone(&db))),
        Arc::new(HttpJacketSource::new(http, config.jacket_base_url.clone())),
        Arc::new(LeaderboardRepo::new(Arc::clone(&db))),
        Arc::new(SlackNotifier::new(Arc::clone(&slack))),
    )
    .with_crop_size(config.guess.crop_size);

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        db,
        slack: Some(Arc::clone(&slack)),
        game,
        relay: LoginRelay::new(),
    });

    // ── Start listeners ─────────────────────────────────
    let ct = CancellationToken::new();
    let relay_handle = if config.login.enabled {
        let relay = state.relay.clone();
        let port = config.login.port;
        let relay_ct = ct.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = server::serve(relay, port, relay_ct).await {
                error!(%err, "login relay failed");
            }
        }))
    } else {
        info!("login relay disabled");
        None
    };

    let socket_handle = slack.spawn_socket_mode(Arc::clone(&state));
    info!("chunibot ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // Running rounds end as skipped so their answers are still posted.
    let active = state.game.sessions().active_channels();
    for channel_id in &active {
        if let Err(err) = state.game.sessions().skip(channel_id) {
            warn!(%err, channel_id, "failed to end round on shutdown");
        }
    }
    if !active.is_empty() {
        tokio::time::sleep(SHUTDOWN_DRAIN).await;
    }

    socket_handle.abort();
    if let Some(handle) = relay_handle {
        let _ = handle.await;
    }
    queue_handle.abort();
    info!(rounds = active.len(), "chunibot shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
