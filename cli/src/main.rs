//! CLI entrypoint for gemini-relay
//!
//! This is the main binary that wires together all layers using
//! dependency injection and runs the Telegram long-polling loop.

use anyhow::{Context, Result};
use clap::Parser;
use relay_application::{ConversationController, SessionRegistry};
use relay_infrastructure::{
    BotCommand, ConfigLoader, FileConfig, GeminiBackend, JsonlConversationLogger, TelegramClient,
    UnavailableImagePipeline,
};
use relay_presentation::{Cli, CommandRouter, bot_commands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// How long in-flight requests get to post their final message on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let _log_guard = init_tracing(cli.verbose, cli.log_dir.as_deref());

    info!("Starting gemini-relay");

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };
    if let Some(token) = cli.tg_token {
        config.telegram.token = Some(token);
    }
    if let Some(key) = cli.gemini_key {
        config.gemini.api_key = Some(key);
    }
    config.validate()?;

    let tg_token = credential(&config.telegram.token)
        .context("Telegram bot token missing: pass TG_TOKEN or set telegram.token")?;
    let gemini_key = credential(&config.gemini.api_key)
        .context("Gemini API key missing: pass GEMINI_KEY or set gemini.api_key")?;

    // === Dependency Injection ===
    // Bot API calls get a total deadline; getUpdates overrides it per request.
    // Gemini streams can run for minutes, so that client only bounds connecting.
    let telegram_http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(Duration::from_secs(config.telegram.request_timeout_seconds))
        .build()
        .context("Failed to build Telegram HTTP client")?;
    let gemini_http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .context("Failed to build Gemini HTTP client")?;

    let telegram = Arc::new(TelegramClient::new(
        telegram_http,
        &config.telegram.api_base,
        tg_token,
    ));
    let backend = Arc::new(
        GeminiBackend::new(gemini_http, &config.gemini.api_base, gemini_key)
            .with_generation_config(config.gemini.to_generation_config())
            .with_safety_settings(config.gemini.to_safety_settings()),
    );
    let models = config.to_model_config();
    let shutdown = CancellationToken::new();

    let mut controller = ConversationController::new(
        Arc::new(SessionRegistry::new(config.models.default)),
        backend,
        telegram.clone(),
        Arc::new(UnavailableImagePipeline),
        models.clone(),
        config.to_relay_params(),
    )
    .with_cancellation(shutdown.clone());

    if let Some(path) = &config.logging.conversation_log {
        match JsonlConversationLogger::new(path) {
            Some(logger) => {
                info!("Writing conversation log to {}", logger.path().display());
                controller = controller.with_conversation_logger(Arc::new(logger));
            }
            None => warn!(
                "Conversation log {} could not be opened, continuing without it",
                path.display()
            ),
        }
    }

    // === Bot start-up ===
    let me = telegram
        .get_me()
        .await
        .context("Telegram did not accept the bot token")?;
    info!(
        "Logged in as @{} (id {})",
        me.username.as_deref().unwrap_or("unknown"),
        me.id
    );

    let mut router = CommandRouter::new(Arc::new(controller), telegram.clone());
    if let Some(username) = &me.username {
        router = router.with_bot_username(username.as_str());
    }
    let router = Arc::new(router);
    if let Err(e) = telegram.delete_webhook().await {
        warn!("Failed to delete webhook, polling may not receive updates: {}", e);
    }
    let commands: Vec<BotCommand> = bot_commands(&models)
        .into_iter()
        .map(|(command, description)| BotCommand::new(command, description))
        .collect();
    if let Err(e) = telegram.set_my_commands(&commands).await {
        warn!("Failed to register bot commands: {}", e);
    }
    info!(
        "Models: {} (primary), {} (secondary); default {}",
        models.primary, models.secondary, config.models.default
    );

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    poll_updates(&telegram, router, &config, shutdown).await;
    info!("gemini-relay stopped");
    Ok(())
}

/// Install the stderr subscriber and, with `--log-dir`, a daily rolling file.
///
/// `RUST_LOG` takes precedence over the `-v` count.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gemini-relay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

fn credential(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Long-poll Telegram until `shutdown` fires.
///
/// Each event is dispatched in its own task, so a slow answer in one chat
/// never delays another and a panic stays local to its request.
async fn poll_updates(
    telegram: &TelegramClient,
    router: Arc<CommandRouter>,
    config: &FileConfig,
    shutdown: CancellationToken,
) {
    let poll_timeout = Duration::from_secs(config.telegram.poll_timeout_seconds);
    let mut offset: i64 = 0;
    let mut backoff = INITIAL_BACKOFF;
    let mut tasks = JoinSet::new();

    info!("Polling for updates");
    loop {
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                warn!("Request task failed: {}", e);
            }
        }

        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = telegram.get_updates(offset, poll_timeout) => result,
        };

        match result {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(event) = update.to_inbound() else {
                        debug!("Skipping update {}", update.update_id);
                        continue;
                    };
                    let router = Arc::clone(&router);
                    tasks.spawn(async move { router.dispatch(event).await });
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {} (retrying in {:?})", e, backoff);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }

    if !tasks.is_empty() {
        info!("Waiting for {} in-flight request(s)", tasks.len());
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("Abandoning {} request(s) still running", tasks.len());
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
