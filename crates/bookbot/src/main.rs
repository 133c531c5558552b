use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::sync::oneshot;

use bookbot::checkout::{CheckoutProvider, CheckoutService};
use bookbot::cli::{Cli, Commands};
use bookbot::engine::{BookLibrary, ConversationEngine};
use bookbot::relay::{notification_channel, PaymentRelay};
use bookbot::session::SessionStore;
use bookbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, Messenger, TelegramMessenger};
use bookbot::web::{self, WebState};
use bookcore::core::{config, init_logger, log_configuration};
use bookcore::payments::StripeClient;
use bookcore::{create_pool, SqliteStore, Store};

/// How long shutdown waits for the HTTP server and the relay queue
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Main entry point
///
/// Parses CLI arguments and dispatches to the subcommand; no subcommand runs the bot.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Environment must be loaded before any config static is read.
    if cli.command == Some(Commands::RunStaging) {
        if let Err(e) = dotenvy::from_filename(".env.staging") {
            eprintln!("Failed to load .env.staging: {}", e);
        }
    }
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) => run_bot().await,
        Some(Commands::RunStaging) => {
            log::info!("Running bot in staging mode");
            run_bot().await
        }
        Some(Commands::Migrate) => run_migrate(),
        Some(Commands::CheckConfig) => run_check_config(),
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot().await
        }
    }
}

fn run_migrate() -> Result<()> {
    create_pool(&config::DATABASE_PATH).context("Failed to migrate database")?;
    log::info!("Database {} is up to date", *config::DATABASE_PATH);
    Ok(())
}

fn run_check_config() -> Result<()> {
    log_configuration();
    config::validate_required()?;
    log::info!("Configuration OK");
    Ok(())
}

async fn run_bot() -> Result<()> {
    config::validate_required()?;
    log_configuration();

    let pool = create_pool(&config::DATABASE_PATH).context("Failed to create database pool")?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));

    let stripe = StripeClient::from_env().context("Failed to create Stripe client")?;
    let checkout: Arc<dyn CheckoutProvider> = Arc::new(CheckoutService::from_env(stripe, Arc::clone(&store)));

    let sessions = SessionStore::new();
    let sweeper_handle = tokio::spawn(sweep_sessions(sessions.clone()));

    let (notifications, receiver) = notification_channel(*config::queue::CAPACITY);
    let relay = PaymentRelay::new(Arc::clone(&store), sessions.clone(), Arc::clone(&messenger));
    let relay_handle = tokio::spawn(relay.run(receiver));

    let web_state = WebState::new(
        Arc::clone(&checkout),
        notifications,
        config::stripe::WEBHOOK_SECRET.as_str(),
    );
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = web::serve(web_state, &config::server::HOST, *config::server::PORT, shutdown).await {
            log::error!("HTTP server stopped: {:#}", e);
        }
    });

    let engine = Arc::new(ConversationEngine::new(
        sessions,
        store,
        checkout,
        messenger,
        BookLibrary::from_env(),
    ));
    let handler = schema(HandlerDeps::new(engine));

    log::info!("Starting Telegram dispatcher (long polling)");
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    sweeper_handle.abort();
    log::info!("Dispatcher shutdown, stopping HTTP server");
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await.is_err() {
        log::warn!("HTTP server did not stop within {:?}", SHUTDOWN_GRACE);
    }

    // The server owned the last sender, so the relay drains and exits.
    match tokio::time::timeout(SHUTDOWN_GRACE, relay_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Payment relay task ended abnormally: {}", e),
        Err(_) => log::warn!("Payment relay did not drain within {:?}", SHUTDOWN_GRACE),
    }

    Ok(())
}

/// Periodically drops conversations abandoned before payment.
async fn sweep_sessions(sessions: SessionStore) {
    let mut ticker = tokio::time::interval(config::session::SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let removed = sessions.sweep_abandoned(*config::session::IDLE_TTL);
        if removed > 0 {
            log::info!("Dropped {} abandoned session(s)", removed);
        }
    }
}
