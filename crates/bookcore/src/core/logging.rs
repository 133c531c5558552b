//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Startup diagnostics for the payment and delivery settings

use anyhow::Result;
use simplelog::*;
use std::fs::File;
use std::path::Path;

use crate::core::config;
use crate::domain::BookLanguage;

/// Maps a LOG_LEVEL value to a filter, falling back to Info.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
    let level = level_filter(&config::LOG_LEVEL);

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Shows the first few characters of a secret so operators can tell test keys from live ones.
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<not set>".to_string();
    }
    let prefix: String = secret.chars().take(8).collect();
    format!("{}…", prefix)
}

/// Logs the effective configuration at application startup
///
/// Secrets are masked. Missing book files are reported but do not stop the
/// bot: a language whose PDF is absent fails only when a buyer picks it.
pub fn log_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📚 Book bot configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    log::info!("Database: {}", *config::DATABASE_PATH);
    log::info!("Stripe API: {}", *config::stripe::API_BASE);
    log::info!("Stripe secret key: {}", mask_secret(&config::stripe::SECRET_KEY));
    log::info!("Webhook secret: {}", mask_secret(&config::stripe::WEBHOOK_SECRET));
    log::info!("Default price: {}", *config::stripe::DEFAULT_PRICE_ID);
    log::info!(
        "HTTP server: {}:{} (public base {})",
        *config::server::HOST,
        *config::server::PORT,
        *config::server::PUBLIC_BASE_URL
    );
    log::info!("Webhook path: {}", *config::server::WEBHOOK_PATH);
    log::info!("Success URL: {}", *config::server::SUCCESS_URL);
    log::info!("Cancel URL: {}", *config::server::CANCEL_URL);
    log::info!("Notification queue capacity: {}", *config::queue::CAPACITY);

    let books_dir = Path::new(config::books::DIR.as_str());
    let mut missing = Vec::new();
    for lang in BookLanguage::ALL {
        let path = lang.book_path(books_dir, &config::books::TITLE);
        if path.is_file() {
            log::info!("✅ {}: {}", lang.code(), path.display());
        } else {
            missing.push(lang.code());
            log::warn!("⚠️  {}: {} (FILE NOT FOUND)", lang.code(), path.display());
        }
    }

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if missing.is_empty() {
        log::info!("✅ All book editions present");
    } else {
        log::warn!("❌ Missing book editions: {}", missing.join(", "));
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
