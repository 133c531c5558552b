use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Reads a variable, treating empty or whitespace-only values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Bot token
/// Read from BOT_TOKEN, TELOXIDE_TOKEN or the legacy TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    non_empty("BOT_TOKEN")
        .or_else(|| non_empty("TELOXIDE_TOKEN"))
        .or_else(|| non_empty("TOKEN"))
        .unwrap_or_default()
});

/// Database file path
/// Read from DATABASE_PATH, falling back to a `sqlite:` DATABASE_URL
/// Default: database.sqlite
pub static DATABASE_PATH: Lazy<String> = Lazy::new(|| {
    non_empty("DATABASE_PATH")
        .or_else(|| non_empty("DATABASE_URL").map(|url| sqlite_path_from_url(&url)))
        .unwrap_or_else(|| "database.sqlite".to_string())
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> = Lazy::new(|| non_empty("LOG_FILE_PATH").unwrap_or_else(|| "app.log".to_string()));

/// Log level: error, warn, info, debug, trace
/// Read from LOG_LEVEL environment variable
/// Default: info
pub static LOG_LEVEL: Lazy<String> =
    Lazy::new(|| non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).to_lowercase());

/// Strips an optional `sqlite:`/`sqlite://` scheme from a connection string.
pub fn sqlite_path_from_url(url: &str) -> String {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
        .to_string()
}

/// Stripe configuration
pub mod stripe {
    use super::non_empty;
    use once_cell::sync::Lazy;

    /// Secret API key (sk_live_... / sk_test_...)
    /// Read from STRIPE_SECRET_KEY environment variable
    pub static SECRET_KEY: Lazy<String> = Lazy::new(|| non_empty("STRIPE_SECRET_KEY").unwrap_or_default());

    /// Signing secret of the webhook endpoint (whsec_...)
    /// Read from STRIPE_WEBHOOK_SECRET environment variable
    pub static WEBHOOK_SECRET: Lazy<String> = Lazy::new(|| non_empty("STRIPE_WEBHOOK_SECRET").unwrap_or_default());

    /// Base URL of the Stripe API
    /// Read from STRIPE_API_BASE environment variable
    /// Default: https://api.stripe.com
    pub static API_BASE: Lazy<String> =
        Lazy::new(|| non_empty("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".to_string()));

    /// Price used for every region unless overridden by STRIPE_PRICE_<CODE>
    /// Read from STRIPE_PRICE_ID environment variable (required)
    pub static DEFAULT_PRICE_ID: Lazy<String> = Lazy::new(|| non_empty("STRIPE_PRICE_ID").unwrap_or_default());

    /// Per-region price override, e.g. STRIPE_PRICE_TR
    pub fn region_price_override(code: &str) -> Option<String> {
        non_empty(&format!("STRIPE_PRICE_{}", code))
    }

    /// Maximum age of a signed webhook payload
    pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;
}

/// HTTP server configuration
pub mod server {
    use super::non_empty;
    use once_cell::sync::Lazy;

    /// Interface to bind
    /// Read from PUBLIC_HOST environment variable
    /// Default: localhost
    pub static HOST: Lazy<String> = Lazy::new(|| non_empty("PUBLIC_HOST").unwrap_or_else(|| "localhost".to_string()));

    /// Port to bind
    /// Read from PORT environment variable
    /// Default: 4242
    pub static PORT: Lazy<u16> = Lazy::new(|| non_empty("PORT").and_then(|v| v.parse().ok()).unwrap_or(4242));

    /// Externally reachable base URL used for checkout redirects
    /// Read from PUBLIC_BASE_URL environment variable
    /// Default: http://{PUBLIC_HOST}:{PORT}
    pub static PUBLIC_BASE_URL: Lazy<String> = Lazy::new(|| {
        non_empty("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}", *HOST, *PORT))
    });

    /// Redirect after a successful checkout
    /// Read from SUCCESS_URL environment variable
    /// Default: {PUBLIC_BASE_URL}/success.html
    pub static SUCCESS_URL: Lazy<String> =
        Lazy::new(|| non_empty("SUCCESS_URL").unwrap_or_else(|| format!("{}/success.html", *PUBLIC_BASE_URL)));

    /// Redirect after an abandoned checkout
    /// Read from CANCEL_URL environment variable
    /// Default: {PUBLIC_BASE_URL}/cancel.html
    pub static CANCEL_URL: Lazy<String> =
        Lazy::new(|| non_empty("CANCEL_URL").unwrap_or_else(|| format!("{}/cancel.html", *PUBLIC_BASE_URL)));

    /// Path of the Stripe webhook endpoint
    /// Read from WEBHOOK_PATH environment variable
    /// Default: /webhook
    pub static WEBHOOK_PATH: Lazy<String> = Lazy::new(|| {
        let path = non_empty("WEBHOOK_PATH").unwrap_or_else(|| "/webhook".to_string());
        if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        }
    });

    /// Directory with static pages (success.html, cancel.html)
    /// Read from PUBLIC_DIR environment variable
    /// Default: public
    pub static PUBLIC_DIR: Lazy<String> = Lazy::new(|| non_empty("PUBLIC_DIR").unwrap_or_else(|| "public".to_string()));

    /// Maximum accepted webhook body
    pub const MAX_BODY_BYTES: usize = 65_536;
}

/// Book files configuration
pub mod books {
    use super::non_empty;
    use once_cell::sync::Lazy;

    /// Directory holding one PDF per language
    /// Read from BOOKS_DIR environment variable
    /// Default: pfdSender
    pub static DIR: Lazy<String> = Lazy::new(|| non_empty("BOOKS_DIR").unwrap_or_else(|| "pfdSender".to_string()));

    /// File name prefix shared by every language edition
    /// Read from BOOK_TITLE environment variable
    /// Default: Trade-Plus.Online
    pub static TITLE: Lazy<String> =
        Lazy::new(|| non_empty("BOOK_TITLE").unwrap_or_else(|| "Trade-Plus.Online".to_string()));
}

/// Payment notification queue configuration
pub mod queue {
    use super::non_empty;
    use once_cell::sync::Lazy;

    /// Capacity of the completion notification queue
    /// Read from NOTIFICATION_QUEUE_CAPACITY environment variable
    /// Default: 100
    pub static CAPACITY: Lazy<usize> = Lazy::new(|| {
        non_empty("NOTIFICATION_QUEUE_CAPACITY")
            .and_then(|v| v.parse().ok())
            .filter(|capacity: &usize| *capacity > 0)
            .unwrap_or(100)
    });
}

/// In-memory session housekeeping
pub mod session {
    use super::non_empty;
    use once_cell::sync::Lazy;
    use std::time::Duration;

    /// How long an unpaid conversation may sit untouched before it is dropped
    /// Read from SESSION_IDLE_TTL_SECS environment variable
    /// Default: 86400 (one day)
    pub static IDLE_TTL: Lazy<Duration> = Lazy::new(|| {
        Duration::from_secs(
            non_empty("SESSION_IDLE_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(86_400),
        )
    });

    /// Interval between sweeps of abandoned sessions
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(600);
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for outbound HTTP requests (Stripe, Telegram) in seconds
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Database configuration
pub mod database {
    use super::Duration;

    /// Maximum number of pooled SQLite connections
    pub const POOL_SIZE: u32 = 8;

    /// How long a statement waits on a locked database (in seconds)
    pub const BUSY_TIMEOUT_SECS: u64 = 5;

    /// Busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

/// Names of required variables that `lookup` cannot resolve.
///
/// Kept separate from the environment so it can be tested without mutating
/// process state.
pub fn missing_required<F>(lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();

    let has = |name: &str| lookup(name).map(|v| !v.trim().is_empty()).unwrap_or(false);

    if !has("BOT_TOKEN") && !has("TELOXIDE_TOKEN") && !has("TOKEN") {
        missing.push("BOT_TOKEN");
    }
    if !has("STRIPE_SECRET_KEY") {
        missing.push("STRIPE_SECRET_KEY");
    }
    if !has("STRIPE_WEBHOOK_SECRET") {
        missing.push("STRIPE_WEBHOOK_SECRET");
    }
    if !has("STRIPE_PRICE_ID") {
        missing.push("STRIPE_PRICE_ID");
    }

    missing
}

/// Fails fast when a required variable is missing from the environment.
pub fn validate_required() -> AppResult<()> {
    let missing = missing_required(|name| env::var(name).ok());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "missing required environment variable(s): {}",
            missing.join(", ")
        )))
    }
}
