//! HTTP surface: checkout session creation, Stripe webhook, static pages

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bookcore::core::config;
use bookcore::core::validation::validate_email;
use bookcore::payments::webhook::{self, CompletedCheckout, SignatureError, SIGNATURE_HEADER};
use bookcore::{AppError, AppResult, Country};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::checkout::CheckoutProvider;
use crate::relay::NotificationSender;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct WebState {
    pub checkout: Arc<dyn CheckoutProvider>,
    pub notifications: NotificationSender,
    pub webhook_secret: Arc<str>,
    pub signature_tolerance_secs: i64,
}

impl WebState {
    pub fn new(
        checkout: Arc<dyn CheckoutProvider>,
        notifications: NotificationSender,
        webhook_secret: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            checkout,
            notifications,
            webhook_secret: webhook_secret.into(),
            signature_tolerance_secs: config::stripe::SIGNATURE_TOLERANCE_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    pub country: Option<String>,
    pub email: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Builds the router.
///
/// # Arguments
/// * `webhook_path` - where Stripe posts events (e.g. `/webhook`)
/// * `public_dir` - directory served for every other path
pub fn router(state: WebState, webhook_path: &str, public_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/create-checkout-session", get(create_checkout_session))
        .route(
            webhook_path,
            post(stripe_webhook).layer(DefaultBodyLimit::max(config::server::MAX_BODY_BYTES)),
        )
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
}

/// Binds `host:port` and serves until `shutdown` resolves.
///
/// Open connections are closed as part of the shutdown, so every clone of the
/// notification sender held by the router is gone once this returns.
pub async fn serve<F>(state: WebState, host: &str, port: u16, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(
        state,
        &config::server::WEBHOOK_PATH,
        Path::new(config::server::PUBLIC_DIR.as_str()),
    );

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

    log::info!("HTTP server listening on http://{}", addr);
    log::info!("  GET  /create-checkout-session");
    log::info!("  POST {}", *config::server::WEBHOOK_PATH);
    log::info!("  GET  /health");

    serve_with_listener(listener, app, shutdown).await
}

/// Serves `app` on an already bound listener until `shutdown` resolves.
pub async fn serve_with_listener<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
    log::info!("HTTP server stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Client errors become 400 with their message; anything else is a 500.
fn error_response(context: &str, err: &AppError) -> Response {
    if err.is_client_error() {
        log::warn!("{} rejected: {}", context, err);
        (StatusCode::BAD_REQUEST, err.to_string()).into_response()
    } else {
        log::error!("{} failed: {}", context, err);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

fn parse_checkout_query(query: &CheckoutQuery) -> AppResult<(Country, String, i64)> {
    let email = validate_email(query.email.as_deref().unwrap_or_default())?;

    let chat_id = query
        .chat_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::Validation("chat_id is required".into()))?
        .parse::<i64>()
        .map_err(|_| AppError::Validation("chat_id must be an integer".into()))?;

    let country = Country::from_code_or_default(query.country.as_deref().map(str::trim));
    Ok((country, email, chat_id))
}

async fn create_checkout_session(State(state): State<WebState>, Query(query): Query<CheckoutQuery>) -> Response {
    let (country, email, chat_id) = match parse_checkout_query(&query) {
        Ok(parsed) => parsed,
        Err(e) => return error_response("Checkout request", &e),
    };

    match state.checkout.checkout_url(country, &email, chat_id).await {
        Ok(url) => Json(CheckoutResponse { url }).into_response(),
        Err(e) => {
            log::error!("Checkout session for chat {} failed: {}", chat_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to create checkout session").into_response()
        }
    }
}

/// Authenticates and decodes one delivery. `Ok(None)` for event types the
/// bot does not act on.
fn completed_checkout(state: &WebState, headers: &HeaderMap, body: &[u8]) -> AppResult<Option<CompletedCheckout>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader)?;

    webhook::verify_signature(
        body,
        signature,
        &state.webhook_secret,
        chrono::Utc::now().timestamp(),
        state.signature_tolerance_secs,
    )?;

    let event = webhook::parse_event(body)?;
    let completed = CompletedCheckout::from_event(&event)?;
    if completed.is_none() {
        log::debug!("Ignoring Stripe event {} ({})", event.id, event.event_type);
    }
    Ok(completed)
}

async fn stripe_webhook(State(state): State<WebState>, headers: HeaderMap, body: Bytes) -> Response {
    let completed = match completed_checkout(&state, &headers, &body) {
        Ok(Some(completed)) => completed,
        Ok(None) => return StatusCode::OK.into_response(),
        Err(e) => return error_response("Webhook", &e),
    };

    log::info!(
        "Checkout {} completed for {} (chat {})",
        completed.session_id,
        completed.email,
        completed.chat_id
    );

    if state.notifications.send(completed.into()).await.is_err() {
        log::error!("Payment relay is not running; notification lost");
        return (StatusCode::INTERNAL_SERVER_ERROR, "relay unavailable").into_response();
    }

    StatusCode::OK.into_response()
}
