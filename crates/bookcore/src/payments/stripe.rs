//! Minimal Stripe Checkout client (hosted payment page).

use reqwest::Client;
use serde::Deserialize;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::domain::{Country, Money};

/// Metadata attached to a checkout session and echoed back by the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub email: String,
    pub country: Country,
    pub chat_id: i64,
}

/// Parameters of one hosted checkout for a single item.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

impl CheckoutRequest {
    /// Form fields as Stripe expects them (bracketed keys for nested objects).
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("line_items[0][price]", self.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("customer_email", self.customer_email.clone()),
            ("metadata[email]", self.metadata.email.clone()),
            ("metadata[country]", self.metadata.country.code().to_string()),
            ("metadata[chat_id]", self.metadata.chat_id.to_string()),
        ]
    }
}

/// The part of Stripe's checkout session object we use.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl CheckoutSession {
    /// Amount known at creation time, zero when Stripe did not report it.
    pub fn money(&self) -> Money {
        Money::new(self.amount_total.unwrap_or(0), self.currency.clone().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> AppResult<Self> {
        let http = Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Client configured from STRIPE_SECRET_KEY and STRIPE_API_BASE.
    pub fn from_env() -> AppResult<Self> {
        if config::stripe::SECRET_KEY.is_empty() {
            return Err(AppError::Config("STRIPE_SECRET_KEY is not set".to_string()));
        }
        Self::new(config::stripe::SECRET_KEY.as_str(), config::stripe::API_BASE.as_str())
    }

    /// Creates a hosted checkout session and returns its id and redirect URL.
    pub async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let endpoint = format!("{}/v1/checkout/sessions", self.api_base);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.secret_key)
            .form(&request.form_params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(AppError::Stripe {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = serde_json::from_str(&body)?;
        if session.url.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::Stripe {
                status: status.as_u16(),
                message: format!("checkout session {} has no redirect URL", session.id),
            });
        }

        log::debug!("Created checkout session {}", session.id);
        Ok(session)
    }
}
