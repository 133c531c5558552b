//! Checkout session creation shared by the bot and the HTTP endpoint

use std::sync::Arc;

use async_trait::async_trait;
use bookcore::core::config;
use bookcore::payments::{CheckoutMetadata, CheckoutRequest, PriceTable, StripeClient};
use bookcore::{AppError, AppResult, Country, Store};

/// Issues a hosted checkout URL for one buyer.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn checkout_url(&self, country: Country, email: &str, chat_id: i64) -> AppResult<String>;
}

/// Stripe-backed checkout that also records a pending payment for known users.
pub struct CheckoutService {
    stripe: StripeClient,
    prices: PriceTable,
    success_url: String,
    cancel_url: String,
    store: Arc<dyn Store>,
}

impl CheckoutService {
    pub fn new(
        stripe: StripeClient,
        prices: PriceTable,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            stripe,
            prices,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            store,
        }
    }

    /// Service configured from the environment (prices, redirect URLs).
    pub fn from_env(stripe: StripeClient, store: Arc<dyn Store>) -> Self {
        Self::new(
            stripe,
            PriceTable::from_env(),
            config::server::SUCCESS_URL.as_str(),
            config::server::CANCEL_URL.as_str(),
            store,
        )
    }
}

#[async_trait]
impl CheckoutProvider for CheckoutService {
    async fn checkout_url(&self, country: Country, email: &str, chat_id: i64) -> AppResult<String> {
        let request = CheckoutRequest {
            price_id: self.prices.price_for(country).to_string(),
            customer_email: email.to_string(),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
            metadata: CheckoutMetadata {
                email: email.to_string(),
                country,
                chat_id,
            },
        };

        let session = self.stripe.create_checkout_session(&request).await?;
        let url = session
            .url
            .clone()
            .ok_or_else(|| AppError::Stripe {
                status: 200,
                message: format!("checkout session {} has no redirect URL", session.id),
            })?;

        log::info!(
            "Checkout session {} created for chat {} ({}, {})",
            session.id,
            chat_id,
            email,
            country
        );

        // Audit trail only; the buyer gets the link even if this fails.
        match self.store.find_user_by_email(email).await {
            Ok(Some(user)) => {
                if let Err(e) = self
                    .store
                    .record_pending_payment(&session.id, user.id, session.money())
                    .await
                {
                    log::error!("Failed to record pending payment {}: {}", session.id, e);
                }
            }
            Ok(None) => log::debug!("No user for {} yet, pending payment {} not recorded", email, session.id),
            Err(e) => log::error!("Failed to look up user {} for session {}: {}", email, session.id, e),
        }

        Ok(url)
    }
}
