//! Stripe Checkout: price table, session creation and webhook verification

pub mod prices;
pub mod stripe;
pub mod webhook;

pub use prices::PriceTable;
pub use stripe::{CheckoutMetadata, CheckoutRequest, CheckoutSession, StripeClient};
pub use webhook::{verify_signature, CompletedCheckout, SignatureError, StripeEvent};
