//! bookbot - sells a PDF book over Telegram with Stripe Checkout
//!
//! # Module Structure
//!
//! - `telegram`: bot setup, keyboards, outbound messenger, dispatcher schema
//! - `session`: per-chat conversation state with per-chat locking
//! - `engine`: the purchase state machine
//! - `checkout`: checkout session creation
//! - `relay`: queue of confirmed payments and its consumer
//! - `web`: checkout endpoint, Stripe webhook, static pages

pub mod checkout;
pub mod cli;
pub mod engine;
pub mod relay;
pub mod session;
pub mod telegram;
pub mod web;

// Re-export commonly used types for convenience
pub use checkout::{CheckoutProvider, CheckoutService};
pub use engine::{BookLibrary, ConversationEngine, Inbound, Outcome};
pub use relay::{notification_channel, PaymentNotification, PaymentRelay};
pub use session::{ConversationState, SessionStore};
