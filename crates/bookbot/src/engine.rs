//! Conversation engine: the per-chat purchase state machine
//!
//! ```text
//! Idle --/start--> AwaitingEmail --valid email--> AwaitingCountry
//!   --country_<CODE>, user saved, checkout created--> AwaitingPayment
//!   --payment relay--> AwaitingLanguage --language--> (book sent) Idle
//! ```
//!
//! `/start` restarts the flow from any state. Events that do not fit the
//! current state are logged and ignored.

use std::path::PathBuf;
use std::sync::Arc;

use bookcore::core::config;
use bookcore::core::validation::is_valid_email;
use bookcore::{AppResult, BookLanguage, Country, Store};
use teloxide::types::ChatId;

use crate::checkout::CheckoutProvider;
use crate::session::{ConversationState, SessionStore};
use crate::telegram::keyboards::Keyboard;
use crate::telegram::messenger::Messenger;

/// User-facing texts
pub mod texts {
    pub const ENTER_EMAIL: &str = "Please enter your email:";
    pub const INVALID_EMAIL: &str = "❌ Please enter a valid email in the format example@domain.com";
    pub const SELECT_REGION: &str = "Select your region:";
    pub const SAVE_FAILED: &str = "❌ Failed to save your data";
    pub const PAYMENT_FAILED: &str = "❌ Failed to start payment";
    pub const PAYMENT_SUCCEEDED: &str = "✅ Your payment was processed successfully! Please select the book language:";
    pub const PLEASE_WAIT: &str = "⏳ Please wait, sending the book...";
    pub const DELIVERY_FAILED: &str = "❌ Failed to send the book, please try again later";

    pub fn pay_here(url: &str) -> String {
        format!("💳 Please pay here:\n{}", url)
    }

    pub fn book_caption(lang: &str) -> String {
        format!("📘 Your book in: {}", lang)
    }
}

/// Inbound chat event, already stripped of Telegram specifics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Start,
    Text(String),
    Callback(String),
}

/// What handling one event did to the chat's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The session moved to a new state
    Transitioned(ConversationState),
    /// Input was rejected or a collaborator failed; the state is unchanged
    Held,
    /// The event does not apply to the current state
    Ignored,
}

/// Location of the language editions on disk.
#[derive(Debug, Clone)]
pub struct BookLibrary {
    dir: PathBuf,
    title: String,
}

impl BookLibrary {
    pub fn new(dir: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            title: title.into(),
        }
    }

    /// Library configured from BOOKS_DIR and BOOK_TITLE.
    pub fn from_env() -> Self {
        Self::new(config::books::DIR.as_str(), config::books::TITLE.as_str())
    }

    pub fn path_for(&self, lang: BookLanguage) -> PathBuf {
        lang.book_path(&self.dir, &self.title)
    }
}

pub struct ConversationEngine {
    sessions: SessionStore,
    store: Arc<dyn Store>,
    checkout: Arc<dyn CheckoutProvider>,
    messenger: Arc<dyn Messenger>,
    library: BookLibrary,
}

impl ConversationEngine {
    pub fn new(
        sessions: SessionStore,
        store: Arc<dyn Store>,
        checkout: Arc<dyn CheckoutProvider>,
        messenger: Arc<dyn Messenger>,
        library: BookLibrary,
    ) -> Self {
        Self {
            sessions,
            store,
            checkout,
            messenger,
            library,
        }
    }

    /// Handles one event for `chat` under that chat's session lock.
    ///
    /// Store and checkout failures are reported to the user and leave the
    /// state untouched so the triggering action can be retried. A failed
    /// send is returned as an error, also without a transition.
    pub async fn handle(&self, chat: ChatId, event: Inbound) -> AppResult<Outcome> {
        let mut session = self.sessions.lock(chat).await;
        let current = session.state.clone();

        let outcome = match (&current, event) {
            (_, Inbound::Start) => {
                self.messenger.send_text(chat, texts::ENTER_EMAIL, None, false).await?;
                Outcome::Transitioned(ConversationState::AwaitingEmail)
            }
            (ConversationState::AwaitingEmail, Inbound::Text(text)) => self.on_email(chat, &text).await?,
            (ConversationState::AwaitingCountry { email }, Inbound::Callback(data)) => match Country::from_callback(&data) {
                Some(country) => self.on_country(chat, email, country).await?,
                None => ignore(chat, &current, &data),
            },
            (ConversationState::AwaitingLanguage, Inbound::Callback(data) | Inbound::Text(data)) => {
                match BookLanguage::from_code(&data) {
                    Some(lang) => self.deliver(chat, lang).await?,
                    None => ignore(chat, &current, &data),
                }
            }
            (_, Inbound::Text(data) | Inbound::Callback(data)) => ignore(chat, &current, &data),
        };

        if let Outcome::Transitioned(next) = &outcome {
            log::debug!("Chat {}: {} -> {}", chat, current.name(), next.name());
            session.state = next.clone();
        }

        let idle = session.state.is_idle();
        drop(session);
        if idle {
            self.sessions.evict_idle(chat);
        }

        Ok(outcome)
    }

    async fn on_email(&self, chat: ChatId, text: &str) -> AppResult<Outcome> {
        if !is_valid_email(text) {
            log::info!("Chat {}: rejected email input", chat);
            self.messenger.send_text(chat, texts::INVALID_EMAIL, None, false).await?;
            return Ok(Outcome::Held);
        }

        let email = text.trim().to_string();
        self.messenger
            .send_text(chat, texts::SELECT_REGION, Some(Keyboard::Regions), false)
            .await?;
        Ok(Outcome::Transitioned(ConversationState::AwaitingCountry { email }))
    }

    async fn on_country(&self, chat: ChatId, email: &str, country: Country) -> AppResult<Outcome> {
        if let Err(e) = self.store.upsert_user(email, country, chat.0).await {
            log::error!("Chat {}: failed to save user {}: {}", chat, email, e);
            self.messenger.send_text(chat, texts::SAVE_FAILED, None, false).await?;
            return Ok(Outcome::Held);
        }

        let url = match self.checkout.checkout_url(country, email, chat.0).await {
            Ok(url) => url,
            Err(e) => {
                log::error!("Chat {}: failed to create checkout session: {}", chat, e);
                self.messenger.send_text(chat, texts::PAYMENT_FAILED, None, false).await?;
                return Ok(Outcome::Held);
            }
        };

        self.messenger
            .send_text(chat, &texts::pay_here(&url), Some(Keyboard::CheckoutLink(url.clone())), false)
            .await?;

        Ok(Outcome::Transitioned(ConversationState::AwaitingPayment {
            email: email.to_string(),
            country,
        }))
    }

    async fn deliver(&self, chat: ChatId, lang: BookLanguage) -> AppResult<Outcome> {
        let path = self.library.path_for(lang);
        if !path.is_file() {
            log::error!("Chat {}: book file missing: {}", chat, path.display());
            self.messenger.send_text(chat, texts::DELIVERY_FAILED, None, false).await?;
            return Ok(Outcome::Held);
        }

        self.messenger.send_text(chat, texts::PLEASE_WAIT, None, true).await?;

        if let Err(e) = self
            .messenger
            .send_document(chat, &path, &texts::book_caption(lang.code()))
            .await
        {
            log::error!("Chat {}: failed to send {}: {}", chat, path.display(), e);
            self.messenger.send_text(chat, texts::DELIVERY_FAILED, None, false).await?;
            return Ok(Outcome::Held);
        }

        log::info!("Chat {}: delivered {} edition", chat, lang);
        Ok(Outcome::Transitioned(ConversationState::Idle))
    }
}

fn ignore(chat: ChatId, state: &ConversationState, input: &str) -> Outcome {
    log::info!("Chat {}: ignored {:?} in state {}", chat, input, state.name());
    Outcome::Ignored
}
