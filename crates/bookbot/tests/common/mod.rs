//! Shared fakes and fixtures for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookbot::checkout::CheckoutProvider;
use bookbot::engine::{BookLibrary, ConversationEngine};
use bookbot::relay::PaymentRelay;
use bookbot::session::SessionStore;
use bookbot::telegram::{Keyboard, Messenger};
use bookcore::storage::{create_pool, PaymentRecord, PaymentUpdate, UserRecord};
use bookcore::{AppError, AppResult, BookLanguage, Country, Money, SqliteStore, Store};
use teloxide::types::ChatId;
use tempfile::TempDir;

pub const BOOK_TITLE: &str = "Trade-Plus.Online";
pub const CHECKOUT_DOMAIN: &str = "https://checkout.stripe.com";

/// One message the bot would have sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat: ChatId,
        text: String,
        keyboard: Option<Keyboard>,
        protected: bool,
    },
    Document {
        chat: ChatId,
        path: PathBuf,
        caption: String,
    },
}

impl Sent {
    pub fn chat(&self) -> ChatId {
        match self {
            Sent::Text { chat, .. } | Sent::Document { chat, .. } => *chat,
        }
    }
}

/// Messenger that records instead of sending.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Returns and clears everything recorded so far.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Option<Keyboard>, protect: bool) -> AppResult<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            chat,
            text: text.to_string(),
            keyboard,
            protected: protect,
        });
        Ok(())
    }

    async fn send_document(&self, chat: ChatId, path: &Path, caption: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(Sent::Document {
            chat,
            path: path.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// Checkout provider returning a deterministic URL, or failing on demand.
#[derive(Default)]
pub struct FakeCheckout {
    pub fail: AtomicBool,
    calls: Mutex<Vec<(Country, String, i64)>>,
}

impl FakeCheckout {
    pub fn calls(&self) -> Vec<(Country, String, i64)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckoutProvider for FakeCheckout {
    async fn checkout_url(&self, country: Country, email: &str, chat_id: i64) -> AppResult<String> {
        self.calls.lock().unwrap().push((country, email.to_string(), chat_id));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Stripe {
                status: 500,
                message: "checkout unavailable".into(),
            });
        }
        Ok(format!("{}/c/pay/cs_test_{}", CHECKOUT_DOMAIN, chat_id))
    }
}

/// Store wrapper that can make user writes fail and counts payment writes.
pub struct FlakyStore {
    inner: Arc<SqliteStore>,
    pub fail_user_writes: AtomicBool,
    payment_writes: Mutex<Vec<PaymentUpdate>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            fail_user_writes: AtomicBool::new(false),
            payment_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_user_writes.store(fail, Ordering::SeqCst);
    }

    pub fn payment_writes(&self) -> Vec<PaymentUpdate> {
        self.payment_writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn upsert_user(&self, email: &str, country: Country, chat_id: i64) -> AppResult<UserRecord> {
        if self.fail_user_writes.load(Ordering::SeqCst) {
            return Err(AppError::Validation("simulated database failure".into()));
        }
        self.inner.upsert_user(email, country, chat_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        self.inner.find_user_by_email(email).await
    }

    async fn record_pending_payment(&self, session_id: &str, user_id: i64, money: Money) -> AppResult<bool> {
        self.inner.record_pending_payment(session_id, user_id, money).await
    }

    async fn upsert_payment(&self, update: PaymentUpdate) -> AppResult<()> {
        self.payment_writes.lock().unwrap().push(update.clone());
        self.inner.upsert_payment(update).await
    }

    async fn find_payment(&self, session_id: &str) -> AppResult<Option<PaymentRecord>> {
        self.inner.find_payment(session_id).await
    }
}

/// Everything a flow test needs, wired the way `main` wires it.
pub struct Harness {
    pub dir: TempDir,
    pub sessions: SessionStore,
    pub sqlite: Arc<SqliteStore>,
    pub store: Arc<FlakyStore>,
    pub checkout: Arc<FakeCheckout>,
    pub messenger: Arc<RecordingMessenger>,
    pub engine: ConversationEngine,
    pub relay: PaymentRelay,
}

impl Harness {
    /// Library with every language edition present.
    pub fn new() -> Self {
        Self::with_books(&BookLanguage::ALL)
    }

    /// Library with only `languages` present on disk.
    pub fn with_books(languages: &[BookLanguage]) -> Self {
        let dir = TempDir::new().unwrap();
        let books_dir = dir.path().join("books");
        std::fs::create_dir_all(&books_dir).unwrap();
        let library = BookLibrary::new(books_dir.clone(), BOOK_TITLE);
        for lang in languages {
            std::fs::write(library.path_for(*lang), b"%PDF-1.4 test book").unwrap();
        }

        let pool = create_pool(dir.path().join("bot.sqlite").to_str().unwrap()).unwrap();
        let sqlite = Arc::new(SqliteStore::new(pool));
        let store = Arc::new(FlakyStore::new(Arc::clone(&sqlite)));
        let checkout = Arc::new(FakeCheckout::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let sessions = SessionStore::new();

        let engine = ConversationEngine::new(
            sessions.clone(),
            store.clone(),
            checkout.clone(),
            messenger.clone(),
            library,
        );
        let relay = PaymentRelay::new(store.clone(), sessions.clone(), messenger.clone());

        Self {
            dir,
            sessions,
            sqlite,
            store,
            checkout,
            messenger,
            engine,
            relay,
        }
    }
}
