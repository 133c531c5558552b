//! Per-chat conversation sessions
//!
//! Sessions live only in memory. Each chat has its own async mutex so the
//! conversation engine and the payment relay never interleave writes to the
//! same chat, while different chats proceed independently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bookcore::Country;
use dashmap::DashMap;
use teloxide::types::ChatId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Where a chat is in the purchase flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingEmail,
    AwaitingCountry {
        email: String,
    },
    AwaitingPayment {
        email: String,
        country: Country,
    },
    AwaitingLanguage,
}

impl ConversationState {
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingEmail => "awaiting_email",
            ConversationState::AwaitingCountry { .. } => "awaiting_country",
            ConversationState::AwaitingPayment { .. } => "awaiting_payment",
            ConversationState::AwaitingLanguage => "awaiting_language",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

#[derive(Debug)]
pub struct Session {
    pub state: ConversationState,
    /// Last time the session was locked
    pub last_active: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: ConversationState::default(),
            last_active: Instant::now(),
        }
    }
}

/// Exclusive access to one chat's session.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Chat-keyed session map shared by the engine and the relay.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<DashMap<ChatId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the chat's session, creating an idle one on first contact.
    ///
    /// The guard may be held across awaits; other chats are not blocked.
    pub async fn lock(&self, chat: ChatId) -> SessionGuard {
        // Clone the Arc so the shard lock is released before waiting.
        let session = Arc::clone(self.inner.entry(chat).or_default().value());
        let mut guard = session.lock_owned().await;
        guard.last_active = Instant::now();
        guard
    }

    /// Drops the chat's entry if it is idle and nobody holds or awaits it.
    ///
    /// Returns true when the entry was removed.
    pub fn evict_idle(&self, chat: ChatId) -> bool {
        self.inner
            .remove_if(&chat, |_, session| {
                Arc::strong_count(session) == 1
                    && session
                        .try_lock()
                        .map(|guard| guard.state.is_idle())
                        .unwrap_or(false)
            })
            .is_some()
    }

    /// Drops conversations abandoned before payment.
    ///
    /// An entry goes when nobody holds or awaits it, its state is not
    /// AwaitingLanguage and it has not been locked for `max_idle`. Paid chats
    /// are kept so the buyer can still pick a language. Returns the number of
    /// entries removed.
    pub fn sweep_abandoned(&self, max_idle: Duration) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, session| {
            if Arc::strong_count(session) > 1 {
                return true;
            }
            match session.try_lock() {
                Ok(guard) => {
                    guard.state == ConversationState::AwaitingLanguage || guard.last_active.elapsed() < max_idle
                }
                Err(_) => true,
            }
        });
        before.saturating_sub(self.inner.len())
    }

    /// Snapshot of the chat's state; absent sessions read as idle.
    pub async fn state(&self, chat: ChatId) -> ConversationState {
        let session = match self.inner.get(&chat) {
            Some(entry) => Arc::clone(entry.value()),
            None => return ConversationState::Idle,
        };
        let guard = session.lock().await;
        guard.state.clone()
    }

    pub fn contains(&self, chat: ChatId) -> bool {
        self.inner.contains_key(&chat)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
