//! Payment notification relay
//!
//! The webhook handler pushes completed payments onto a bounded queue; a single
//! consumer records them and moves the buyer's chat on to language selection.

use std::sync::Arc;

use bookcore::payments::CompletedCheckout;
use bookcore::storage::PaymentUpdate;
use bookcore::{AppResult, Money, PaymentStatus, Store};
use teloxide::types::ChatId;
use tokio::sync::mpsc;

use crate::engine::texts;
use crate::session::{ConversationState, SessionStore};
use crate::telegram::keyboards::Keyboard;
use crate::telegram::messenger::Messenger;

/// A payment outcome reported by Stripe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    /// Chat recorded in the checkout metadata
    pub chat_id: i64,
    pub email: String,
    pub session_id: String,
    pub status: PaymentStatus,
    pub money: Money,
}

impl From<CompletedCheckout> for PaymentNotification {
    fn from(checkout: CompletedCheckout) -> Self {
        Self {
            chat_id: checkout.chat_id,
            email: checkout.email,
            session_id: checkout.session_id,
            status: PaymentStatus::Completed,
            money: checkout.money,
        }
    }
}

pub type NotificationSender = mpsc::Sender<PaymentNotification>;
pub type NotificationReceiver = mpsc::Receiver<PaymentNotification>;

/// Bounded queue; senders wait while it is full.
pub fn notification_channel(capacity: usize) -> (NotificationSender, NotificationReceiver) {
    mpsc::channel(capacity.max(1))
}

/// What the relay did with one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No user with that email; nothing written, nothing sent
    Dropped,
    /// Language keyboard sent to the buyer's chat
    Delivered { chat: ChatId },
}

pub struct PaymentRelay {
    store: Arc<dyn Store>,
    sessions: SessionStore,
    messenger: Arc<dyn Messenger>,
}

impl PaymentRelay {
    pub fn new(store: Arc<dyn Store>, sessions: SessionStore, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            store,
            sessions,
            messenger,
        }
    }

    /// Handles one notification.
    ///
    /// A failed payment upsert is logged and does not stop the chat message.
    pub async fn process(&self, notification: PaymentNotification) -> AppResult<RelayOutcome> {
        let user = match self.store.find_user_by_email(&notification.email).await? {
            Some(user) => user,
            None => {
                log::warn!(
                    "Payment {} for unknown email {} (chat {}) dropped",
                    notification.session_id,
                    notification.email,
                    notification.chat_id
                );
                return Ok(RelayOutcome::Dropped);
            }
        };

        let update = PaymentUpdate {
            session_id: notification.session_id.clone(),
            user_id: user.id,
            status: notification.status,
            money: notification.money.clone(),
        };
        if let Err(e) = self.store.upsert_payment(update).await {
            log::error!("Failed to record payment {}: {}", notification.session_id, e);
        }

        if user.chat_id != notification.chat_id {
            log::warn!(
                "Payment {}: metadata chat {} differs from stored chat {}, using stored",
                notification.session_id,
                notification.chat_id,
                user.chat_id
            );
        }
        let chat = ChatId(user.chat_id);

        let mut session = self.sessions.lock(chat).await;
        if !matches!(session.state, ConversationState::AwaitingPayment { .. }) {
            log::info!(
                "Chat {}: payment {} confirmed while in state {}",
                chat,
                notification.session_id,
                session.state.name()
            );
        }
        session.state = ConversationState::AwaitingLanguage;

        self.messenger
            .send_text(chat, texts::PAYMENT_SUCCEEDED, Some(Keyboard::Languages), false)
            .await?;
        drop(session);

        log::info!(
            "Chat {}: payment {} confirmed ({})",
            chat,
            notification.session_id,
            notification.money
        );
        Ok(RelayOutcome::Delivered { chat })
    }

    /// Consumes notifications until every sender is dropped.
    pub async fn run(self, mut receiver: NotificationReceiver) {
        log::info!("Payment relay started");
        while let Some(notification) = receiver.recv().await {
            let session_id = notification.session_id.clone();
            if let Err(e) = self.process(notification).await {
                log::error!("Failed to relay payment {}: {}", session_id, e);
            }
        }
        log::info!("Payment relay stopped: all senders closed");
    }
}
