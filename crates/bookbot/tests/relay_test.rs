//! Payment notification relay: lookups, idempotent bookkeeping, queue draining

mod common;

use std::time::Duration;

use bookbot::relay::{notification_channel, PaymentNotification, RelayOutcome};
use bookbot::telegram::Keyboard;
use bookbot::ConversationState;
use bookcore::{Country, Money, PaymentStatus, Store};
use common::{Harness, Sent};
use pretty_assertions::assert_eq;
use teloxide::types::ChatId;

fn notification(email: &str, session_id: &str, status: PaymentStatus) -> PaymentNotification {
    PaymentNotification {
        chat_id: 42,
        email: email.into(),
        session_id: session_id.into(),
        status,
        money: Money::new(1999, "usd"),
    }
}

#[tokio::test]
async fn test_unknown_email_writes_nothing_and_sends_nothing() {
    let h = Harness::new();

    let outcome = h
        .relay
        .process(notification("ghost@example.com", "cs_ghost", PaymentStatus::Completed))
        .await
        .unwrap();

    assert_eq!(outcome, RelayOutcome::Dropped);
    assert!(h.store.payment_writes().is_empty());
    assert!(h.sqlite.find_payment("cs_ghost").await.unwrap().is_none());
    assert!(h.messenger.sent().is_empty());
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn test_same_session_converges_to_later_status() {
    let h = Harness::new();
    h.sqlite.upsert_user("alice@example.com", Country::US, 42).await.unwrap();

    h.relay
        .process(notification("alice@example.com", "cs_1", PaymentStatus::Pending))
        .await
        .unwrap();
    h.relay
        .process(notification("alice@example.com", "cs_1", PaymentStatus::Completed))
        .await
        .unwrap();

    let payment = h.sqlite.find_payment("cs_1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.completed_at.is_some());
    assert_eq!(h.store.payment_writes().len(), 2);

    let rows: i64 = h
        .sqlite
        .pool()
        .get()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM payments WHERE session_id = 'cs_1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_confirmation_moves_stored_chat_to_language_selection() {
    let h = Harness::new();
    let chat = ChatId(42);
    h.sqlite.upsert_user("alice@example.com", Country::ES, chat.0).await.unwrap();
    {
        let mut session = h.sessions.lock(chat).await;
        session.state = ConversationState::AwaitingPayment {
            email: "alice@example.com".into(),
            country: Country::ES,
        };
    }

    let outcome = h
        .relay
        .process(notification("alice@example.com", "cs_2", PaymentStatus::Completed))
        .await
        .unwrap();

    assert_eq!(outcome, RelayOutcome::Delivered { chat });
    assert_eq!(h.sessions.state(chat).await, ConversationState::AwaitingLanguage);
    assert!(matches!(
        &h.messenger.sent()[..],
        [Sent::Text { chat: c, keyboard: Some(Keyboard::Languages), .. }] if *c == chat
    ));
}

#[tokio::test]
async fn test_confirmation_after_restart_still_offers_languages() {
    let h = Harness::new();
    h.sqlite.upsert_user("alice@example.com", Country::ES, 42).await.unwrap();

    h.relay
        .process(notification("alice@example.com", "cs_3", PaymentStatus::Completed))
        .await
        .unwrap();

    assert_eq!(h.sessions.state(ChatId(42)).await, ConversationState::AwaitingLanguage);
}

#[tokio::test]
async fn test_run_drains_queue_until_senders_close() {
    let h = Harness::new();
    h.sqlite.upsert_user("alice@example.com", Country::US, 42).await.unwrap();
    h.sqlite.upsert_user("bob@example.com", Country::TR, 43).await.unwrap();

    let (tx, rx) = notification_channel(2);
    let common::Harness {
        relay, messenger, sqlite, dir: _dir, ..
    } = h;
    let consumer = tokio::spawn(relay.run(rx));

    tx.send(notification("alice@example.com", "cs_a", PaymentStatus::Completed))
        .await
        .unwrap();
    tx.send(notification("bob@example.com", "cs_b", PaymentStatus::Completed))
        .await
        .unwrap();
    tx.send(notification("ghost@example.com", "cs_c", PaymentStatus::Completed))
        .await
        .unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), consumer)
        .await
        .expect("relay did not stop after the channel closed")
        .unwrap();

    let chats: Vec<ChatId> = messenger.sent().iter().map(Sent::chat).collect();
    assert_eq!(chats, vec![ChatId(42), ChatId(43)]);
    assert!(sqlite.find_payment("cs_a").await.unwrap().is_some());
    assert!(sqlite.find_payment("cs_b").await.unwrap().is_some());
    assert!(sqlite.find_payment("cs_c").await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_queue_blocks_sender() {
    let (tx, _rx) = notification_channel(1);
    tx.send(notification("a@example.com", "cs_1", PaymentStatus::Completed))
        .await
        .unwrap();

    let second = tokio::time::timeout(
        Duration::from_millis(50),
        tx.send(notification("a@example.com", "cs_2", PaymentStatus::Completed)),
    )
    .await;
    assert!(second.is_err(), "send should wait while the queue is full");
}
