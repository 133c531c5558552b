use async_trait::async_trait;

use crate::core::error::{AppError, AppResult};
use crate::domain::{Country, Money};
use crate::storage::db::{self, DbPool, PaymentRecord, PaymentUpdate, UserRecord};

/// Persistence port used by the conversation engine, the checkout service
/// and the payment relay.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates the user or refreshes country and chat for a known email.
    async fn upsert_user(&self, email: &str, country: Country, chat_id: i64) -> AppResult<UserRecord>;
    /// Exact match on email.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;
    /// Insert-if-absent; true when a row was written.
    async fn record_pending_payment(&self, session_id: &str, user_id: i64, money: Money) -> AppResult<bool>;
    /// Atomic upsert keyed by session id.
    async fn upsert_payment(&self, update: PaymentUpdate) -> AppResult<()>;
    async fn find_payment(&self, session_id: &str) -> AppResult<Option<PaymentRecord>>;
}

/// `Store` over the r2d2 SQLite pool. Queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> AppResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db::get_connection(&pool)?;
            f(&*conn)
        })
        .await
        .map_err(|e| AppError::Anyhow(anyhow::anyhow!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_user(&self, email: &str, country: Country, chat_id: i64) -> AppResult<UserRecord> {
        let email = email.to_string();
        self.with_conn(move |conn| db::upsert_user(conn, &email, country, chat_id))
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let email = email.to_string();
        self.with_conn(move |conn| db::find_user_by_email(conn, &email)).await
    }

    async fn record_pending_payment(&self, session_id: &str, user_id: i64, money: Money) -> AppResult<bool> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| db::record_pending_payment(conn, &session_id, user_id, &money))
            .await
    }

    async fn upsert_payment(&self, update: PaymentUpdate) -> AppResult<()> {
        self.with_conn(move |conn| db::upsert_payment(conn, &update)).await
    }

    async fn find_payment(&self, session_id: &str) -> AppResult<Option<PaymentRecord>> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| db::find_payment(conn, &session_id)).await
    }
}
