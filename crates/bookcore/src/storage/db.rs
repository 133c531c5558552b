use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::config;
use crate::core::error::AppResult;
use crate::domain::{Country, Money, PaymentStatus};
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// A buyer, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub country: Country,
    /// Telegram chat the user bought from
    pub chat_id: i64,
}

/// One row of the payments table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub session_id: String,
    pub user_id: i64,
    pub status: PaymentStatus,
    pub money: Money,
    /// Unix seconds
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Values written by a payment upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub session_id: String,
    pub user_id: i64,
    pub status: PaymentStatus,
    pub money: Money,
}

/// Create a new database connection pool
///
/// Every pooled connection gets a busy timeout, WAL journaling and foreign keys.
/// Schema migrations run once on the first connection.
///
/// # Example
///
/// ```no_run
/// use bookcore::storage::create_pool;
///
/// let pool = create_pool("database.sqlite")?;
/// # Ok::<(), bookcore::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(config::database::busy_timeout())?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    });
    let pool = Pool::builder().max_size(config::database::POOL_SIZE).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection goes back to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    Ok(pool.get()?)
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let country: String = row.get(2)?;
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        country: Country::from_code_or_default(Some(&country)),
        chat_id: row.get(3)?,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<PaymentRecord> {
    let status: String = row.get(2)?;
    let currency: Option<String> = row.get(4)?;
    Ok(PaymentRecord {
        session_id: row.get(0)?,
        user_id: row.get(1)?,
        status: PaymentStatus::parse(&status).unwrap_or(PaymentStatus::Pending),
        money: Money::new(row.get(3)?, currency.unwrap_or_default()),
        created_at: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

/// Inserts the user or, when the email is already known, refreshes its
/// country and chat. Returns the stored row.
pub fn upsert_user(conn: &Connection, email: &str, country: Country, chat_id: i64) -> AppResult<UserRecord> {
    let user = conn.query_row(
        "INSERT INTO users (email, country, chat_id) VALUES (?1, ?2, ?3)
         ON CONFLICT(email) DO UPDATE SET country = excluded.country, chat_id = excluded.chat_id
         RETURNING id, email, country, chat_id",
        params![email, country.code(), chat_id],
        user_from_row,
    )?;
    Ok(user)
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> AppResult<Option<UserRecord>> {
    let user = conn
        .query_row(
            "SELECT id, email, country, chat_id FROM users WHERE email = ?1",
            params![email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Records a freshly created checkout session. An existing row is left
/// untouched so a late insert can never downgrade a completed payment.
///
/// Returns true when a row was inserted.
pub fn record_pending_payment(conn: &Connection, session_id: &str, user_id: i64, money: &Money) -> AppResult<bool> {
    let currency = (!money.currency.is_empty()).then_some(money.currency.as_str());
    let inserted = conn.execute(
        "INSERT INTO payments (session_id, user_id, status, amount, currency, created_at)
         VALUES (?1, ?2, 'pending', ?3, ?4, ?5)
         ON CONFLICT(session_id) DO NOTHING",
        params![session_id, user_id, money.amount_minor, currency, now_unix()],
    )?;
    Ok(inserted == 1)
}

/// Single-statement upsert keyed by session id: the later status wins and
/// `completed_at` is stamped once when the status becomes completed.
pub fn upsert_payment(conn: &Connection, update: &PaymentUpdate) -> AppResult<()> {
    let currency = (!update.money.currency.is_empty()).then_some(update.money.currency.as_str());
    conn.execute(
        "INSERT INTO payments (session_id, user_id, status, amount, currency, created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, CASE WHEN ?3 = 'completed' THEN ?6 ELSE NULL END)
         ON CONFLICT(session_id) DO UPDATE SET
             user_id = excluded.user_id,
             status = excluded.status,
             amount = excluded.amount,
             currency = COALESCE(excluded.currency, payments.currency),
             completed_at = CASE
                 WHEN excluded.status = 'completed' THEN COALESCE(payments.completed_at, excluded.created_at)
                 ELSE NULL
             END",
        params![
            update.session_id,
            update.user_id,
            update.status.as_str(),
            update.money.amount_minor,
            currency,
            now_unix()
        ],
    )?;
    Ok(())
}

pub fn find_payment(conn: &Connection, session_id: &str) -> AppResult<Option<PaymentRecord>> {
    let payment = conn
        .query_row(
            "SELECT session_id, user_id, status, amount, currency, created_at, completed_at
             FROM payments WHERE session_id = ?1",
            params![session_id],
            payment_from_row,
        )
        .optional()?;
    Ok(payment)
}
