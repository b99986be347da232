//! `PostgreSQL` stores.
//!
//! Orders are stored as JSONB with the queried columns lifted out. Seat
//! reserve/release and promo redemption are single SQL statements so
//! concurrent requests, even across instances, never lose an update.

use super::{OrderRepository, PromoCodeStore, SeatLedgerStore, StoreError, StoreFuture};
use crate::config::DatabaseConfig;
use crate::types::{
    CustomerId, DiscountKind, MovieId, Money, Order, OrderId, PromoCode, SeatNumber, SessionKey,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::time::Duration;

fn unavailable(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::Unavailable(format!("{context}: {e}"))
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the database cannot be reached.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .connect(&config.url)
        .await
        .map_err(unavailable("Failed to connect to database"))
}

/// Create the booking tables if they do not exist.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Migration failed: {e}")))
}

fn seats_to_column(seats: &BTreeSet<SeatNumber>) -> Vec<i16> {
    seats.iter().map(|seat| i16::from(seat.value())).collect()
}

fn seats_from_column(raw: Vec<i16>) -> Result<BTreeSet<SeatNumber>, StoreError> {
    raw.into_iter()
        .map(|n| {
            u8::try_from(n)
                .ok()
                .and_then(SeatNumber::new)
                .ok_or_else(|| StoreError::Serialization(format!("Invalid seat number in ledger: {n}")))
        })
        .collect()
}

// ============================================================================
// Orders
// ============================================================================

/// Orders table
#[derive(Clone, Debug)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Wraps a pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for PostgresOrderRepository {
    fn save(&self, order: Order) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO orders (order_id, customer_id, status, created_at, updated_at, data)
                 VALUES ($1, $2, $3, $4, NOW(), $5)
                 ON CONFLICT (order_id) DO UPDATE
                 SET status = EXCLUDED.status, updated_at = NOW(), data = EXCLUDED.data",
            )
            .bind(order.id.as_uuid())
            .bind(order.customer_id.value())
            .bind(order.status.as_str())
            .bind(order.created_at)
            .bind(Json(&order))
            .execute(&self.pool)
            .await
            .map_err(unavailable("Failed to save order"))?;
            Ok(())
        })
    }

    fn find(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move {
            let row: Option<(Json<Order>,)> =
                sqlx::query_as("SELECT data FROM orders WHERE order_id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(unavailable("Failed to load order"))?;
            Ok(row.map(|(Json(order),)| order))
        })
    }

    fn find_by_customer(&self, customer_id: CustomerId) -> StoreFuture<'_, Vec<Order>> {
        Box::pin(async move {
            let rows: Vec<(Json<Order>,)> =
                sqlx::query_as("SELECT data FROM orders WHERE customer_id = $1")
                    .bind(customer_id.value())
                    .fetch_all(&self.pool)
                    .await
                    .map_err(unavailable("Failed to load customer orders"))?;
            Ok(rows.into_iter().map(|(Json(order),)| order).collect())
        })
    }
}

// ============================================================================
// Seat ledger
// ============================================================================

/// `seat_ledger` table
#[derive(Clone, Debug)]
pub struct PostgresSeatLedger {
    pool: PgPool,
}

impl PostgresSeatLedger {
    /// Wraps a pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SeatLedgerStore for PostgresSeatLedger {
    fn occupied(&self, movie_id: MovieId, session: SessionKey) -> StoreFuture<'_, BTreeSet<SeatNumber>> {
        Box::pin(async move {
            let row: Option<(Vec<i16>,)> = sqlx::query_as(
                "SELECT occupied_seats FROM seat_ledger WHERE movie_id = $1 AND session_key = $2",
            )
            .bind(movie_id.value())
            .bind(session.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable("Failed to read seat ledger"))?;

            row.map_or_else(|| Ok(BTreeSet::new()), |(raw,)| seats_from_column(raw))
        })
    }

    fn reserve(
        &self,
        movie_id: MovieId,
        session: SessionKey,
        seats: BTreeSet<SeatNumber>,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO seat_ledger (movie_id, session_key, occupied_seats, updated_at)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (movie_id, session_key) DO UPDATE
                 SET occupied_seats = ARRAY(
                         SELECT DISTINCT s
                         FROM unnest(seat_ledger.occupied_seats || EXCLUDED.occupied_seats) AS s
                         ORDER BY s
                     ),
                     updated_at = EXCLUDED.updated_at",
            )
            .bind(movie_id.value())
            .bind(session.as_str())
            .bind(seats_to_column(&seats))
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(unavailable("Failed to reserve seats"))?;
            Ok(())
        })
    }

    fn release(
        &self,
        movie_id: MovieId,
        session: SessionKey,
        seats: BTreeSet<SeatNumber>,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "UPDATE seat_ledger
                 SET occupied_seats = ARRAY(
                         SELECT s FROM unnest(occupied_seats) AS s
                         WHERE s <> ALL($3)
                         ORDER BY s
                     ),
                     updated_at = $4
                 WHERE movie_id = $1 AND session_key = $2",
            )
            .bind(movie_id.value())
            .bind(session.as_str())
            .bind(seats_to_column(&seats))
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(unavailable("Failed to release seats"))?;
            Ok(())
        })
    }
}

// ============================================================================
// Promo codes
// ============================================================================

type PromoRow = (
    String,
    String,
    f64,
    Option<DateTime<Utc>>,
    i32,
    i32,
    bool,
    Option<String>,
    DateTime<Utc>,
);

/// `promo_codes` table. Fixed amounts are stored in cents.
#[derive(Clone, Debug)]
pub struct PostgresPromoCodeStore {
    pool: PgPool,
}

impl PostgresPromoCodeStore {
    /// Wraps a pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn promo_from_row(row: PromoRow) -> Result<PromoCode, StoreError> {
    let (code, kind, value, expires_at, usage_limit, used_count, active, description, created_at) = row;
    let discount = match kind.as_str() {
        "PERCENTAGE" => DiscountKind::Percentage { percent: value },
        "FIXED_AMOUNT" => DiscountKind::FixedAmount {
            amount: Money::from_cents(value.max(0.0).round() as u64),
        },
        other => {
            return Err(StoreError::Serialization(format!(
                "Unknown discount type {other} for promo code {code}"
            )));
        },
    };
    let count = |n: i32| {
        u32::try_from(n).map_err(|_| StoreError::Serialization(format!("Negative counter on promo code {code}")))
    };

    Ok(PromoCode {
        discount,
        expires_at,
        usage_limit: count(usage_limit)?,
        used_count: count(used_count)?,
        active,
        description,
        created_at,
        code,
    })
}

#[allow(clippy::cast_precision_loss)]
fn discount_value(discount: &DiscountKind) -> f64 {
    match discount {
        DiscountKind::Percentage { percent } => *percent,
        DiscountKind::FixedAmount { amount } => amount.cents() as f64,
    }
}

impl PromoCodeStore for PostgresPromoCodeStore {
    fn find(&self, code: String) -> StoreFuture<'_, Option<PromoCode>> {
        Box::pin(async move {
            let row: Option<PromoRow> = sqlx::query_as(
                "SELECT code, discount_type, discount_value, expires_at, usage_limit, used_count,
                        active, description, created_at
                 FROM promo_codes WHERE code = $1",
            )
            .bind(&code)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable("Failed to load promo code"))?;

            row.map(promo_from_row).transpose()
        })
    }

    fn insert(&self, promo: PromoCode) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let limit = i32::try_from(promo.usage_limit)
                .map_err(|_| StoreError::Serialization("Usage limit out of range".to_string()))?;
            let result = sqlx::query(
                "INSERT INTO promo_codes
                     (code, discount_type, discount_value, expires_at, usage_limit, used_count,
                      active, description, created_at)
                 VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8)
                 ON CONFLICT (code) DO NOTHING",
            )
            .bind(&promo.code)
            .bind(promo.discount.type_name())
            .bind(discount_value(&promo.discount))
            .bind(promo.expires_at)
            .bind(limit)
            .bind(promo.active)
            .bind(&promo.description)
            .bind(promo.created_at)
            .execute(&self.pool)
            .await
            .map_err(unavailable("Failed to insert promo code"))?;

            Ok(result.rows_affected() == 1)
        })
    }

    fn record_usage(&self, code: String) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE promo_codes SET used_count = used_count + 1
                 WHERE code = $1 AND (usage_limit = 0 OR used_count < usage_limit)",
            )
            .bind(&code)
            .execute(&self.pool)
            .await
            .map_err(unavailable("Failed to record promo usage"))?;

            Ok(result.rows_affected() == 1)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_column_round_trip_rejects_out_of_range() {
        assert!(seats_from_column(vec![0, 27, 63]).is_ok());
        assert!(matches!(seats_from_column(vec![64]), Err(StoreError::Serialization(_))));
        assert!(matches!(seats_from_column(vec![-1]), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_promo_row_decoding() {
        let now = Utc::now();
        let promo = promo_from_row((
            "FLAT5".to_string(),
            "FIXED_AMOUNT".to_string(),
            500.0,
            None,
            10,
            3,
            true,
            None,
            now,
        ))
        .unwrap();
        assert_eq!(promo.discount, DiscountKind::FixedAmount { amount: Money::from_cents(500) });
        assert_eq!(promo.used_count, 3);

        let bad = promo_from_row(("X".to_string(), "BOGO".to_string(), 1.0, None, 0, 0, true, None, now));
        assert!(matches!(bad, Err(StoreError::Serialization(_))));
    }
}
