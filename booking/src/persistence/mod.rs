//! Persistence collaborators.
//!
//! Three stores back the booking core: orders, the seat ledger and promo
//! codes. Each is a dyn-safe trait returning boxed futures so environments
//! can hold `Arc<dyn ...>` and swap the in-memory and `PostgreSQL`
//! implementations without generics leaking into the reducer.
//!
//! Counters and occupancy sets are only ever changed through the atomic
//! operations below (`reserve`, `release`, `record_usage`), never by a
//! read-modify-write in the caller.

use crate::types::{CustomerId, MovieId, Order, OrderId, PromoCode, SeatNumber, SessionKey};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryOrderRepository, InMemoryPromoCodeStore, InMemorySeatLedger};
pub use postgres::{PostgresOrderRepository, PostgresPromoCodeStore, PostgresSeatLedger};

/// Errors raised by a store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the statement
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Boxed store future
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Durable order storage
pub trait OrderRepository: Send + Sync {
    /// Insert or replace an order
    fn save(&self, order: Order) -> StoreFuture<'_, ()>;

    /// Look up by id
    fn find(&self, id: OrderId) -> StoreFuture<'_, Option<Order>>;

    /// All orders of a customer, in no particular order
    fn find_by_customer(&self, customer_id: CustomerId) -> StoreFuture<'_, Vec<Order>>;
}

/// Seat occupancy per (movie, session)
pub trait SeatLedgerStore: Send + Sync {
    /// Occupied seats; empty when the session has no entry yet
    fn occupied(&self, movie_id: MovieId, session: SessionKey) -> StoreFuture<'_, BTreeSet<SeatNumber>>;

    /// Add `seats` to the occupied set, creating the entry if absent
    fn reserve(
        &self,
        movie_id: MovieId,
        session: SessionKey,
        seats: BTreeSet<SeatNumber>,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;

    /// Remove `seats` from the occupied set; absent entry or seats are a no-op
    fn release(
        &self,
        movie_id: MovieId,
        session: SessionKey,
        seats: BTreeSet<SeatNumber>,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;
}

/// Promo code storage
pub trait PromoCodeStore: Send + Sync {
    /// Look up by normalised code
    fn find(&self, code: String) -> StoreFuture<'_, Option<PromoCode>>;

    /// Insert a new code. Returns `false` if the code already exists.
    fn insert(&self, promo: PromoCode) -> StoreFuture<'_, bool>;

    /// Atomically count one redemption.
    ///
    /// Returns `false` without changing anything when the code is unknown or
    /// its usage limit is already reached.
    fn record_usage(&self, code: String) -> StoreFuture<'_, bool>;
}
