//! In-memory stores for development, tests and single-node demos.

use super::{OrderRepository, PromoCodeStore, SeatLedgerStore, StoreFuture};
use crate::ledger::SeatLedgerEntry;
use crate::types::{CustomerId, MovieId, Order, OrderId, PromoCode, SeatNumber, SessionKey};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Orders held in a map
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn save(&self, order: Order) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.orders.write().await.insert(order.id, order);
            Ok(())
        })
    }

    fn find(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(async move { Ok(self.orders.read().await.get(&id).cloned()) })
    }

    fn find_by_customer(&self, customer_id: CustomerId) -> StoreFuture<'_, Vec<Order>> {
        Box::pin(async move {
            Ok(self
                .orders
                .read()
                .await
                .values()
                .filter(|order| order.customer_id == customer_id)
                .cloned()
                .collect())
        })
    }
}

/// Seat ledger held in a map keyed by (movie, session)
#[derive(Debug, Default)]
pub struct InMemorySeatLedger {
    entries: RwLock<HashMap<(MovieId, SessionKey), SeatLedgerEntry>>,
}

impl InMemorySeatLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeatLedgerStore for InMemorySeatLedger {
    fn occupied(&self, movie_id: MovieId, session: SessionKey) -> StoreFuture<'_, BTreeSet<SeatNumber>> {
        Box::pin(async move {
            Ok(self
                .entries
                .read()
                .await
                .get(&(movie_id, session))
                .map(|entry| entry.occupied.clone())
                .unwrap_or_default())
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
            let mut entries = self.entries.write().await;
            entries
                .entry((movie_id, session.clone()))
                .or_insert_with(|| SeatLedgerEntry::new(movie_id, session, at))
                .reserve(&seats, at);
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
            if let Some(entry) = self.entries.write().await.get_mut(&(movie_id, session)) {
                entry.release(&seats, at);
            }
            Ok(())
        })
    }
}

/// Promo codes held in a map keyed by code
#[derive(Debug, Default)]
pub struct InMemoryPromoCodeStore {
    codes: RwLock<HashMap<String, PromoCode>>,
}

impl InMemoryPromoCodeStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PromoCodeStore for InMemoryPromoCodeStore {
    fn find(&self, code: String) -> StoreFuture<'_, Option<PromoCode>> {
        Box::pin(async move { Ok(self.codes.read().await.get(&code).cloned()) })
    }

    fn insert(&self, promo: PromoCode) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut codes = self.codes.write().await;
            if codes.contains_key(&promo.code) {
                return Ok(false);
            }
            codes.insert(promo.code.clone(), promo);
            Ok(true)
        })
    }

    fn record_usage(&self, code: String) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            Ok(self
                .codes
                .write()
                .await
                .get_mut(&code)
                .is_some_and(PromoCode::record_usage))
        })
    }
}
