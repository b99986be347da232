//! Booking service - command handlers and queries over the order aggregate.
//!
//! Commands load the order they touch, run the reducer in a request-scoped
//! [`Store`] until every effect has settled, then surface the aggregate's
//! `last_error` as the result. Queries read the stores directly.
//!
//! Create, Pay and Cancel hold a per-(movie, session) lock across their reads
//! and writes, so two placements for the same session cannot both pass the
//! conflict check and an order cannot be paid and cancelled at the same time
//! inside one process. Orders without a session are locked by order id.

use crate::aggregates::{NewOrder, OrderAction, OrderEnvironment, OrderReducer};
use crate::error::BookingError;
use crate::metrics;
use crate::order_date::parse_order_date;
use crate::promo::{self, normalize_code, NewPromoCode, PromoRejection, PromoValidation};
use crate::types::{
    CustomerId, Money, MovieId, Order, OrderId, OrderState, OrderStatus, PaymentMethod, PromoCode,
    SeatNumber, SessionKey,
};
use chrono::{DateTime, Utc};
use cinema_core::environment::Clock;
use cinema_runtime::Store;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum LockKey {
    Session(MovieId, SessionKey),
    Order(OrderId),
}

impl LockKey {
    fn for_order(order: &Order) -> Self {
        match &order.session {
            Some(session) => Self::Session(order.movie_id, session.clone()),
            None => Self::Order(order.id),
        }
    }
}

type Locks = HashMap<LockKey, Arc<AsyncMutex<()>>>;

/// Payment request for a pending order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSubmission {
    /// Method; card when omitted
    #[serde(default)]
    pub method: PaymentMethod,
    /// Card number for card payments
    #[serde(default)]
    pub card_number: Option<String>,
    /// Send the booking confirmation here once paid
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of a successful cancellation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    /// Cancelled order
    pub order_id: OrderId,
    /// Amount to refund
    pub refund: Money,
}

/// Payment summary of an order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    /// Order
    pub order_id: OrderId,
    /// Current status
    pub status: OrderStatus,
    /// Amount due or paid
    pub total: Money,
    /// Gateway transaction, once paid
    pub transaction_id: Option<String>,
    /// When paid
    pub paid_at: Option<DateTime<Utc>>,
    /// How it was paid
    pub method: Option<PaymentMethod>,
    /// Booking reference, once paid
    pub booking_reference: Option<String>,
}

impl From<&Order> for PaymentStatus {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            total: order.pricing.total,
            transaction_id: order.payment.as_ref().map(|p| p.transaction_id.clone()),
            paid_at: order.payment.as_ref().map(|p| p.paid_at),
            method: order.payment.as_ref().map(|p| p.method.clone()),
            booking_reference: order.ticket.as_ref().map(|t| t.booking_reference.clone()),
        }
    }
}

/// Promo code details with current validity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromoDetails {
    /// Stored code
    #[serde(flatten)]
    pub promo: PromoCode,
    /// Whether it can be applied right now
    pub is_valid: bool,
}

/// Booking application service
pub struct BookingService {
    env: OrderEnvironment,
    locks: Mutex<Locks>,
}

impl BookingService {
    /// Create a new booking service
    #[must_use]
    pub fn new(env: OrderEnvironment) -> Self {
        Self {
            env,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The environment commands run against
    #[must_use]
    pub const fn environment(&self) -> &OrderEnvironment {
        &self.env
    }

    fn lock(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }

    /// Lock the order's session (or the order itself), then re-read the order
    /// so the command sees writes made by whoever held the lock before.
    async fn load_locked(
        &self,
        order_id: OrderId,
    ) -> Result<(Order, OwnedMutexGuard<()>), BookingError> {
        let key = LockKey::for_order(&self.load(order_id).await?);
        let guard = self.lock(key).lock_owned().await;
        Ok((self.load(order_id).await?, guard))
    }

    /// Run one command to quiescence and return the resulting state.
    async fn dispatch(
        &self,
        state: OrderState,
        action: OrderAction,
    ) -> Result<OrderState, BookingError> {
        let store = Store::new(state, OrderReducer::new(), self.env.clone());
        store
            .send(action)
            .await
            .map_err(|e| BookingError::Internal(e.to_string()))?;
        let state = store.into_state().await;

        match state.last_error {
            Some(ref error) => {
                metrics::record_order_rejected(error.kind());
                Err(error.clone())
            },
            None => Ok(state),
        }
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, BookingError> {
        self.env
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| BookingError::order_not_found(order_id))
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Place an order.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for a bad seat list or a closed session
    /// - [`BookingError::Conflict`] if a requested seat is occupied
    /// - [`BookingError::Persistence`] if a store fails; when the seats could
    ///   not be reserved after the save, the order is left CANCELLED
    pub async fn create_order(&self, request: NewOrder) -> Result<Order, BookingError> {
        let order_id = OrderId::new();

        let lock = request
            .session
            .as_ref()
            .map(|session| self.lock(LockKey::Session(request.movie_id, session.clone())));
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let occupied = match &request.session {
            Some(session) => {
                self.env
                    .ledger
                    .occupied(request.movie_id, session.clone())
                    .await?
            },
            None => BTreeSet::new(),
        };

        let promo = match request.promo_code.as_deref().map(normalize_code) {
            Some(code) if !code.is_empty() => self.env.promos.find(code).await?,
            _ => None,
        };

        let state = self
            .dispatch(
                OrderState::new(),
                OrderAction::PlaceOrder {
                    order_id,
                    request,
                    promo,
                    occupied,
                },
            )
            .await?;

        let order = state
            .get(&order_id)
            .cloned()
            .ok_or_else(|| BookingError::Internal(format!("Order {order_id} missing after placement")))?;
        metrics::record_order_placed(order.seats.len(), order.promo_code.is_some());
        Ok(order)
    }

    /// Pay for a pending order.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown order
    /// - [`BookingError::State`] unless the order is PENDING
    /// - [`BookingError::Validation`] if the total is zero
    /// - [`BookingError::PaymentDeclined`] if the gateway declined; the order
    ///   is now PAYMENT_FAILED
    pub async fn pay(
        &self,
        order_id: OrderId,
        submission: PaymentSubmission,
    ) -> Result<Order, BookingError> {
        let (order, _guard) = self.load_locked(order_id).await?;
        let method = submission.method.clone();

        let result = self
            .dispatch(
                OrderState::with_order(order),
                OrderAction::SubmitPayment {
                    order_id,
                    method: submission.method,
                    card_number: submission.card_number,
                    email: submission.email,
                },
            )
            .await;

        match result {
            Ok(state) => {
                let order = state
                    .get(&order_id)
                    .cloned()
                    .ok_or_else(|| BookingError::order_not_found(order_id))?;
                metrics::record_payment_succeeded(order.pricing.total.cents());
                Ok(order)
            },
            Err(error @ BookingError::PaymentDeclined(_)) => {
                metrics::record_payment_declined(method.to_string());
                Err(error)
            },
            Err(error) => Err(error),
        }
    }

    /// Cancel an order and release its seats.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown order
    /// - [`BookingError::State`] if already cancelled or PAYMENT_FAILED
    /// - [`BookingError::Internal`] if the stored order date is unreadable
    /// - [`BookingError::WindowExpired`] past the cancellation window
    pub async fn cancel(&self, order_id: OrderId) -> Result<CancellationReceipt, BookingError> {
        let (order, _guard) = self.load_locked(order_id).await?;
        let refund = order.pricing.total;

        self.dispatch(OrderState::with_order(order), OrderAction::CancelOrder { order_id })
            .await?;

        metrics::record_order_cancelled(refund.cents());
        Ok(CancellationReceipt { order_id, refund })
    }

    /// Email the booking confirmation of a paid order.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for a blank or malformed address
    /// - [`BookingError::NotFound`] for an unknown order
    /// - [`BookingError::State`] unless the order is CONFIRMED
    /// - [`BookingError::Internal`] if the mailer fails
    pub async fn send_confirmation_email(
        &self,
        order_id: OrderId,
        email: String,
    ) -> Result<(), BookingError> {
        if email.trim().is_empty() {
            return Err(BookingError::Validation("Email address is required".to_string()));
        }
        let order = self.load(order_id).await?;
        self.dispatch(
            OrderState::with_order(order),
            OrderAction::SendConfirmation { order_id, email },
        )
        .await?;
        info!(%order_id, "Booking confirmation email sent");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Order by id.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] for an unknown order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, BookingError> {
        self.load(order_id).await
    }

    /// A customer's orders, newest business order date first.
    ///
    /// Orders whose date cannot be parsed are not rejected; they sort after
    /// the dated ones and keep their relative position.
    ///
    /// # Errors
    ///
    /// [`BookingError::Persistence`] if the store fails.
    pub async fn history(&self, customer_id: CustomerId) -> Result<Vec<Order>, BookingError> {
        let mut orders = self.env.orders.find_by_customer(customer_id).await?;
        orders.sort_by_cached_key(|order| Reverse(parse_order_date(&order.order_date).ok()));
        Ok(orders)
    }

    /// A customer's most recent order.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] if the customer has no orders.
    pub async fn latest_order(&self, customer_id: CustomerId) -> Result<Order, BookingError> {
        self.history(customer_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::NotFound {
                resource: "Orders for customer".to_string(),
                id: customer_id.to_string(),
            })
    }

    /// Payment summary.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] for an unknown order.
    pub async fn payment_status(&self, order_id: OrderId) -> Result<PaymentStatus, BookingError> {
        self.load(order_id).await.map(|order| PaymentStatus::from(&order))
    }

    /// Occupied seats of a session; empty when nothing is booked yet.
    ///
    /// # Errors
    ///
    /// [`BookingError::Persistence`] if the store fails.
    pub async fn occupied_seats(
        &self,
        movie_id: MovieId,
        session: SessionKey,
    ) -> Result<BTreeSet<SeatNumber>, BookingError> {
        Ok(self.env.ledger.occupied(movie_id, session).await?)
    }

    // ========================================================================
    // Promo codes
    // ========================================================================

    /// Create a promo code.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for a blank code or bad percentage
    /// - [`BookingError::Conflict`] if the code exists
    pub async fn create_promo(&self, request: NewPromoCode) -> Result<PromoCode, BookingError> {
        let promo = request.into_promo(self.env.clock.now())?;
        if !self.env.promos.insert(promo.clone()).await? {
            warn!(code = %promo.code, "Duplicate promo code rejected");
            return Err(BookingError::Conflict("Promo code already exists".to_string()));
        }
        info!(code = %promo.code, kind = promo.discount.type_name(), "Promo code created");
        Ok(promo)
    }

    /// Promo code details.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] for an unknown code.
    pub async fn get_promo(&self, code: &str) -> Result<PromoDetails, BookingError> {
        let normalized = normalize_code(code);
        let promo = self
            .env
            .promos
            .find(normalized.clone())
            .await?
            .ok_or_else(|| BookingError::promo_not_found(&normalized))?;
        let is_valid = promo.is_valid(self.env.clock.now());
        Ok(PromoDetails { promo, is_valid })
    }

    /// Check whether a code could be applied now.
    ///
    /// # Errors
    ///
    /// [`BookingError::Validation`] for a blank code. Unknown or unusable
    /// codes are a rejected validation, not an error.
    pub async fn validate_promo(&self, code: &str) -> Result<PromoValidation, BookingError> {
        let normalized = normalize_code(code);
        if normalized.is_empty() {
            return Err(BookingError::Validation(PromoRejection::Missing.message().to_string()));
        }
        let found = self.env.promos.find(normalized.clone()).await?;
        Ok(match promo::validate(&normalized, found.as_ref(), self.env.clock.now()) {
            Ok(valid) => PromoValidation::accepted(valid.clone()),
            Err(rejection) => PromoValidation::rejected(rejection),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payment_gateway::SimulatedPaymentGateway;
    use cinema_testing::test_clock;

    fn service() -> BookingService {
        BookingService::new(OrderEnvironment::in_memory(
            Arc::new(test_clock()),
            SimulatedPaymentGateway::always_approve().shared(),
        ))
    }

    fn order_for(customer: i64, order_date: Option<&str>) -> NewOrder {
        NewOrder {
            customer_id: CustomerId::new(customer),
            user_name: None,
            movie_id: MovieId::new(1),
            movie_title: None,
            session: None,
            seats: vec![10],
            order_date: order_date.map(ToString::to_string),
            promo_code: None,
        }
    }

    #[tokio::test]
    async fn test_history_sorts_newest_first_and_keeps_unparseable() {
        let service = service();
        let old = service
            .create_order(order_for(7, Some("2024-12-30 09:00:00")))
            .await
            .unwrap();
        let new = service
            .create_order(order_for(7, Some("2025-01-01T09:00:00.000Z")))
            .await
            .unwrap();
        service.create_order(order_for(8, None)).await.unwrap();

        let history = service.history(CustomerId::new(7)).await.unwrap();
        assert_eq!(history.iter().map(|o| o.id).collect::<Vec<_>>(), vec![new.id, old.id]);
        assert_eq!(service.latest_order(CustomerId::new(7)).await.unwrap().id, new.id);
    }

    #[tokio::test]
    async fn test_latest_order_for_unknown_customer() {
        let result = service().latest_order(CustomerId::new(99)).await;
        assert!(matches!(result, Err(BookingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_validate_promo_requires_code() {
        let result = service().validate_promo("   ").await;
        assert_eq!(
            result,
            Err(BookingError::Validation("Promo code is required".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_promo_is_rejected_not_an_error() {
        let validation = service().validate_promo("nope").await.unwrap();
        assert!(!validation.valid);
        assert_eq!(validation.message, "Invalid promo code");
    }

    #[tokio::test]
    async fn test_payment_status_of_pending_order() {
        let service = service();
        let order = service.create_order(order_for(1, None)).await.unwrap();
        let status = service.payment_status(order.id).await.unwrap();

        assert_eq!(status.status, OrderStatus::Pending);
        assert_eq!(status.total, Money::from_cents(1_210));
        assert!(status.transaction_id.is_none());
    }
}
