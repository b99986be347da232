//! Order lifecycle aggregate.
//!
//! ```text
//!              pay ok                cancel (<= window)
//!   PENDING ───────────▶ CONFIRMED ─────────────────────▶ CANCELLED
//!      │  pay declined                                        ▲
//!      ├──────────────▶ PAYMENT_FAILED                        │
//!      └──────────────────────────────────────────────────────┘
//!                         cancel (<= window)
//! ```
//!
//! Commands are validated against the state loaded for the request. Accepted
//! commands apply their event immediately and return effects that talk to
//! the stores, the payment gateway, ticketing and the mailer. Effect outcomes
//! come back as events (`PaymentSucceeded`, `SeatReservationFailed`, ...).
//!
//! Create ordering: the promo redemption is counted first, then the order is
//! saved, then the seats are reserved. An order whose code ran out of
//! redemptions in the meantime is re-priced without the discount before it is
//! saved. If the reservation fails after the save, the order is compensated to
//! CANCELLED.
//!
//! Pay ordering: the confirmed order is saved before any confirmation email
//! goes out; a failed save sends nothing.

use crate::error::BookingError;
use crate::ledger::conflicting_seats;
use crate::order_date::{format_order_date, parse_order_date};
use crate::payment_gateway::{PaymentGateway, PaymentRequest};
use crate::persistence::{
    InMemoryOrderRepository, InMemoryPromoCodeStore, InMemorySeatLedger, OrderRepository,
    PromoCodeStore, SeatLedgerStore,
};
use crate::pricing::{price_breakdown, subtotal};
use crate::promo;
use crate::session_policy::{PermissiveSessionPolicy, SessionPolicy};
use crate::ticketing::{
    is_valid_email, Base64QrTicketing, BookingConfirmation, ConsoleMailer, Mailer, Ticketing,
};
use crate::types::{
    CustomerId, Money, MovieId, Order, OrderId, OrderState, OrderStatus, PaymentDetails,
    PaymentMethod, PromoCode, SeatNumber, SessionKey, Ticket, parse_seat_selection,
};
use chrono::{DateTime, Duration, Utc};
use cinema_core::{
    effect::Effect,
    environment::Clock,
    reducer::{Effects, Reducer},
    smallvec, SmallVec,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Message for a declined payment
pub const PAYMENT_REJECTED: &str =
    "Payment was rejected. Please try again or use a different payment method.";

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Order placement request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Ordering customer
    pub customer_id: CustomerId,
    /// Display name
    #[serde(default)]
    pub user_name: Option<String>,
    /// Movie
    pub movie_id: MovieId,
    /// Movie title, printed on the ticket
    #[serde(default)]
    pub movie_title: Option<String>,
    /// Screening; without one the seat ledger is not consulted
    #[serde(default)]
    pub session: Option<SessionKey>,
    /// Requested seat numbers
    pub seats: Vec<u32>,
    /// Business order date; the server's clock when omitted
    #[serde(default)]
    pub order_date: Option<String>,
    /// Promo code as typed
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// Actions for the Order aggregate
#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum OrderAction {
    // Commands
    /// Place a new order
    PlaceOrder {
        /// ID for the new order
        order_id: OrderId,
        /// What the customer asked for
        request: NewOrder,
        /// Promo code looked up for `request.promo_code`
        promo: Option<PromoCode>,
        /// Seats occupied in the session, read under the session lock
        occupied: BTreeSet<SeatNumber>,
    },

    /// Pay for a pending order
    SubmitPayment {
        /// Order
        order_id: OrderId,
        /// Payment method
        method: PaymentMethod,
        /// Card number for card payments
        card_number: Option<String>,
        /// Send the confirmation here on success
        email: Option<String>,
    },

    /// Cancel an order within the cancellation window
    CancelOrder {
        /// Order
        order_id: OrderId,
    },

    /// Email the confirmation of a paid order
    SendConfirmation {
        /// Order
        order_id: OrderId,
        /// Recipient
        email: String,
    },

    // Events
    /// Order was created PENDING
    OrderPlaced {
        /// The new order
        order: Order,
    },

    /// The applied promo code's redemption was counted
    PromoRedeemed {
        /// Order
        order_id: OrderId,
    },

    /// The applied promo code reached its usage limit before this order
    /// could redeem it
    PromoExhausted {
        /// Order
        order_id: OrderId,
        /// Code that could not be redeemed
        code: String,
    },

    /// Gateway accepted the payment
    PaymentSucceeded {
        /// Order
        order_id: OrderId,
        /// Transaction fields
        payment: PaymentDetails,
        /// Booking reference and QR
        ticket: Ticket,
        /// Confirmation recipient
        email: Option<String>,
    },

    /// Gateway declined the payment
    PaymentDeclined {
        /// Order
        order_id: OrderId,
        /// Method that was tried
        method: PaymentMethod,
        /// Gateway reason, for logs
        reason: String,
    },

    /// Order was cancelled
    OrderCancelled {
        /// Order
        order_id: OrderId,
        /// When
        cancelled_at: DateTime<Utc>,
        /// Amount to refund
        refund: Money,
    },

    /// Seats could not be reserved after the order was saved
    SeatReservationFailed {
        /// Order
        order_id: OrderId,
        /// Store error
        reason: String,
    },

    /// A store write failed
    PersistenceFailed {
        /// Order being written
        order_id: OrderId,
        /// Store error
        reason: String,
    },

    /// The mailer failed on an explicit send request
    ConfirmationEmailFailed {
        /// Order
        order_id: OrderId,
        /// Mailer error
        reason: String,
    },

    /// A command was rejected
    CommandRejected {
        /// Why
        error: BookingError,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the Order aggregate
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Clock for timestamps and the cancellation window
    pub clock: Arc<dyn Clock>,
    /// Order storage
    pub orders: Arc<dyn OrderRepository>,
    /// Seat occupancy
    pub ledger: Arc<dyn SeatLedgerStore>,
    /// Promo codes
    pub promos: Arc<dyn PromoCodeStore>,
    /// Payment simulator
    pub gateway: Arc<dyn PaymentGateway>,
    /// Booking references and QR codes
    pub ticketing: Arc<dyn Ticketing>,
    /// Confirmation emails
    pub mailer: Arc<dyn Mailer>,
    /// Session start-time rule
    pub session_policy: Arc<dyn SessionPolicy>,
    /// How long after the order date cancellation is allowed (inclusive)
    pub cancellation_window: Duration,
}

impl OrderEnvironment {
    /// Environment backed by in-memory stores, console mail, base64 QR codes
    /// and the permissive session policy.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            clock,
            orders: Arc::new(InMemoryOrderRepository::new()),
            ledger: Arc::new(InMemorySeatLedger::new()),
            promos: Arc::new(InMemoryPromoCodeStore::new()),
            gateway,
            ticketing: Arc::new(Base64QrTicketing::default()),
            mailer: Arc::new(ConsoleMailer::new()),
            session_policy: Arc::new(PermissiveSessionPolicy),
            cancellation_window: Duration::hours(24),
        }
    }

    /// Replace the session policy
    #[must_use]
    pub fn with_session_policy(mut self, policy: Arc<dyn SessionPolicy>) -> Self {
        self.session_policy = policy;
        self
    }

    /// Replace the seat ledger
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn SeatLedgerStore>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Replace the mailer
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Order aggregate
#[derive(Clone, Debug, Default)]
pub struct OrderReducer;

impl OrderReducer {
    /// Creates a new `OrderReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates `PlaceOrder` and builds the order it would create.
    fn validate_place_order(
        state: &OrderState,
        order_id: OrderId,
        request: NewOrder,
        promo: Option<&PromoCode>,
        occupied: &BTreeSet<SeatNumber>,
        env: &OrderEnvironment,
    ) -> Result<Order, BookingError> {
        if state.exists(&order_id) {
            return Err(BookingError::State(format!("Order {order_id} already exists")));
        }

        let seats = parse_seat_selection(&request.seats)?;
        let now = env.clock.now();

        if let Some(session) = &request.session {
            if !env.session_policy.is_open(session, now) {
                return Err(BookingError::Validation("Session is past or full".to_string()));
            }
            let taken = conflicting_seats(occupied, &seats);
            if !taken.is_empty() {
                let list = taken.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                return Err(BookingError::Conflict(format!(
                    "One or more selected seats are already reserved/occupied: {list}"
                )));
            }
        }

        let sub = subtotal(&seats);
        let mut applied_code = None;
        let mut discount = Money::ZERO;
        if let Some(code) = request.promo_code.as_deref().filter(|c| !c.trim().is_empty()) {
            match promo::validate(code, promo, now) {
                Ok(valid) => {
                    discount = valid.discount_for(sub);
                    applied_code = Some(valid.code.clone());
                },
                Err(rejection) => {
                    info!(%order_id, code, reason = %rejection, "Promo code not applied");
                },
            }
        }

        Ok(Order {
            id: order_id,
            customer_id: request.customer_id,
            user_name: request.user_name,
            movie_id: request.movie_id,
            movie_title: request.movie_title,
            session: request.session,
            pricing: price_breakdown(&seats, discount),
            seats,
            status: OrderStatus::Pending,
            created_at: now,
            order_date: request
                .order_date
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| format_order_date(now)),
            promo_code: applied_code,
            payment: None,
            ticket: None,
            cancelled_at: None,
        })
    }

    /// Validates `SubmitPayment`
    fn validate_payment(state: &OrderState, order_id: OrderId) -> Result<&Order, BookingError> {
        let order = state
            .get(&order_id)
            .ok_or_else(|| BookingError::order_not_found(order_id))?;

        if order.status != OrderStatus::Pending {
            return Err(BookingError::State(format!(
                "Order status is {}. Only PENDING orders can be paid.",
                order.status
            )));
        }
        if order.pricing.total.is_zero() {
            return Err(BookingError::Validation("Total amount not calculated".to_string()));
        }
        Ok(order)
    }

    /// Validates `CancelOrder`. The window is inclusive: an order exactly
    /// `cancellation_window` old can still be cancelled.
    fn validate_cancel(
        state: &OrderState,
        order_id: OrderId,
        env: &OrderEnvironment,
    ) -> Result<(), BookingError> {
        let order = state
            .get(&order_id)
            .ok_or_else(|| BookingError::order_not_found(order_id))?;

        match order.status {
            OrderStatus::Cancelled => {
                return Err(BookingError::State("Order is already cancelled".to_string()));
            },
            OrderStatus::PaymentFailed => {
                return Err(BookingError::State(format!(
                    "Order status is {}. Only PENDING or CONFIRMED orders can be cancelled.",
                    order.status
                )));
            },
            OrderStatus::Pending | OrderStatus::Confirmed => {},
        }

        let ordered_at = parse_order_date(&order.order_date)?;
        if env.clock.now() - ordered_at > env.cancellation_window {
            return Err(BookingError::WindowExpired(format!(
                "Cancellation window has expired. Orders can only be cancelled within {} hours of booking.",
                env.cancellation_window.num_hours()
            )));
        }
        Ok(())
    }

    /// Validates `SendConfirmation`
    fn validate_send_confirmation<'a>(
        state: &'a OrderState,
        order_id: OrderId,
        email: &str,
    ) -> Result<&'a Order, BookingError> {
        if email.trim().is_empty() {
            return Err(BookingError::Validation("Email address is required".to_string()));
        }
        if !is_valid_email(email.trim()) {
            return Err(BookingError::Validation("Invalid email address format".to_string()));
        }
        let order = state
            .get(&order_id)
            .ok_or_else(|| BookingError::order_not_found(order_id))?;
        if order.status != OrderStatus::Confirmed {
            return Err(BookingError::State(
                "Booking confirmation email can only be sent for CONFIRMED orders".to_string(),
            ));
        }
        Ok(order)
    }

    /// Applies an event to state
    fn apply_event(state: &mut OrderState, action: &OrderAction) {
        match action {
            OrderAction::OrderPlaced { order } => {
                state.orders.insert(order.id, order.clone());
                state.last_error = None;
            },

            OrderAction::PromoExhausted { order_id, .. } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.pricing = price_breakdown(&order.seats, Money::ZERO);
                    order.promo_code = None;
                }
            },

            OrderAction::PaymentSucceeded {
                order_id,
                payment,
                ticket,
                ..
            } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.status = OrderStatus::Confirmed;
                    order.payment = Some(payment.clone());
                    order.ticket = Some(ticket.clone());
                }
                state.last_error = None;
            },

            OrderAction::PaymentDeclined { order_id, .. } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.status = OrderStatus::PaymentFailed;
                }
                state.last_error = Some(BookingError::PaymentDeclined(PAYMENT_REJECTED.to_string()));
            },

            OrderAction::OrderCancelled {
                order_id,
                cancelled_at,
                ..
            } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.status = OrderStatus::Cancelled;
                    order.cancelled_at = Some(*cancelled_at);
                }
                state.last_error = None;
            },

            OrderAction::SeatReservationFailed { order_id, reason } => {
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.status = OrderStatus::Cancelled;
                    order.cancelled_at = Some(order.created_at);
                }
                state.last_error = Some(BookingError::Persistence(format!(
                    "Seats could not be reserved, order {order_id} was cancelled: {reason}"
                )));
            },

            OrderAction::PersistenceFailed { reason, .. } => {
                state.last_error = Some(BookingError::Persistence(reason.clone()));
            },

            OrderAction::ConfirmationEmailFailed { reason, .. } => {
                state.last_error = Some(BookingError::Internal(format!(
                    "Failed to send booking confirmation email: {reason}"
                )));
            },

            OrderAction::CommandRejected { error } => {
                state.last_error = Some(error.clone());
            },

            // Commands don't modify state
            OrderAction::PromoRedeemed { .. }
            | OrderAction::PlaceOrder { .. }
            | OrderAction::SubmitPayment { .. }
            | OrderAction::CancelOrder { .. }
            | OrderAction::SendConfirmation { .. } => {},
        }
    }

    fn reject(state: &mut OrderState, error: BookingError) -> Effects<OrderAction> {
        info!(%error, "Order command rejected");
        Self::apply_event(state, &OrderAction::CommandRejected { error });
        SmallVec::new()
    }

    /// Save `order`, feeding back `PersistenceFailed` on error.
    fn save(env: &OrderEnvironment, order: Order) -> Effect<OrderAction> {
        let orders = Arc::clone(&env.orders);
        Effect::future(async move {
            let order_id = order.id;
            match orders.save(order).await {
                Ok(()) => None,
                Err(e) => {
                    error!(%order_id, error = %e, "Failed to persist order");
                    Some(OrderAction::PersistenceFailed {
                        order_id,
                        reason: e.to_string(),
                    })
                },
            }
        })
    }

    /// Count one redemption of `code` for `order_id`.
    fn redeem_effect(env: &OrderEnvironment, order_id: OrderId, code: String) -> Effect<OrderAction> {
        let promos = Arc::clone(&env.promos);
        Effect::future(async move {
            match promos.record_usage(code.clone()).await {
                Ok(true) => Some(OrderAction::PromoRedeemed { order_id }),
                Ok(false) => Some(OrderAction::PromoExhausted { order_id, code }),
                Err(e) => {
                    error!(%order_id, %code, error = %e, "Failed to record promo usage");
                    Some(OrderAction::PersistenceFailed {
                        order_id,
                        reason: e.to_string(),
                    })
                },
            }
        })
    }

    /// Save a new order, then reserve its seats.
    fn persist_new_order(env: &OrderEnvironment, order: Order) -> Effect<OrderAction> {
        let orders = Arc::clone(&env.orders);
        let ledger = Arc::clone(&env.ledger);
        let now = env.clock.now();

        Effect::future(async move {
            let order_id = order.id;
            let reservation = order
                .session
                .clone()
                .map(|session| (order.movie_id, session, order.seats.clone()));

            if let Err(e) = orders.save(order).await {
                error!(%order_id, error = %e, "Failed to persist new order");
                return Some(OrderAction::PersistenceFailed {
                    order_id,
                    reason: e.to_string(),
                });
            }

            if let Some((movie_id, session, seats)) = reservation {
                if let Err(e) = ledger.reserve(movie_id, session.clone(), seats, now).await {
                    error!(
                        %order_id,
                        %movie_id,
                        %session,
                        error = %e,
                        "Order saved but seat reservation failed; compensating"
                    );
                    return Some(OrderAction::SeatReservationFailed {
                        order_id,
                        reason: e.to_string(),
                    });
                }
            }
            None
        })
    }

    /// Issue the ticket, then charge.
    fn payment_effect(
        env: &OrderEnvironment,
        order: Order,
        method: PaymentMethod,
        card_number: Option<String>,
        email: Option<String>,
    ) -> Effect<OrderAction> {
        let gateway = Arc::clone(&env.gateway);
        let ticketing = Arc::clone(&env.ticketing);
        let paid_at = env.clock.now();

        Effect::future(async move {
            let order_id = order.id;
            let ticket = match ticketing.issue(&order, paid_at) {
                Ok(ticket) => ticket,
                Err(e) => {
                    error!(%order_id, error = %e, "Ticket issue failed before payment");
                    return Some(OrderAction::CommandRejected {
                        error: BookingError::Internal(e.to_string()),
                    });
                },
            };

            let request = PaymentRequest {
                method: method.clone(),
                card_number,
                amount: order.pricing.total,
            };
            match gateway.attempt(request).await {
                Ok(receipt) => Some(OrderAction::PaymentSucceeded {
                    order_id,
                    payment: PaymentDetails {
                        transaction_id: receipt.transaction_id,
                        paid_at,
                        method,
                    },
                    ticket,
                    email,
                }),
                Err(e) => Some(OrderAction::PaymentDeclined {
                    order_id,
                    method,
                    reason: e.to_string(),
                }),
            }
        })
    }

    /// Send a requested confirmation, feeding back failure.
    fn email_effect(
        env: &OrderEnvironment,
        confirmation: BookingConfirmation,
        order_id: OrderId,
    ) -> Effect<OrderAction> {
        let mailer = Arc::clone(&env.mailer);
        Effect::future(async move {
            match mailer.send_confirmation(confirmation).await {
                Ok(()) => None,
                Err(e) => Some(OrderAction::ConfirmationEmailFailed {
                    order_id,
                    reason: e.to_string(),
                }),
            }
        })
    }

    /// Save the confirmed order, then send the confirmation if one was asked
    /// for. A failed save sends nothing; a failed email is only logged.
    fn confirm_effect(
        env: &OrderEnvironment,
        order: Order,
        confirmation: Option<BookingConfirmation>,
    ) -> Effect<OrderAction> {
        let orders = Arc::clone(&env.orders);
        let mailer = Arc::clone(&env.mailer);
        Effect::future(async move {
            let order_id = order.id;
            if let Err(e) = orders.save(order).await {
                error!(%order_id, error = %e, "Payment accepted but confirmed order not saved");
                return Some(OrderAction::PersistenceFailed {
                    order_id,
                    reason: e.to_string(),
                });
            }
            if let Some(confirmation) = confirmation {
                if let Err(e) = mailer.send_confirmation(confirmation).await {
                    warn!(%order_id, error = %e, "Confirmation email failed after payment");
                }
            }
            None
        })
    }

    /// Release seats (if the order has a session), then save.
    fn cancel_effect(env: &OrderEnvironment, order: Order) -> Effect<OrderAction> {
        let orders = Arc::clone(&env.orders);
        let ledger = Arc::clone(&env.ledger);
        let now = env.clock.now();

        Effect::future(async move {
            let order_id = order.id;
            if let Some(session) = order.session.clone() {
                let released = ledger
                    .release(order.movie_id, session, order.seats.clone(), now)
                    .await;
                if let Err(e) = released {
                    error!(%order_id, error = %e, "Failed to release seats; order left unchanged");
                    return Some(OrderAction::PersistenceFailed {
                        order_id,
                        reason: e.to_string(),
                    });
                }
            }
            match orders.save(order).await {
                Ok(()) => None,
                Err(e) => {
                    error!(%order_id, error = %e, "Seats released but cancelled order not saved");
                    Some(OrderAction::PersistenceFailed {
                        order_id,
                        reason: e.to_string(),
                    })
                },
            }
        })
    }
}

impl Reducer for OrderReducer {
    type State = OrderState;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            // ========== Create ==========
            OrderAction::PlaceOrder {
                order_id,
                request,
                promo,
                occupied,
            } => {
                let order = match Self::validate_place_order(
                    state,
                    order_id,
                    request,
                    promo.as_ref(),
                    &occupied,
                    env,
                ) {
                    Ok(order) => order,
                    Err(error) => return Self::reject(state, error),
                };

                info!(
                    %order_id,
                    customer_id = %order.customer_id,
                    movie_id = %order.movie_id,
                    seats = ?order.seats,
                    total = order.pricing.total.cents(),
                    "Order placed"
                );
                let effect = match order.promo_code.clone() {
                    Some(code) => Self::redeem_effect(env, order_id, code),
                    None => Self::persist_new_order(env, order.clone()),
                };
                Self::apply_event(state, &OrderAction::OrderPlaced { order });
                smallvec![effect]
            },

            OrderAction::PromoRedeemed { order_id } => match state.get(&order_id).cloned() {
                Some(order) => smallvec![Self::persist_new_order(env, order)],
                None => SmallVec::new(),
            },

            OrderAction::PromoExhausted {
                order_id,
                ref code,
            } => {
                warn!(%order_id, %code, "Promo code ran out of redemptions; order placed without discount");
                Self::apply_event(state, &action);
                match state.get(&order_id).cloned() {
                    Some(order) => smallvec![Self::persist_new_order(env, order)],
                    None => SmallVec::new(),
                }
            },

            // ========== Pay ==========
            OrderAction::SubmitPayment {
                order_id,
                method,
                card_number,
                email,
            } => match Self::validate_payment(state, order_id).cloned() {
                Ok(order) => {
                    smallvec![Self::payment_effect(env, order, method, card_number, email)]
                },
                Err(error) => Self::reject(state, error),
            },

            OrderAction::PaymentSucceeded {
                order_id,
                ref email,
                ..
            } => {
                let email = email.clone();
                Self::apply_event(state, &action);
                let Some(order) = state.get(&order_id).cloned() else {
                    return SmallVec::new();
                };
                info!(%order_id, "Order confirmed");

                let confirmation = email
                    .filter(|e| is_valid_email(e.trim()))
                    .and_then(|e| BookingConfirmation::for_order(&order, e.trim()));
                smallvec![Self::confirm_effect(env, order, confirmation)]
            },

            OrderAction::PaymentDeclined {
                order_id,
                ref method,
                ref reason,
            } => {
                warn!(%order_id, %method, %reason, "Payment declined");
                Self::apply_event(state, &action);
                match state.get(&order_id).cloned() {
                    Some(order) => smallvec![Self::save(env, order)],
                    None => SmallVec::new(),
                }
            },

            // ========== Cancel ==========
            OrderAction::CancelOrder { order_id } => {
                if let Err(error) = Self::validate_cancel(state, order_id, env) {
                    return Self::reject(state, error);
                }
                let refund = state.get(&order_id).map_or(Money::ZERO, |o| o.pricing.total);
                Self::apply_event(
                    state,
                    &OrderAction::OrderCancelled {
                        order_id,
                        cancelled_at: env.clock.now(),
                        refund,
                    },
                );
                info!(%order_id, refund = refund.cents(), "Order cancelled");
                match state.get(&order_id).cloned() {
                    Some(order) => smallvec![Self::cancel_effect(env, order)],
                    None => SmallVec::new(),
                }
            },

            // ========== Compensation ==========
            OrderAction::SeatReservationFailed { order_id, .. } => {
                Self::apply_event(state, &action);
                match state.get(&order_id).cloned() {
                    Some(order) => smallvec![Self::save(env, order)],
                    None => SmallVec::new(),
                }
            },

            // ========== Email ==========
            OrderAction::SendConfirmation { order_id, email } => {
                let confirmation = Self::validate_send_confirmation(state, order_id, &email)
                    .map(|order| BookingConfirmation::for_order(order, email.trim()));
                match confirmation {
                    Ok(Some(confirmation)) => {
                        smallvec![Self::email_effect(env, confirmation, order_id)]
                    },
                    Ok(None) => Self::reject(
                        state,
                        BookingError::Internal(format!(
                            "Order {order_id} is confirmed but has no ticket"
                        )),
                    ),
                    Err(error) => Self::reject(state, error),
                }
            },

            // ========== Events ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
