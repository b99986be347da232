//! Domain types for the cinema booking backend.
//!
//! Value objects (identifiers, money, seat numbers), the [`Order`] entity with
//! its embedded price breakdown and payment fields, promo codes, and the
//! request-scoped aggregate state.

use crate::error::BookingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer account identifier (assigned by the user service)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

impl CustomerId {
    /// Wraps a raw customer id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw id value
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Movie catalogue identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(i64);

impl MovieId {
    /// Wraps a raw movie id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw id value
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Showtime label for one screening of a movie, e.g. `"07:30 PM"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Creates a session key from its label
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The session label
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Seat position in the hall, numbered row-major from 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatNumber(u8);

impl SeatNumber {
    /// Seats per hall (8 rows of 8)
    pub const TOTAL: u8 = 64;

    /// Returns `None` for numbers outside the hall.
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number < Self::TOTAL {
            Some(Self(number))
        } else {
            None
        }
    }

    /// Raw seat number
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validates a requested seat list.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] if the list is empty, contains a seat
/// outside the hall, or names the same seat twice.
pub fn parse_seat_selection(requested: &[u32]) -> Result<BTreeSet<SeatNumber>, BookingError> {
    if requested.is_empty() {
        return Err(BookingError::Validation(
            "At least one seat must be selected".to_string(),
        ));
    }

    let mut seats = BTreeSet::new();
    for &raw in requested {
        let seat = u8::try_from(raw)
            .ok()
            .and_then(SeatNumber::new)
            .ok_or_else(|| {
                BookingError::Validation(format!(
                    "Seat {raw} does not exist (valid seats are 0-{})",
                    SeatNumber::TOTAL - 1
                ))
            })?;
        if !seats.insert(seat) {
            return Err(BookingError::Validation(format!(
                "Seat {raw} was selected more than once"
            )));
        }
    }
    Ok(seats)
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units, saturating on overflow
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole units (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Addition, saturating at `u64::MAX` cents
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtraction clamped at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Share of this amount given in basis points (1% = 100), rounded half-up
    /// to the cent.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn basis_points(self, bps: u64) -> Self {
        let scaled = (self.0 as u128) * (bps as u128) + 5_000;
        let cents = scaled / 10_000;
        if cents > u64::MAX as u128 {
            Self(u64::MAX)
        } else {
            Self(cents as u64)
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Order lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, seats held, awaiting payment
    Pending,
    /// Paid, booking reference issued
    Confirmed,
    /// Payment was declined
    PaymentFailed,
    /// Cancelled by the customer (or compensated after a ledger failure)
    Cancelled,
}

impl OrderStatus {
    /// Wire/storage name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price breakdown embedded in an order. All amounts in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Sum of per-seat class prices
    pub subtotal: Money,
    /// Booking service fee
    pub booking_fee: Money,
    /// Tax on the discounted amount
    pub tax: Money,
    /// Promo discount
    pub discount: Money,
    /// Amount charged
    pub total: Money,
}

/// How the customer pays
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    /// Credit/debit card
    #[default]
    Card,
    /// Mobile wallet
    EWallet,
    /// Pay at the counter
    Cash,
    /// Settled by bank transfer
    BankTransfer,
    /// Anything else; always declined
    Unknown(String),
}

impl PaymentMethod {
    /// Display name as sent by clients
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Card => "Card",
            Self::EWallet => "E-Wallet",
            Self::Cash => "Cash",
            Self::BankTransfer => "Bank Transfer",
            Self::Unknown(name) => name,
        }
    }
}

impl From<String> for PaymentMethod {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Card" => Self::Card,
            "E-Wallet" => Self::EWallet,
            "Cash" => Self::Cash,
            "Bank Transfer" => Self::BankTransfer,
            _ => Self::Unknown(name),
        }
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment fields recorded on a confirmed order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Gateway transaction id (`TXN...`)
    pub transaction_id: String,
    /// When the payment was accepted
    pub paid_at: DateTime<Utc>,
    /// Method used
    pub method: PaymentMethod,
}

/// Booking confirmation issued when an order is paid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Human-presentable booking reference, `BK-yyyyMMdd-NNNN`
    pub booking_reference: String,
    /// Text encoded in the QR code
    pub qr_payload: String,
    /// Rendered QR image (base64)
    pub qr_image: String,
}

/// A ticket order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID
    pub id: OrderId,
    /// Ordering customer
    pub customer_id: CustomerId,
    /// Customer display name, if supplied
    pub user_name: Option<String>,
    /// Movie being watched
    pub movie_id: MovieId,
    /// Movie title, if supplied
    pub movie_title: Option<String>,
    /// Screening; orders without a session do not touch the seat ledger
    pub session: Option<SessionKey>,
    /// Requested seats (non-empty)
    pub seats: BTreeSet<SeatNumber>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// System creation time
    pub created_at: DateTime<Utc>,
    /// Business order date used for the cancellation window
    pub order_date: String,
    /// Pricing
    pub pricing: PriceBreakdown,
    /// Promo code that was applied, if any
    pub promo_code: Option<String>,
    /// Set once paid
    pub payment: Option<PaymentDetails>,
    /// Set once paid
    pub ticket: Option<Ticket>,
    /// Set when cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Seats as a sorted, comma-separated list, or `"N/A"` when empty.
    #[must_use]
    pub fn seat_list(&self) -> String {
        if self.seats.is_empty() {
            return "N/A".to_string();
        }
        self.seats
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Title to print on tickets
    #[must_use]
    pub fn display_title(&self) -> String {
        self.movie_title
            .clone()
            .unwrap_or_else(|| format!("Movie #{}", self.movie_id))
    }
}

// ============================================================================
// Promo codes
// ============================================================================

/// Discount granted by a promo code
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Percentage of the subtotal, in `(0, 100]`
    Percentage {
        /// Percent off
        percent: f64,
    },
    /// Flat amount off, regardless of subtotal
    FixedAmount {
        /// Amount off
        amount: Money,
    },
}

impl DiscountKind {
    /// Storage name of the discount type
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Percentage { .. } => "PERCENTAGE",
            Self::FixedAmount { .. } => "FIXED_AMOUNT",
        }
    }
}

/// A promo code
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    /// Upper-case code
    pub code: String,
    /// Discount granted
    pub discount: DiscountKind,
    /// Last instant the code is valid, if it expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Maximum redemptions (0 = unlimited)
    pub usage_limit: u32,
    /// Redemptions so far
    pub used_count: u32,
    /// Whether the code is switched on
    pub active: bool,
    /// Free-text description
    pub description: Option<String>,
    /// When the code was created
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Aggregate State
// ============================================================================

/// State for the Order aggregate
///
/// Holds only the orders a single request touches; the repository is the
/// source of truth between requests.
#[derive(Clone, Debug, Default)]
pub struct OrderState {
    /// Orders indexed by ID
    pub orders: HashMap<OrderId, Order>,
    /// Error from the last rejected command or failed effect
    pub last_error: Option<BookingError>,
}

impl OrderState {
    /// Creates a new empty `OrderState`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State preloaded with one order
    #[must_use]
    pub fn with_order(order: Order) -> Self {
        let mut state = Self::new();
        state.orders.insert(order.id, order);
        state
    }

    /// Gets an order by ID
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Checks if an order exists
    #[must_use]
    pub fn exists(&self, id: &OrderId) -> bool {
        self.orders.contains_key(id)
    }
}
