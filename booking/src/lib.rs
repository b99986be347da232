//! Cinema Booking - seat reservation and order lifecycle for movie screenings
//!
//! Moviegoers pick seats for a session, place an order that is priced by seat
//! class (with an optional promo code), pay through a simulated gateway, and
//! receive a booking reference with a QR code. Orders can be cancelled within
//! a window after the order date, which releases their seats.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)          api/ + server/
//!        │
//!        ▼
//!   BookingService       app/   per-session locks, Store per request
//!        │
//!        ▼
//!   OrderReducer         aggregates/order.rs   state machine, pure
//!        │ effects
//!        ▼
//!   ┌────────────┬──────────────┬─────────────┬───────────┬──────────┐
//!   │ Orders     │ Seat ledger  │ Promo codes │ Payment   │ Ticketing│
//!   │ repository │ store        │ store       │ gateway   │ + mailer │
//!   └────────────┴──────────────┴─────────────┴───────────┴──────────┘
//!    persistence/ (memory | postgres)          payment_gateway.rs  ticketing.rs
//! ```
//!
//! # Order lifecycle
//!
//! ```text
//! PENDING ──pay ok──▶ CONFIRMED ──cancel──▶ CANCELLED
//!    │                                          ▲
//!    ├──pay declined──▶ PAYMENT_FAILED          │
//!    └──────────────────cancel──────────────────┘
//! ```
//!
//! # Pricing
//!
//! | class   | seats              | price  |
//! |---------|--------------------|--------|
//! | VIP     | 27, 28, 35, 36     | $25.00 |
//! | Couple  | 56 and above       | $30.00 |
//! | Premium | below 8            | $15.00 |
//! | Normal  | everything else    | $10.00 |
//!
//! A 10% booking fee is added, the promo discount is taken off, then 10% tax
//! is charged on what remains. See [`pricing`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod api;
pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod order_date;
pub mod payment_gateway;
pub mod persistence;
pub mod pricing;
pub mod promo;
pub mod server;
pub mod session_policy;
pub mod ticketing;
pub mod types;

pub use aggregates::{NewOrder, OrderAction, OrderEnvironment, OrderReducer};
pub use app::BookingService;
pub use config::Config;
pub use error::BookingError;
pub use types::*;
