//! HTTP API handlers, grouped by resource:
//! - Orders: placement, details, cancellation, history, confirmation email
//! - Payments: payment and payment status
//! - Promos: promo code administration and validation
//! - Seats: occupied seats per session

pub mod error;
pub mod orders;
pub mod payments;
pub mod promos;
pub mod seats;

pub use error::ApiError;
