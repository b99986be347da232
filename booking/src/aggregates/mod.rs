//! Aggregate reducers for the booking system.
//!
//! - Order: placement, payment, cancellation and confirmation emails

pub mod order;

pub use order::{NewOrder, OrderAction, OrderEnvironment, OrderReducer};
