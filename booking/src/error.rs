//! Domain error taxonomy.

use crate::persistence::StoreError;
use thiserror::Error;

/// Why a booking operation was rejected.
///
/// Every variant carries a reason the customer can read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Bad or missing input
    #[error("{0}")]
    Validation(String),

    /// Seat already occupied, or duplicate promo code
    #[error("{0}")]
    Conflict(String),

    /// Unknown order or promo code
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of thing looked up
        resource: String,
        /// Identifier that was not found
        id: String,
    },

    /// Operation not allowed in the order's current status
    #[error("{0}")]
    State(String),

    /// Cancellation requested after the window closed
    #[error("{0}")]
    WindowExpired(String),

    /// The payment simulator declined
    #[error("{0}")]
    PaymentDeclined(String),

    /// A store was unavailable mid-operation
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Stored data could not be interpreted, or a collaborator failed
    #[error("{0}")]
    Internal(String),
}

impl BookingError {
    /// `NotFound` for an order
    #[must_use]
    pub fn order_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "Order".to_string(),
            id: id.to_string(),
        }
    }

    /// `NotFound` for a promo code
    #[must_use]
    pub fn promo_not_found(code: impl ToString) -> Self {
        Self::NotFound {
            resource: "Promo code".to_string(),
            id: code.to_string(),
        }
    }

    /// Short label used in metrics and logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::State(_) => "state",
            Self::WindowExpired(_) => "window_expired",
            Self::PaymentDeclined(_) => "payment_declined",
            Self::Persistence(_) => "persistence",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        Self::Persistence(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let error = BookingError::order_not_found("42");
        assert_eq!(error.to_string(), "Order not found: 42");
    }

    #[test]
    fn test_store_error_becomes_persistence() {
        let error: BookingError = StoreError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(error, BookingError::Persistence(ref msg) if msg.contains("connection refused")));
    }
}
