//! Application state for the booking HTTP server.

use crate::app::BookingService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Booking commands and queries
    pub bookings: Arc<BookingService>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(bookings: Arc<BookingService>) -> Self {
        Self { bookings }
    }
}
