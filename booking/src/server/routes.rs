//! Router configuration for the booking system.

use super::health::health_check;
use super::state::AppState;
use crate::api::{orders, payments, promos, seats};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the complete Axum router.
///
/// `/health` at the root, everything else under `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Seat availability
        .route(
            "/movies/:movie_id/sessions/:session/seats",
            get(seats::occupied_seats),
        )
        // Orders
        .route("/orders", post(orders::create_order))
        .route(
            "/orders/:id",
            get(orders::get_order).delete(orders::cancel_order),
        )
        .route("/orders/:id/send-email", post(orders::send_confirmation_email))
        .route("/customers/:id/orders", get(orders::customer_history))
        .route("/customers/:id/orders/latest", get(orders::latest_order))
        // Payments
        .route("/payments/:order_id", post(payments::process_payment))
        .route("/payments/:order_id/status", get(payments::payment_status))
        // Promo codes
        .route("/promo-codes", post(promos::create_promo))
        .route("/promo-codes/validate", post(promos::validate_promo))
        .route("/promo-codes/:code", get(promos::get_promo));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .with_state(state)
}
