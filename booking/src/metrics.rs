//! Business metrics for the booking system.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `cinema_orders_total{status}` - Orders by outcome (pending, cancelled, rejected)
//! - `cinema_payments_total{result}` - Payment attempts (succeeded, declined)
//! - `cinema_revenue_cents_total` - Revenue from confirmed orders in cents
//! - `cinema_refunds_cents_total` - Amount of cancelled orders in cents
//! - `cinema_seat_conflicts_total` - Placements rejected for occupied seats
//! - `cinema_promo_redemptions_total` - Orders placed with a promo applied
//!
//! ## Histograms
//! - `cinema_order_seats` - Seats per placed order

use metrics::{describe_counter, describe_histogram};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "cinema_orders_total",
        "Total number of orders by status (pending, cancelled, rejected)"
    );
    describe_histogram!("cinema_order_seats", "Seats per placed order");
    describe_counter!(
        "cinema_seat_conflicts_total",
        "Order placements rejected because a seat was already taken"
    );
    describe_counter!(
        "cinema_promo_redemptions_total",
        "Orders placed with a promo code applied"
    );

    describe_counter!(
        "cinema_payments_total",
        "Total number of payment attempts by result (succeeded, declined)"
    );
    describe_counter!(
        "cinema_revenue_cents_total",
        "Total revenue from confirmed orders in cents"
    );
    describe_counter!(
        "cinema_refunds_cents_total",
        "Total value of cancelled orders in cents"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a placed order.
///
/// # Arguments
///
/// * `seats` - Number of seats in the order
/// * `promo_applied` - Whether a promo discount was applied
#[allow(clippy::cast_precision_loss)]
pub fn record_order_placed(seats: usize, promo_applied: bool) {
    metrics::counter!("cinema_orders_total", "status" => "pending").increment(1);
    metrics::histogram!("cinema_order_seats").record(seats as f64);
    if promo_applied {
        metrics::counter!("cinema_promo_redemptions_total").increment(1);
    }
    tracing::debug!(seats, promo_applied, "Recorded order_placed metric");
}

/// Record a rejected command.
///
/// # Arguments
///
/// * `kind` - Error category (e.g., "validation", "conflict")
pub fn record_order_rejected(kind: &'static str) {
    metrics::counter!("cinema_orders_total", "status" => "rejected", "reason" => kind).increment(1);
    if kind == "conflict" {
        metrics::counter!("cinema_seat_conflicts_total").increment(1);
    }
    tracing::debug!(kind, "Recorded order_rejected metric");
}

/// Record a successful payment.
pub fn record_payment_succeeded(amount_cents: u64) {
    metrics::counter!("cinema_payments_total", "result" => "succeeded").increment(1);
    metrics::counter!("cinema_revenue_cents_total").increment(amount_cents);
    tracing::debug!(amount_cents, "Recorded payment_succeeded metric");
}

/// Record a declined payment.
pub fn record_payment_declined(method: String) {
    tracing::debug!(?method, "Recorded payment_declined metric");
    metrics::counter!("cinema_payments_total", "result" => "declined", "method" => method).increment(1);
}

/// Record a cancelled order.
pub fn record_order_cancelled(refund_cents: u64) {
    metrics::counter!("cinema_orders_total", "status" => "cancelled").increment(1);
    metrics::counter!("cinema_refunds_cents_total").increment(refund_cents);
    tracing::debug!(refund_cents, "Recorded order_cancelled metric");
}
