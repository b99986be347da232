//! Payment API endpoints.
//!
//! - POST /api/v1/payments/:order_id - Pay for a pending order
//! - GET /api/v1/payments/:order_id/status - Payment summary
//!
//! Methods are `"Card"` (needs `card_number`), `"E-Wallet"`, `"Cash"` and
//! `"Bank Transfer"`. A declined payment answers 402 and leaves the order
//! `PAYMENT_FAILED`.

#![allow(clippy::missing_errors_doc)] // Handlers return ApiError

use super::error::ApiError;
use crate::app::{PaymentStatus, PaymentSubmission};
use crate::server::state::AppState;
use crate::types::{Money, OrderId, OrderStatus};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response after a successful payment.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Always `true`
    pub success: bool,
    /// Paid order
    pub order_id: OrderId,
    /// `CONFIRMED`
    pub status: OrderStatus,
    /// Amount charged, in cents
    pub amount: Money,
    /// Gateway transaction id
    pub transaction_id: Option<String>,
    /// Booking reference
    pub booking_reference: Option<String>,
    /// QR image (base64)
    pub qr_image: Option<String>,
    /// Message for the user
    pub message: String,
}

/// Pay for an order.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/payments/<order_id> \
///   -H "Content-Type: application/json" \
///   -d '{"method": "Card", "card_number": "4242 4242 4242 4242",
///        "email": "jane@example.com"}'
/// ```
pub async fn process_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(submission): Json<PaymentSubmission>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let order = state
        .bookings
        .pay(OrderId::from_uuid(order_id), submission)
        .await?;

    Ok(Json(PaymentResponse {
        success: true,
        order_id: order.id,
        status: order.status,
        amount: order.pricing.total,
        transaction_id: order.payment.map(|p| p.transaction_id),
        booking_reference: order.ticket.as_ref().map(|t| t.booking_reference.clone()),
        qr_image: order.ticket.map(|t| t.qr_image),
        message: "Payment successful! Your booking is confirmed.".to_string(),
    }))
}

/// Payment summary of an order.
pub async fn payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<PaymentStatus>, ApiError> {
    Ok(Json(
        state
            .bookings
            .payment_status(OrderId::from_uuid(order_id))
            .await?,
    ))
}
