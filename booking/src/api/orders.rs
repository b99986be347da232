//! Order API endpoints.
//!
//! - POST /api/v1/orders - Place an order (PENDING)
//! - GET /api/v1/orders/:id - Booking details
//! - DELETE /api/v1/orders/:id - Cancel within the cancellation window
//! - POST /api/v1/orders/:id/send-email - Email the booking confirmation
//! - GET /api/v1/customers/:id/orders - Booking history, newest first
//! - GET /api/v1/customers/:id/orders/latest - Most recent order

#![allow(clippy::missing_errors_doc)] // Handlers return ApiError

use super::error::ApiError;
use crate::aggregates::NewOrder;
use crate::server::state::AppState;
use crate::types::{
    CustomerId, Money, MovieId, Order, OrderId, OrderStatus, PaymentMethod, PriceBreakdown,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response after placing an order.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderCreatedResponse {
    /// Always `true`
    pub success: bool,
    /// New order
    pub order_id: OrderId,
    /// `PENDING`
    pub status: OrderStatus,
    /// Price breakdown, in cents
    pub pricing: PriceBreakdown,
    /// Promo code that was applied
    pub promo_code: Option<String>,
}

/// Booking details.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Order
    pub order_id: OrderId,
    /// Customer
    pub customer_id: CustomerId,
    /// Movie
    pub movie_id: MovieId,
    /// Movie title
    pub title: String,
    /// Session label
    pub session: Option<String>,
    /// Seat numbers, ascending
    pub seats: Vec<u8>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Business order date
    pub order_date: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Price breakdown, in cents
    pub pricing: PriceBreakdown,
    /// Applied promo code
    pub promo_code: Option<String>,
    /// Gateway transaction id
    pub transaction_id: Option<String>,
    /// When paid
    pub paid_at: Option<DateTime<Utc>>,
    /// Payment method
    pub payment_method: Option<PaymentMethod>,
    /// Booking reference
    pub booking_reference: Option<String>,
    /// QR image (base64)
    pub qr_image: Option<String>,
    /// When cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            title: order.display_title(),
            order_id: order.id,
            customer_id: order.customer_id,
            movie_id: order.movie_id,
            session: order.session.map(|s| s.to_string()),
            seats: order.seats.iter().map(|s| s.value()).collect(),
            status: order.status,
            order_date: order.order_date,
            created_at: order.created_at,
            pricing: order.pricing,
            promo_code: order.promo_code,
            transaction_id: order.payment.as_ref().map(|p| p.transaction_id.clone()),
            paid_at: order.payment.as_ref().map(|p| p.paid_at),
            payment_method: order.payment.map(|p| p.method),
            booking_reference: order.ticket.as_ref().map(|t| t.booking_reference.clone()),
            qr_image: order.ticket.map(|t| t.qr_image),
            cancelled_at: order.cancelled_at,
        }
    }
}

/// Response after cancelling.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelOrderResponse {
    /// Always `true`
    pub success: bool,
    /// Cancelled order
    pub order_id: OrderId,
    /// Amount to refund, in cents
    pub refund_amount: Money,
    /// Message for the user
    pub message: String,
}

/// Request to email a booking confirmation.
#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    /// Recipient
    #[serde(default)]
    pub email: String,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Always `true`
    pub success: bool,
    /// Message for the user
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Place an order.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/orders \
///   -H "Content-Type: application/json" \
///   -d '{"customer_id": 1, "movie_id": 10, "session": "07:30 PM",
///        "seats": [1, 2], "promo_code": "SAVE10"}'
/// ```
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let order = state.bookings.create_order(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            success: true,
            order_id: order.id,
            status: order.status,
            pricing: order.pricing,
            promo_code: order.promo_code,
        }),
    ))
}

/// Booking details of an order.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.bookings.get_order(OrderId::from_uuid(order_id)).await?;
    Ok(Json(order.into()))
}

/// Cancel an order.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CancelOrderResponse>, ApiError> {
    let receipt = state.bookings.cancel(OrderId::from_uuid(order_id)).await?;
    Ok(Json(CancelOrderResponse {
        success: true,
        order_id: receipt.order_id,
        refund_amount: receipt.refund,
        message: format!("Order cancelled. {} will be refunded.", receipt.refund),
    }))
}

/// Email the booking confirmation of a confirmed order.
pub async fn send_confirmation_email(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .bookings
        .send_confirmation_email(OrderId::from_uuid(order_id), request.email)
        .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Booking confirmation email sent successfully".to_string(),
    }))
}

/// A customer's booking history, newest order date first.
pub async fn customer_history(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.bookings.history(CustomerId::new(customer_id)).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// A customer's most recent order.
pub async fn latest_order(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.bookings.latest_order(CustomerId::new(customer_id)).await?;
    Ok(Json(order.into()))
}
