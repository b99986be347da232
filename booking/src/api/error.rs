//! HTTP error type for booking handlers.
//!
//! Bridges [`BookingError`] to HTTP responses via Axum's `IntoResponse`.

use crate::error::BookingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Error returned by every handler.
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Order>, ApiError> {
///     Ok(Json(state.bookings.get_order(order_id).await?))
/// }
/// ```
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Detail logged for server errors, never sent to the client
    detail: Option<String>,
}

impl ApiError {
    /// Create a new API error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            detail: None,
        }
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    /// HTTP status of this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Error code of this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<BookingError> for ApiError {
    fn from(error: BookingError) -> Self {
        let message = error.to_string();
        match error {
            BookingError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
            BookingError::State(_) => Self::new(StatusCode::BAD_REQUEST, "INVALID_STATE", message),
            BookingError::WindowExpired(_) => {
                Self::new(StatusCode::BAD_REQUEST, "CANCELLATION_WINDOW_EXPIRED", message)
            },
            BookingError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
            BookingError::Conflict(_) => Self::new(StatusCode::CONFLICT, "CONFLICT", message),
            BookingError::PaymentDeclined(_) => {
                Self::new(StatusCode::PAYMENT_REQUIRED, "PAYMENT_DECLINED", message)
            },
            BookingError::Persistence(_) => {
                Self::internal("A storage error occurred. Please try again later.").with_detail(message)
            },
            BookingError::Internal(_) => Self::internal(message.clone()).with_detail(message),
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Always `false`
    success: bool,
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                detail = self.detail.as_deref().unwrap_or_default(),
                "Internal server error"
            );
        }

        let body = ErrorResponse {
            success: false,
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}
