//! Promo code API endpoints.
//!
//! - POST /api/v1/promo-codes - Create a code
//! - GET /api/v1/promo-codes/:code - Code details and current validity
//! - POST /api/v1/promo-codes/validate - Check a code before ordering

#![allow(clippy::missing_errors_doc)] // Handlers return ApiError

use super::error::ApiError;
use crate::app::PromoDetails;
use crate::promo::{NewPromoCode, PromoValidation};
use crate::server::state::AppState;
use crate::types::PromoCode;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

/// Request to validate a code.
#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    /// Code as typed
    #[serde(default)]
    pub code: String,
}

/// Create a promo code.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/promo-codes \
///   -H "Content-Type: application/json" \
///   -d '{"code": "save10", "discount": {"type": "PERCENTAGE", "percent": 10.0},
///        "usage_limit": 100}'
/// ```
pub async fn create_promo(
    State(state): State<AppState>,
    Json(request): Json<NewPromoCode>,
) -> Result<(StatusCode, Json<PromoCode>), ApiError> {
    let promo = state.bookings.create_promo(request).await?;
    Ok((StatusCode::CREATED, Json(promo)))
}

/// Promo code details.
pub async fn get_promo(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PromoDetails>, ApiError> {
    Ok(Json(state.bookings.get_promo(&code).await?))
}

/// Validate a promo code. Unknown or unusable codes answer 200 with
/// `valid: false` and the reason.
pub async fn validate_promo(
    State(state): State<AppState>,
    Json(request): Json<ValidatePromoRequest>,
) -> Result<Json<PromoValidation>, ApiError> {
    Ok(Json(state.bookings.validate_promo(&request.code).await?))
}
