//! Promo engine: validation, discount calculation and usage accounting.
//!
//! Codes are matched case-insensitively by normalising to upper case. Checks
//! short-circuit in a fixed order (found, active, not expired, under the usage
//! limit) and each failure has its own message.

use crate::error::BookingError;
use crate::types::{DiscountKind, Money, PromoCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned for an accepted code
pub const PROMO_APPLIED: &str = "Promo code applied successfully!";

/// Canonical form of a promo code
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Why a promo code cannot be applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromoRejection {
    /// Blank code
    Missing,
    /// No such code
    NotFound,
    /// Switched off
    Inactive,
    /// Past its expiry date
    Expired,
    /// Usage limit reached
    UsageLimitReached,
}

impl PromoRejection {
    /// Customer-facing reason
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Missing => "Promo code is required",
            Self::NotFound => "Invalid promo code",
            Self::Inactive => "This promo code is no longer active",
            Self::Expired => "This promo code has expired",
            Self::UsageLimitReached => "This promo code has reached its usage limit",
        }
    }
}

impl fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl PromoCode {
    /// Checks active, expiry and usage limit, in that order.
    ///
    /// # Errors
    ///
    /// Returns the first rule the code fails.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), PromoRejection> {
        if !self.active {
            return Err(PromoRejection::Inactive);
        }
        if self.expires_at.is_some_and(|expiry| now > expiry) {
            return Err(PromoRejection::Expired);
        }
        if self.limit_reached() {
            return Err(PromoRejection::UsageLimitReached);
        }
        Ok(())
    }

    /// Whether the code can be applied at `now`
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.check(now).is_ok()
    }

    /// `usage_limit > 0 && used_count >= usage_limit`
    #[must_use]
    pub const fn limit_reached(&self) -> bool {
        self.usage_limit > 0 && self.used_count >= self.usage_limit
    }

    /// Discount against `subtotal`. Fixed amounts are not scaled.
    ///
    /// Callers validate first; this does not re-check validity.
    #[must_use]
    pub fn discount_for(&self, subtotal: Money) -> Money {
        match self.discount {
            DiscountKind::Percentage { percent } => subtotal.basis_points(percent_to_bps(percent)),
            DiscountKind::FixedAmount { amount } => amount,
        }
    }

    /// Counts one redemption. Returns `false`, leaving the count untouched,
    /// if the limit is already reached.
    pub fn record_usage(&mut self) -> bool {
        if self.limit_reached() {
            return false;
        }
        self.used_count += 1;
        true
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_to_bps(percent: f64) -> u64 {
    (percent.clamp(0.0, 100.0) * 100.0).round() as u64
}

/// Validates a code the customer typed against what the store returned.
///
/// # Errors
///
/// Returns the first failing rule.
pub fn validate<'a>(
    code: &str,
    found: Option<&'a PromoCode>,
    now: DateTime<Utc>,
) -> Result<&'a PromoCode, PromoRejection> {
    if code.trim().is_empty() {
        return Err(PromoRejection::Missing);
    }
    let promo = found.ok_or(PromoRejection::NotFound)?;
    promo.check(now)?;
    Ok(promo)
}

/// Result of the validate-promo operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromoValidation {
    /// Whether the code can be applied now
    pub valid: bool,
    /// Reason or success message
    pub message: String,
    /// Code details when valid
    pub promo: Option<PromoCode>,
}

impl PromoValidation {
    /// Accepted code
    #[must_use]
    pub fn accepted(promo: PromoCode) -> Self {
        Self {
            valid: true,
            message: PROMO_APPLIED.to_string(),
            promo: Some(promo),
        }
    }

    /// Rejected code
    #[must_use]
    pub fn rejected(reason: PromoRejection) -> Self {
        Self {
            valid: false,
            message: reason.message().to_string(),
            promo: None,
        }
    }
}

/// Administrative request to create a promo code
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPromoCode {
    /// Code as typed; stored upper-cased
    pub code: String,
    /// Discount granted
    pub discount: DiscountKind,
    /// Optional expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Maximum redemptions (0 = unlimited)
    #[serde(default)]
    pub usage_limit: u32,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPromoCode {
    /// Validates the request and builds the stored code.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for a blank code or a percentage
    /// outside `(0, 100]`.
    pub fn into_promo(self, now: DateTime<Utc>) -> Result<PromoCode, BookingError> {
        let code = normalize_code(&self.code);
        if code.is_empty() {
            return Err(BookingError::Validation(PromoRejection::Missing.message().to_string()));
        }
        if let DiscountKind::Percentage { percent } = self.discount {
            if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
                return Err(BookingError::Validation(format!(
                    "Percentage discount must be greater than 0 and at most 100 (got {percent})"
                )));
            }
        }

        Ok(PromoCode {
            code,
            discount: self.discount,
            expires_at: self.expires_at,
            usage_limit: self.usage_limit,
            used_count: 0,
            active: true,
            description: self.description,
            created_at: now,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cinema_core::environment::Clock;
    use cinema_testing::test_clock;

    fn promo(discount: DiscountKind) -> PromoCode {
        NewPromoCode {
            code: " save10 ".to_string(),
            discount,
            expires_at: None,
            usage_limit: 0,
            description: None,
        }
        .into_promo(test_clock().now())
        .unwrap()
    }

    #[test]
    fn test_code_is_normalised() {
        assert_eq!(promo(DiscountKind::Percentage { percent: 10.0 }).code, "SAVE10");
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        let now = test_clock().now();
        let mut code = promo(DiscountKind::Percentage { percent: 10.0 });
        code.active = false;
        code.expires_at = Some(now - Duration::days(1));
        code.usage_limit = 1;
        code.used_count = 1;

        assert_eq!(validate("SAVE10", Some(&code), now), Err(PromoRejection::Inactive));
        code.active = true;
        assert_eq!(validate("SAVE10", Some(&code), now), Err(PromoRejection::Expired));
        code.expires_at = Some(now);
        assert_eq!(validate("SAVE10", Some(&code), now), Err(PromoRejection::UsageLimitReached));
        code.usage_limit = 0;
        assert!(validate("SAVE10", Some(&code), now).is_ok());

        assert_eq!(validate("  ", Some(&code), now), Err(PromoRejection::Missing));
        assert_eq!(validate("NOPE", None, now), Err(PromoRejection::NotFound));
    }

    #[test]
    fn test_discount_calculation() {
        let subtotal = Money::from_cents(3_000);
        let pct = promo(DiscountKind::Percentage { percent: 10.0 });
        assert_eq!(pct.discount_for(subtotal), Money::from_cents(300));

        let fixed = promo(DiscountKind::FixedAmount { amount: Money::from_dollars(5) });
        assert_eq!(fixed.discount_for(subtotal), Money::from_cents(500));
        assert_eq!(fixed.discount_for(Money::from_cents(100)), Money::from_cents(500));
    }

    #[test]
    fn test_usage_stops_at_limit() {
        let mut code = promo(DiscountKind::Percentage { percent: 50.0 });
        code.usage_limit = 2;

        assert!(code.record_usage());
        assert!(code.record_usage());
        assert!(!code.record_usage());
        assert_eq!(code.used_count, 2);
        assert_eq!(code.check(test_clock().now()), Err(PromoRejection::UsageLimitReached));
    }

    #[test]
    fn test_rejects_out_of_range_percentages() {
        for percent in [0.0, -5.0, 100.5, f64::NAN] {
            let request = NewPromoCode {
                code: "BAD".to_string(),
                discount: DiscountKind::Percentage { percent },
                expires_at: None,
                usage_limit: 0,
                description: None,
            };
            assert!(matches!(
                request.into_promo(test_clock().now()),
                Err(BookingError::Validation(_))
            ));
        }
    }
}
