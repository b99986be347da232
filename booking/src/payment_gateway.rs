//! Simulated payment gateway.
//!
//! There is no real processor behind this module. [`SimulatedPaymentGateway`]
//! approves or declines per payment method with configurable odds, which is
//! enough to drive the order lifecycle through both outcomes. A real
//! integration would implement [`PaymentGateway`] instead.

use crate::config::PaymentConfig;
use crate::types::{Money, PaymentMethod};
use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentGatewayError>;

/// Why a payment was not accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentGatewayError {
    /// Card number missing or malformed
    #[error("Invalid card: {reason}")]
    InvalidCard {
        /// What was wrong
        reason: String,
    },

    /// Processor said no
    #[error("Payment declined by {method}")]
    Declined {
        /// Method that was declined
        method: String,
    },

    /// Method not accepted at all
    #[error("Unsupported payment method: {method}")]
    UnsupportedMethod {
        /// Method as supplied
        method: String,
    },
}

/// A payment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// How the customer pays
    pub method: PaymentMethod,
    /// Card number, required for [`PaymentMethod::Card`]
    pub card_number: Option<String>,
    /// Amount to charge
    pub amount: Money,
}

/// Accepted payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Gateway transaction id
    pub transaction_id: String,
}

/// Payment gateway trait
pub trait PaymentGateway: Send + Sync {
    /// Attempt to charge `request.amount`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentGatewayError`] if the payment is not accepted.
    fn attempt(
        &self,
        request: PaymentRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentReceipt>> + Send + '_>>;
}

/// Transaction id: `TXN` + epoch millis + a number below 1000
#[must_use]
pub fn generate_transaction_id(rng: &mut impl Rng) -> String {
    format!("TXN{}{}", Utc::now().timestamp_millis(), rng.gen_range(0..1000))
}

/// Card numbers are accepted with spaces; 13 to 19 digits once cleaned.
fn validate_card(card_number: Option<&str>) -> GatewayResult<()> {
    let cleaned: String = card_number
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(PaymentGatewayError::InvalidCard {
            reason: "card number is required".to_string(),
        });
    }
    if !(13..=19).contains(&cleaned.len()) {
        return Err(PaymentGatewayError::InvalidCard {
            reason: format!("card number must have 13-19 digits (got {})", cleaned.len()),
        });
    }
    Ok(())
}

/// Probabilistic gateway.
///
/// | method        | outcome                          |
/// |---------------|----------------------------------|
/// | Card          | valid number, then `card_success_rate` |
/// | E-Wallet      | `ewallet_success_rate`           |
/// | Cash          | always (paid at the counter)     |
/// | Bank Transfer | always (settled later)           |
/// | anything else | never                            |
#[derive(Clone, Debug)]
pub struct SimulatedPaymentGateway {
    card_success_rate: f64,
    ewallet_success_rate: f64,
}

impl SimulatedPaymentGateway {
    /// Gateway with explicit success rates, clamped to `[0, 1]`
    #[must_use]
    pub fn new(card_success_rate: f64, ewallet_success_rate: f64) -> Self {
        Self {
            card_success_rate: card_success_rate.clamp(0.0, 1.0),
            ewallet_success_rate: ewallet_success_rate.clamp(0.0, 1.0),
        }
    }

    /// Gateway configured from [`PaymentConfig`]
    #[must_use]
    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(config.card_success_rate, config.ewallet_success_rate)
    }

    /// Gateway that approves every supported method
    #[must_use]
    pub fn always_approve() -> Self {
        Self::new(1.0, 1.0)
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(self) -> Arc<dyn PaymentGateway> {
        Arc::new(self)
    }

    fn decide(&self, request: &PaymentRequest, rng: &mut impl Rng) -> GatewayResult<()> {
        let approved = match &request.method {
            PaymentMethod::Card => {
                validate_card(request.card_number.as_deref())?;
                rng.gen_bool(self.card_success_rate)
            },
            PaymentMethod::EWallet => rng.gen_bool(self.ewallet_success_rate),
            PaymentMethod::Cash | PaymentMethod::BankTransfer => true,
            PaymentMethod::Unknown(name) => {
                return Err(PaymentGatewayError::UnsupportedMethod { method: name.clone() });
            },
        };

        if approved {
            Ok(())
        } else {
            Err(PaymentGatewayError::Declined {
                method: request.method.to_string(),
            })
        }
    }
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::from_config(&crate::config::Config::default().payments)
    }
}

impl PaymentGateway for SimulatedPaymentGateway {
    fn attempt(
        &self,
        request: PaymentRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentReceipt>> + Send + '_>> {
        let mut rng = rand::thread_rng();
        let outcome = self
            .decide(&request, &mut rng)
            .map(|()| PaymentReceipt {
                transaction_id: generate_transaction_id(&mut rng),
            });

        match &outcome {
            Ok(receipt) => tracing::info!(
                method = %request.method,
                amount = request.amount.cents(),
                transaction_id = %receipt.transaction_id,
                "Simulated payment approved"
            ),
            Err(error) => tracing::info!(
                method = %request.method,
                amount = request.amount.cents(),
                %error,
                "Simulated payment rejected"
            ),
        }

        Box::pin(async move { outcome })
    }
}
