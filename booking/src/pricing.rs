//! Pricing engine.
//!
//! Seat prices depend only on the seat's class; the requested base price is
//! not consulted. Fee and tax are 10% each, rounded half-up to the cent.

use crate::types::{Money, PriceBreakdown, SeatNumber};
use serde::{Deserialize, Serialize};

/// Booking fee rate in basis points
pub const BOOKING_FEE_BPS: u64 = 1_000;

/// Tax rate in basis points
pub const TAX_BPS: u64 = 1_000;

const VIP_SEATS: [u8; 4] = [27, 28, 35, 36];

/// Seat classes, from the hall layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    /// Front row (seats 0-7)
    Premium,
    /// Centre block {27, 28, 35, 36}
    Vip,
    /// Back row pairs (seats 56+)
    Couple,
    /// Everything else
    Normal,
}

impl SeatClass {
    /// Class of a seat. VIP takes precedence over row rules.
    #[must_use]
    pub fn of(seat: SeatNumber) -> Self {
        let n = seat.value();
        if VIP_SEATS.contains(&n) {
            Self::Vip
        } else if n >= 56 {
            Self::Couple
        } else if n < 8 {
            Self::Premium
        } else {
            Self::Normal
        }
    }

    /// Price of one seat of this class
    #[must_use]
    pub const fn price(self) -> Money {
        match self {
            Self::Vip => Money::from_cents(2_500),
            Self::Couple => Money::from_cents(3_000),
            Self::Premium => Money::from_cents(1_500),
            Self::Normal => Money::from_cents(1_000),
        }
    }
}

/// Sum of the class prices of `seats`.
pub fn subtotal<'a>(seats: impl IntoIterator<Item = &'a SeatNumber>) -> Money {
    seats.into_iter().map(|seat| SeatClass::of(*seat).price()).sum()
}

/// Full breakdown for `seats` with `discount` already resolved.
///
/// Negative intermediates clamp to zero: first the taxable amount, then the
/// total.
pub fn price_breakdown<'a>(
    seats: impl IntoIterator<Item = &'a SeatNumber>,
    discount: Money,
) -> PriceBreakdown {
    let subtotal = subtotal(seats);
    let booking_fee = subtotal.basis_points(BOOKING_FEE_BPS);
    let gross = subtotal.saturating_add(booking_fee);
    let taxable = gross.saturating_sub(discount);
    let tax = taxable.basis_points(TAX_BPS);
    let total = gross.saturating_add(tax).saturating_sub(discount);

    PriceBreakdown {
        subtotal,
        booking_fee,
        tax,
        discount,
        total,
    }
}
