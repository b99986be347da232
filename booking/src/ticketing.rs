//! Ticketing and notification collaborators.
//!
//! Issued only for confirmed orders: a booking reference, the QR payload
//! printed on the ticket, the rendered QR image, and the confirmation email.

use crate::types::{Money, Order, Ticket};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tracing::info;

/// Ticketing failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    /// The QR image could not be produced
    #[error("QR rendering failed: {0}")]
    Render(String),
}

/// Confirmation email delivery failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailerError {
    /// The transport rejected or dropped the message
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// `BK-yyyyMMdd-NNNN`, `NNNN` a random zero-padded number
#[must_use]
pub fn generate_booking_reference(at: DateTime<Utc>, rng: &mut impl Rng) -> String {
    format!("BK-{}-{:04}", at.format("%Y%m%d"), rng.gen_range(0..10_000))
}

/// Issues booking references and QR codes
pub trait Ticketing: Send + Sync {
    /// Fresh booking reference for an order paid at `at`
    fn booking_reference(&self, at: DateTime<Utc>) -> String;

    /// Text encoded in the QR code
    fn build_qr_payload(
        &self,
        booking_reference: &str,
        title: &str,
        session: &str,
        seats: &str,
        hall: &str,
    ) -> String;

    /// Render `payload` as an image, returned as text
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Render`] if rendering fails.
    fn render_qr(&self, payload: &str, width: u32, height: u32) -> Result<String, TicketingError>;

    /// Hall printed on tickets
    fn hall_name(&self) -> &str;

    /// QR edge length in pixels
    fn qr_size(&self) -> u32;

    /// Reference, payload and image for `order`
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError`] if the QR image cannot be rendered.
    fn issue(&self, order: &Order, at: DateTime<Utc>) -> Result<Ticket, TicketingError> {
        let booking_reference = self.booking_reference(at);
        let session = order.session.as_ref().map_or("N/A", |s| s.as_str());
        let qr_payload = self.build_qr_payload(
            &booking_reference,
            &order.display_title(),
            session,
            &order.seat_list(),
            self.hall_name(),
        );
        let size = self.qr_size();
        let qr_image = self.render_qr(&qr_payload, size, size)?;

        Ok(Ticket {
            booking_reference,
            qr_payload,
            qr_image,
        })
    }
}

/// Ticketing without a raster backend: the "image" is the base64 encoding of
/// the payload text, which scanner apps decode back to the same lines.
#[derive(Clone, Debug)]
pub struct Base64QrTicketing {
    hall_name: String,
    qr_size: u32,
}

impl Base64QrTicketing {
    /// Ticketing for `hall_name` with square QR codes of `qr_size` pixels
    #[must_use]
    pub fn new(hall_name: impl Into<String>, qr_size: u32) -> Self {
        Self {
            hall_name: hall_name.into(),
            qr_size,
        }
    }
}

impl Default for Base64QrTicketing {
    fn default() -> Self {
        Self::new("Hall 1", 300)
    }
}

impl Ticketing for Base64QrTicketing {
    fn booking_reference(&self, at: DateTime<Utc>) -> String {
        generate_booking_reference(at, &mut rand::thread_rng())
    }

    fn build_qr_payload(
        &self,
        booking_reference: &str,
        title: &str,
        session: &str,
        seats: &str,
        hall: &str,
    ) -> String {
        format!("BOOKING REF: {booking_reference}\nMOVIE: {title}\nSESSION: {session}\nSEATS: {seats}\nHALL: {hall}")
    }

    fn render_qr(&self, payload: &str, width: u32, height: u32) -> Result<String, TicketingError> {
        if width == 0 || height == 0 {
            return Err(TicketingError::Render(format!("invalid QR size {width}x{height}")));
        }
        Ok(BASE64.encode(payload.as_bytes()))
    }

    fn hall_name(&self) -> &str {
        &self.hall_name
    }

    fn qr_size(&self) -> u32 {
        self.qr_size
    }
}

/// Everything the confirmation email shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingConfirmation {
    /// Recipient
    pub email: String,
    /// Booking reference
    pub booking_reference: String,
    /// Movie title
    pub title: String,
    /// Session label
    pub session: String,
    /// Seats, comma-separated
    pub seats: String,
    /// Amount paid
    pub total: Money,
    /// Rendered QR image
    pub qr_image: String,
}

impl BookingConfirmation {
    /// Confirmation for a paid order. `None` if the order has no ticket.
    #[must_use]
    pub fn for_order(order: &Order, email: impl Into<String>) -> Option<Self> {
        let ticket = order.ticket.as_ref()?;
        Some(Self {
            email: email.into(),
            booking_reference: ticket.booking_reference.clone(),
            title: order.display_title(),
            session: order
                .session
                .as_ref()
                .map_or_else(|| "N/A".to_string(), ToString::to_string),
            seats: order.seat_list(),
            total: order.pricing.total,
            qr_image: ticket.qr_image.clone(),
        })
    }
}

/// Sends booking confirmation emails
pub trait Mailer: Send + Sync {
    /// Deliver the confirmation
    ///
    /// # Errors
    ///
    /// Returns [`MailerError`] if delivery fails.
    fn send_confirmation(
        &self,
        confirmation: BookingConfirmation,
    ) -> Pin<Box<dyn Future<Output = Result<(), MailerError>> + Send + '_>>;
}

/// Logs emails instead of sending them.
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    /// Create a new console mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Mailer for ConsoleMailer {
    fn send_confirmation(
        &self,
        confirmation: BookingConfirmation,
    ) -> Pin<Box<dyn Future<Output = Result<(), MailerError>> + Send + '_>> {
        Box::pin(async move {
            info!(
                to = %confirmation.email,
                booking_reference = %confirmation.booking_reference,
                movie = %confirmation.title,
                session = %confirmation.session,
                seats = %confirmation.seats,
                total = %confirmation.total,
                qr_bytes = confirmation.qr_image.len(),
                "Booking confirmation email (console)"
            );
            Ok(())
        })
    }
}

/// Email shape check: `local@domain.tld`, local part of letters, digits and
/// `+_.-`, domain of letters, digits, dots and hyphens, alphabetic TLD of at
/// least two characters.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-'));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}
