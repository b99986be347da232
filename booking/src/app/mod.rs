//! Application layer - the booking service the HTTP handlers call.

mod service;

pub use service::{
    BookingService, CancellationReceipt, PaymentStatus, PaymentSubmission, PromoDetails,
};
