//! Whether a session can still be booked.

use crate::config::{BookingConfig, SessionPolicyKind};
use crate::types::SessionKey;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;

/// Session start-time rule applied when an order is placed
pub trait SessionPolicy: Send + Sync {
    /// `false` if `session` can no longer be booked at `now`
    fn is_open(&self, session: &SessionKey, now: DateTime<Utc>) -> bool;
}

/// Every session is bookable.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissiveSessionPolicy;

impl SessionPolicy for PermissiveSessionPolicy {
    fn is_open(&self, _session: &SessionKey, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Session keys like `"07:30 PM"` are read as today's start time; booking
/// closes `grace` after the start. Keys that are not a time stay open.
#[derive(Clone, Copy, Debug)]
pub struct GraceWindowSessionPolicy {
    grace: Duration,
}

impl GraceWindowSessionPolicy {
    /// Policy allowing bookings up to `grace` after the start
    #[must_use]
    pub const fn new(grace: Duration) -> Self {
        Self { grace }
    }
}

impl SessionPolicy for GraceWindowSessionPolicy {
    fn is_open(&self, session: &SessionKey, now: DateTime<Utc>) -> bool {
        let Ok(start_time) = NaiveTime::parse_from_str(session.as_str().trim(), "%I:%M %p") else {
            tracing::debug!(session = %session, "Session key is not a start time, allowing booking");
            return true;
        };
        let start = now.date_naive().and_time(start_time).and_utc();
        now - start <= self.grace
    }
}

/// Policy selected by configuration
#[must_use]
pub fn from_config(config: &BookingConfig) -> Arc<dyn SessionPolicy> {
    match config.session_policy {
        SessionPolicyKind::Permissive => Arc::new(PermissiveSessionPolicy),
        SessionPolicyKind::GraceWindow => Arc::new(GraceWindowSessionPolicy::new(Duration::minutes(
            config.session_grace_minutes,
        ))),
    }
}
