//! # Cinema Testing
//!
//! Test support for the cinema booking crates.
//!
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`assertions`]: effect assertion helpers
//!
//! ## Example
//!
//! ```ignore
//! use cinema_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(OrderReducer::new())
//!     .with_env(test_environment(test_clock()))
//!     .given_state(OrderState::new())
//!     .when_action(OrderAction::CancelOrder { order_id })
//!     .then_state(|state| assert!(state.last_error.is_some()))
//!     .run();
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Deterministic environment implementations.
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use cinema_core::environment::Clock;
    use std::sync::{Arc, PoisonError, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same instant until moved with [`FixedClock::advance`] or
    /// [`FixedClock::set`]. Clones share the same instant, so a test can keep
    /// a handle while the environment owns another.
    ///
    /// # Example
    ///
    /// ```
    /// use cinema_testing::mocks::FixedClock;
    /// use cinema_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let start = clock.now();
    /// assert_eq!(start, clock.now());
    ///
    /// clock.advance(Duration::hours(25));
    /// assert_eq!(clock.now() - start, Duration::hours(25));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward (or backward, for a negative duration).
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute instant.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 12:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_732_800, 0).unwrap_or_default())
    }
}

pub use mocks::{test_clock, FixedClock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cinema_core::environment::Clock;

    #[test]
    fn test_fixed_clock_is_stable() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_clones_share_time() {
        let clock = test_clock();
        let handle = clock.clone();
        handle.advance(Duration::minutes(90));

        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T13:30:00+00:00");

        handle.set(clock.now() - Duration::days(1));
        assert_eq!(clock.now().to_rfc3339(), "2024-12-31T13:30:00+00:00");
    }
}
