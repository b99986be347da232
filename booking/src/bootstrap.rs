//! Resource setup: builds the order environment from configuration.
//!
//! ```rust,ignore
//! let config = Config::from_env();
//! let env = build_environment(&config).await?;
//! let bookings = Arc::new(BookingService::new(env));
//! ```

use crate::aggregates::OrderEnvironment;
use crate::config::{Config, StorageBackend};
use crate::payment_gateway::SimulatedPaymentGateway;
use crate::persistence::{
    postgres, PostgresOrderRepository, PostgresPromoCodeStore, PostgresSeatLedger, StoreError,
};
use crate::session_policy;
use crate::ticketing::Base64QrTicketing;
use cinema_core::environment::SystemClock;
use std::sync::Arc;
use tracing::info;

/// Build the environment for the configured storage backend.
///
/// For `postgres`, connects the pool and runs the embedded migrations first.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the database cannot be reached or
/// migrated.
pub async fn build_environment(config: &Config) -> Result<OrderEnvironment, StoreError> {
    let gateway = SimulatedPaymentGateway::from_config(&config.payments).shared();
    let mut env = OrderEnvironment::in_memory(Arc::new(SystemClock), gateway);

    if config.storage == StorageBackend::Postgres {
        info!("Connecting to booking database...");
        let pool = postgres::connect(&config.database).await?;
        postgres::run_migrations(&pool).await?;
        info!("Booking database connected and migrated");

        env.orders = Arc::new(PostgresOrderRepository::new(pool.clone()));
        env.ledger = Arc::new(PostgresSeatLedger::new(pool.clone()));
        env.promos = Arc::new(PostgresPromoCodeStore::new(pool));
    } else {
        info!("Using in-memory storage; bookings are lost on restart");
    }

    env.ticketing = Arc::new(Base64QrTicketing::new(
        config.booking.hall_name.clone(),
        config.booking.qr_size,
    ));
    env.session_policy = session_policy::from_config(&config.booking);
    env.cancellation_window = chrono::Duration::hours(config.booking.cancellation_window_hours);

    info!(
        storage = ?config.storage,
        session_policy = ?config.booking.session_policy,
        cancellation_window_hours = config.booking.cancellation_window_hours,
        "Booking environment ready"
    );
    Ok(env)
}
