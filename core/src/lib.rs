//! # Cinema Core
//!
//! Core traits and types shared by the cinema booking aggregates.
//!
//! Every aggregate (seat ledger bookkeeping, orders, promo codes) is written as a
//! reducer: a pure function `(State, Action, Environment) → (State, Effects)`.
//! I/O never happens inside a reducer; it is described as an [`effect::Effect`]
//! and executed by the runtime, which feeds any resulting action back in.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for one request-scoped aggregate instance
//! - **Action**: Commands (intent) and events (facts) in a single enum
//! - **Reducer**: Validates a command, applies events, returns effects
//! - **Effect**: Description of a side effect (ledger write, gateway call, email)
//! - **Environment**: Collaborators injected behind traits (clock, stores, gateway)
//!
//! ## Example
//!
//! ```ignore
//! use cinema_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for PromoReducer {
//!     type State = PromoState;
//!     type Action = PromoAction;
//!     type Environment = PromoEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut PromoState,
//!         action: PromoAction,
//!         env: &PromoEnvironment,
//!     ) -> SmallVec<[Effect<PromoAction>; 4]> {
//!         SmallVec::new()
//!     }
//! }
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the core trait for business logic.
///
/// Reducers are deterministic: given the same state, action and environment
/// answers they produce the same new state and the same effect descriptions.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Effects returned from a single `reduce` call.
    ///
    /// Most transitions produce zero, one or two effects, so four inline slots
    /// avoid a heap allocation on the hot path.
    pub type Effects<A> = SmallVec<[Effect<A>; 4]>;

    /// Business logic of one aggregate.
    ///
    /// Implementations hold no mutable state of their own; everything they
    /// touch arrives through `state` and `env`.
    pub trait Reducer {
        /// Aggregate state, mutated in place
        type State;

        /// Commands and events accepted by the aggregate
        type Action;

        /// Collaborators (clock, stores, gateways)
        type Environment;

        /// Handle one action.
        ///
        /// Commands are validated against `state`; accepted events are applied
        /// to it. Anything that needs I/O is returned as an effect.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects<Self::Action>;
    }
}

/// Effect module - side effect descriptions.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future produced by an [`Effect::Future`].
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// A side effect requested by a reducer, run later by the `Store`.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Children run concurrently
        Parallel(Vec<Effect<Action>>),

        /// Children run in order; each finishes before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Async work whose `Some(action)` result is reduced next
        Future(EffectFuture<Action>),
    }

    // Futures have no Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Run `effects` concurrently
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Run `effects` in order
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap an async block as an effect.
        #[must_use]
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Returns true if executing this effect does nothing.
        #[must_use]
        pub fn is_noop(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_noop)
                },
                Effect::Future(_) => false,
            }
        }
    }
}

/// Environment module - dependency injection traits shared by all aggregates.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time.
    ///
    /// Production code uses [`SystemClock`]; tests pin time with a fixed clock
    /// so that cancellation windows and promo expiry are deterministic.
    pub trait Clock: Send + Sync {
        /// Current instant, UTC
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
