//! # Cinema Runtime
//!
//! Request-scoped Store runtime for the cinema booking aggregates.
//!
//! A [`Store`] owns one aggregate state for the lifetime of a request. Sending
//! an action runs the reducer, executes the returned effects to completion,
//! and feeds every action those effects produce back into the reducer until
//! the system is quiescent. Only then does [`Store::send`] return, so the
//! caller can read the final state and persist it.
//!
//! ## Example
//!
//! ```ignore
//! use cinema_runtime::Store;
//!
//! let store = Store::new(order_state, OrderReducer::new(), env);
//! store.send(OrderAction::CancelOrder { order_id }).await?;
//! let cancelled = store.state(|s| s.get(&order_id).cloned()).await;
//! ```

use cinema_core::{effect::Effect, reducer::Reducer};
use futures::future::{join_all, BoxFuture};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store errors
pub mod error {
    use thiserror::Error;

    /// Why a `send` could not finish
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Effects kept producing actions past the configured limit.
        ///
        /// Guards against a reducer that answers its own feedback forever.
        #[error("Feedback limit of {limit} actions exceeded")]
        FeedbackLimitExceeded {
            /// Maximum number of actions processed per `send`
            limit: usize,
        },
    }
}

pub use error::StoreError;

/// Default cap on actions processed by one `send` (the command plus feedback).
pub const DEFAULT_FEEDBACK_LIMIT: usize = 32;

/// Runs reducer `R` over state `S`, executing effects and feeding their
/// actions back until nothing is left to do.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    feedback_limit: usize,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync,
    A: Send + 'static,
    S: Send + Sync,
    E: Send + Sync,
{
    /// Store over `initial_state` with the default feedback limit
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            feedback_limit: DEFAULT_FEEDBACK_LIMIT,
        }
    }

    /// Override the maximum number of actions processed per `send`.
    #[must_use]
    pub const fn with_feedback_limit(mut self, limit: usize) -> Self {
        self.feedback_limit = limit;
        self
    }

    /// Send an action and drive all resulting effects to completion.
    ///
    /// Returns the number of actions reduced (the sent action included).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::FeedbackLimitExceeded`] if effects keep producing
    /// actions beyond the feedback limit. State changes made up to that point
    /// are kept.
    pub async fn send(&self, action: A) -> Result<usize, StoreError> {
        let mut queue = VecDeque::from([action]);
        let mut processed = 0;

        while let Some(next) = queue.pop_front() {
            if processed == self.feedback_limit {
                tracing::error!(limit = self.feedback_limit, "Store feedback limit exceeded");
                return Err(StoreError::FeedbackLimitExceeded {
                    limit: self.feedback_limit,
                });
            }
            processed += 1;

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, next, &self.environment)
            };

            for effect in effects {
                queue.extend(execute(effect).await);
            }
        }

        Ok(processed)
    }

    /// Read from the current state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Consume the store and return its final state.
    pub async fn into_state(self) -> S
    where
        S: Clone,
    {
        match Arc::try_unwrap(self.state) {
            Ok(lock) => lock.into_inner(),
            Err(shared) => shared.read().await.clone(),
        }
    }
}

/// Execute one effect tree, returning the actions it produced in order.
fn execute<A>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>>
where
    A: Send + 'static,
{
    Box::pin(async move {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                Vec::new()
            },
            Effect::Future(fut) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                fut.await.into_iter().collect()
            },
            Effect::Parallel(effects) => {
                metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                join_all(effects.into_iter().map(execute))
                    .await
                    .into_iter()
                    .flatten()
                    .collect()
            },
            Effect::Sequential(effects) => {
                metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                let mut produced = Vec::new();
                for effect in effects {
                    produced.extend(execute(effect).await);
                }
                produced
            },
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cinema_core::{effect::Effect, reducer::Effects, smallvec, SmallVec};

    #[derive(Clone, Debug, Default)]
    struct Tally {
        log: Vec<&'static str>,
    }

    #[derive(Clone, Debug)]
    enum TallyAction {
        Start,
        Fork,
        Echo,
        Left,
        Right,
        Done,
    }

    struct TallyReducer;

    impl Reducer for TallyReducer {
        type State = Tally;
        type Action = TallyAction;
        type Environment = ();

        fn reduce(&self, state: &mut Tally, action: TallyAction, _env: &()) -> Effects<TallyAction> {
            match action {
                TallyAction::Start => {
                    state.log.push("start");
                    smallvec![Effect::future(async { Some(TallyAction::Done) })]
                },
                TallyAction::Fork => {
                    state.log.push("fork");
                    smallvec![Effect::chain(vec![
                        Effect::future(async { Some(TallyAction::Left) }),
                        Effect::None,
                        Effect::future(async { Some(TallyAction::Right) }),
                    ])]
                },
                TallyAction::Echo => {
                    state.log.push("echo");
                    smallvec![Effect::future(async { Some(TallyAction::Echo) })]
                },
                TallyAction::Left => {
                    state.log.push("left");
                    SmallVec::new()
                },
                TallyAction::Right => {
                    state.log.push("right");
                    SmallVec::new()
                },
                TallyAction::Done => {
                    state.log.push("done");
                    SmallVec::new()
                },
            }
        }
    }

    #[tokio::test]
    async fn test_feedback_is_reduced_before_send_returns() {
        let store = Store::new(Tally::default(), TallyReducer, ());
        let processed = store.send(TallyAction::Start).await.unwrap();

        assert_eq!(processed, 2);
        assert_eq!(store.state(|s| s.log.clone()).await, vec!["start", "done"]);
    }

    #[tokio::test]
    async fn test_sequential_feedback_keeps_order() {
        let store = Store::new(Tally::default(), TallyReducer, ());
        store.send(TallyAction::Fork).await.unwrap();

        let state = store.into_state().await;
        assert_eq!(state.log, vec!["fork", "left", "right"]);
    }

    #[tokio::test]
    async fn test_feedback_limit_stops_runaway_loops() {
        let store = Store::new(Tally::default(), TallyReducer, ()).with_feedback_limit(5);
        let result = store.send(TallyAction::Echo).await;

        assert_eq!(result, Err(StoreError::FeedbackLimitExceeded { limit: 5 }));
        assert_eq!(store.state(|s| s.log.len()).await, 5);
    }
}
