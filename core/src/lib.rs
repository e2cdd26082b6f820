//! # Listkeeper Core
//!
//! Core traits and types for the Listkeeper state engine.
//!
//! This crate provides the fundamental abstractions for building a
//! client-side state layer with the Reducer pattern: state lives in one
//! owned value, every mutation goes through a reducer, and side effects
//! (persistence, cross-instance broadcast) are returned as descriptions for
//! the runtime to execute.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer (commands and lifecycle signals)
//! - **Reducer**: Pure function `(State, Action, Environment) → Result<Effects, Error>`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies (storage, sync bus)
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Failed preconditions reject the action and leave state untouched
//!
//! ## Example
//!
//! ```
//! use listkeeper_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct CounterState {
//!     count: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! #[derive(Debug)]
//! struct Underflow;
//!
//! impl std::fmt::Display for Underflow {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "counter cannot go below zero")
//!     }
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!     type Error = Underflow;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> Result<SmallVec<[Effect<CounterAction>; 4]>, Underflow> {
//!         match action {
//!             CounterAction::Increment => state.count += 1,
//!             CounterAction::Decrement => {
//!                 state.count = state.count.checked_sub(1).ok_or(Underflow)?;
//!             }
//!         }
//!         Ok(SmallVec::new())
//!     }
//! }
//!
//! let mut state = CounterState::default();
//! assert!(CounterReducer.reduce(&mut state, CounterAction::Decrement, &()).is_err());
//! assert_eq!(state.count, 0);
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub use effect::Effect;
pub use reducer::Reducer;

/// Reducer composition utilities (`combine_reducers`, `scope_reducer`)
pub mod composition;

/// Durable key-value storage abstraction used for persistence
pub mod storage;

/// Publish/subscribe abstraction for mirroring commands across instances
pub mod sync_bus;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
///
/// They contain all business logic and are deterministic and testable. A
/// reducer that cannot apply an action (for example because an index is out
/// of bounds) returns an error and must leave the state exactly as it found
/// it.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Error`: Why an action was rejected
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for TodoListsReducer {
    ///     type State = Vec<Arc<TodoList>>;
    ///     type Action = AppAction;
    ///     type Environment = AppEnvironment;
    ///     type Error = TodoError;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut Self::State,
    ///         action: AppAction,
    ///         env: &AppEnvironment,
    ///     ) -> Result<SmallVec<[Effect<AppAction>; 4]>, TodoError> {
    ///         match action {
    ///             AppAction::AddList { name, description } => {
    ///                 state.push(Arc::new(TodoList::new(name, description)));
    ///                 Ok(SmallVec::new())
    ///             }
    ///             _ => Ok(SmallVec::new()),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// The error returned when an action violates a precondition
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action cannot be applied. The state
        /// must be unchanged in that case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently; the effect completes when all of them have
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another, each starting after the previous one completed
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
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
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap a future that produces no follow-up action
        #[must_use]
        pub fn fire_and_forget<F>(future: F) -> Effect<Action>
        where
            F: Future<Output = ()> + Send + 'static,
        {
            Effect::Future(Box::pin(async move {
                future.await;
                None
            }))
        }

        /// Returns true if executing this effect does nothing
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

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn noop_detection_walks_nested_effects() {
        let nested: Effect<()> = Effect::chain(vec![Effect::None, Effect::merge(vec![])]);
        assert!(nested.is_noop());

        let with_future: Effect<()> =
            Effect::chain(vec![Effect::None, Effect::fire_and_forget(async {})]);
        assert!(!with_future.is_noop());
    }

    #[test]
    fn debug_hides_future_body() {
        let effect: Effect<u8> = Effect::fire_and_forget(async {});
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }
}
