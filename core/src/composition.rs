//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on a subset of state
//!
//! Both compositions are atomic: when any part rejects the action, the
//! composed state is left exactly as it was before the action.
//!
//! # Examples
//!
//! ## Combining Scoped Reducers
//!
//! ```
//! use listkeeper_core::{Reducer, SmallVec, effect::Effect};
//! use listkeeper_core::composition::{combine_reducers, scope_reducer};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct AppState {
//!     count: i32,
//!     name: String,
//! }
//!
//! #[derive(Clone)]
//! enum AppAction {
//!     Increment,
//!     SetName(String),
//! }
//!
//! struct CounterReducer;
//! struct NameReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = i32;
//!     type Action = AppAction;
//!     type Environment = ();
//!     type Error = String;
//!
//!     fn reduce(&self, state: &mut i32, action: AppAction, _env: &()) -> Result<SmallVec<[Effect<AppAction>; 4]>, String> {
//!         if matches!(action, AppAction::Increment) {
//!             *state += 1;
//!         }
//!         Ok(SmallVec::new())
//!     }
//! }
//!
//! impl Reducer for NameReducer {
//!     type State = String;
//!     type Action = AppAction;
//!     type Environment = ();
//!     type Error = String;
//!
//!     fn reduce(&self, state: &mut String, action: AppAction, _env: &()) -> Result<SmallVec<[Effect<AppAction>; 4]>, String> {
//!         if let AppAction::SetName(name) = action {
//!             *state = name;
//!         }
//!         Ok(SmallVec::new())
//!     }
//! }
//!
//! let combined = combine_reducers(vec![
//!     Box::new(scope_reducer(CounterReducer, |s: &AppState| &s.count, |s: &mut AppState, c| s.count = c)),
//!     Box::new(scope_reducer(NameReducer, |s: &AppState| &s.name, |s: &mut AppState, n| s.name = n)),
//! ]);
//!
//! let mut state = AppState::default();
//! combined.reduce(&mut state, AppAction::Increment, &()).unwrap();
//! combined.reduce(&mut state, AppAction::SetName("groceries".into()), &()).unwrap();
//! assert_eq!(state, AppState { count: 1, name: "groceries".into() });
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Boxed reducer trait object accepted by [`combine_reducers`].
pub type BoxedReducer<S, A, E, Err> =
    Box<dyn Reducer<State = S, Action = A, Environment = E, Error = Err> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
/// If one reducer rejects the action, the state is rolled back to its value
/// before the first reducer ran and the error is returned.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
/// - `E`: The environment type
/// - `Err`: The shared error type
#[must_use]
pub fn combine_reducers<S, A, E, Err>(
    reducers: Vec<BoxedReducer<S, A, E, Err>>,
) -> CombinedReducer<S, A, E, Err>
where
    S: Clone + 'static,
    A: Clone + 'static,
    E: 'static,
    Err: 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E, Err>
where
    S: Clone + 'static,
    A: Clone + 'static,
    E: 'static,
    Err: 'static,
{
    reducers: Vec<BoxedReducer<S, A, E, Err>>,
}

impl<S, A, E, Err> CombinedReducer<S, A, E, Err>
where
    S: Clone + 'static,
    A: Clone + 'static,
    E: 'static,
    Err: 'static,
{
    /// Number of reducers in the combination
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Returns true if no reducers were combined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A, E, Err> Reducer for CombinedReducer<S, A, E, Err>
where
    S: Clone + 'static,
    A: Clone + 'static,
    E: 'static,
    Err: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;
    type Error = Err;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
        let checkpoint = state.clone();
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            match reducer.reduce(state, action.clone(), env) {
                Ok(effects) => all_effects.extend(effects),
                Err(error) => {
                    *state = checkpoint;
                    return Err(error);
                },
            }
        }

        Ok(all_effects)
    }
}

/// Scopes a reducer to operate on a subset of a larger state.
///
/// This allows you to reuse reducers designed for smaller state types
/// within a larger application state. The sub-state is written back only
/// when the inner reducer succeeds.
///
/// # Type Parameters
///
/// - `S`: The parent state type
/// - `SubS`: The child state type (subset of `S`)
/// - `A`: The action type
/// - `E`: The environment type
pub fn scope_reducer<S, SubS, A, E, R>(
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
) -> ScopedReducer<S, SubS, A, E, R>
where
    S: 'static,
    SubS: Clone + 'static,
    A: 'static,
    E: 'static,
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        _phantom: std::marker::PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, E, R>
where
    S: 'static,
    SubS: Clone + 'static,
    A: 'static,
    E: 'static,
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
    _phantom: std::marker::PhantomData<fn() -> (A, E)>,
}

impl<S, SubS, A, E, R> Reducer for ScopedReducer<S, SubS, A, E, R>
where
    S: 'static,
    SubS: Clone + 'static,
    A: 'static,
    E: 'static,
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    type State = S;
    type Action = A;
    type Environment = E;
    type Error = R::Error;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
        let mut sub_state = (self.get_state)(state).clone();

        let effects = self.reducer.reduce(&mut sub_state, action, env)?;

        (self.set_state)(state, sub_state);

        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct TestState {
        counter: i32,
        name: String,
    }

    #[derive(Clone)]
    enum TestAction {
        Increment,
        Decrement,
        SetName(String),
    }

    #[derive(Debug, PartialEq)]
    struct Rejected(&'static str);

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();
        type Error = Rejected;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
            match action {
                TestAction::Increment => {
                    state.counter += 1;
                    Ok(smallvec![Effect::None])
                },
                TestAction::Decrement => {
                    if state.counter == 0 {
                        return Err(Rejected("counter is already zero"));
                    }
                    state.counter -= 1;
                    Ok(smallvec![Effect::None])
                },
                TestAction::SetName(_) => Ok(SmallVec::new()),
            }
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();
        type Error = Rejected;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
            match action {
                TestAction::SetName(name) if name.is_empty() => Err(Rejected("empty name")),
                TestAction::SetName(name) => {
                    state.name = name;
                    Ok(SmallVec::new())
                },
                // Touches state even for actions it does not own, so rollback is observable
                TestAction::Increment | TestAction::Decrement => {
                    state.name.push('!');
                    Ok(SmallVec::new())
                },
            }
        }
    }

    #[test]
    fn test_combine_reducers() {
        let combined = combine_reducers(vec![Box::new(CounterReducer), Box::new(NameReducer)]);
        assert_eq!(combined.len(), 2);

        let mut state = TestState::default();

        let effects = combined.reduce(&mut state, TestAction::Increment, &());
        assert!(matches!(effects, Ok(ref e) if e.len() == 1));
        assert_eq!(state.counter, 1);

        let _ = combined.reduce(&mut state, TestAction::SetName("Alice".to_string()), &());
        assert_eq!(state.name, "Alice");
    }

    #[test]
    fn test_combine_reducers_rolls_back_on_error() {
        // NameReducer runs first and mutates, CounterReducer then rejects
        let combined = combine_reducers(vec![Box::new(NameReducer), Box::new(CounterReducer)]);
        let mut state = TestState {
            counter: 0,
            name: "before".to_string(),
        };

        let result = combined.reduce(&mut state, TestAction::Decrement, &());

        assert!(matches!(result, Err(Rejected("counter is already zero"))));
        assert_eq!(
            state,
            TestState {
                counter: 0,
                name: "before".to_string()
            }
        );
    }

    #[derive(Clone, Default, Debug, PartialEq)]
    struct SubState {
        value: i32,
    }

    #[derive(Clone)]
    enum SubAction {
        Add(i32),
        Divide(i32),
    }

    struct SubReducer;

    impl Reducer for SubReducer {
        type State = SubState;
        type Action = SubAction;
        type Environment = ();
        type Error = Rejected;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
            match action {
                SubAction::Add(n) => state.value += n,
                SubAction::Divide(0) => return Err(Rejected("division by zero")),
                SubAction::Divide(n) => state.value /= n,
            }
            Ok(SmallVec::new())
        }
    }

    #[derive(Clone, Default)]
    struct ParentState {
        sub: SubState,
        other: String,
    }

    #[test]
    fn test_scope_reducer() {
        let scoped = scope_reducer(
            SubReducer,
            |parent: &ParentState| &parent.sub,
            |parent: &mut ParentState, sub: SubState| {
                parent.sub = sub;
            },
        );

        let mut state = ParentState {
            sub: SubState { value: 5 },
            other: "test".to_string(),
        };

        let _ = scoped.reduce(&mut state, SubAction::Add(3), &());
        assert_eq!(state.sub.value, 8);
        assert_eq!(state.other, "test");

        let _ = scoped.reduce(&mut state, SubAction::Divide(2), &());
        assert_eq!(state.sub.value, 4);
    }

    #[test]
    fn test_scope_reducer_keeps_sub_state_on_error() {
        let scoped = scope_reducer(
            SubReducer,
            |parent: &ParentState| &parent.sub,
            |parent: &mut ParentState, sub: SubState| {
                parent.sub = sub;
            },
        );
        let mut state = ParentState {
            sub: SubState { value: 9 },
            other: String::new(),
        };

        let result = scoped.reduce(&mut state, SubAction::Divide(0), &());

        assert!(matches!(result, Err(Rejected("division by zero"))));
        assert_eq!(state.sub, SubState { value: 9 });
    }
}
