//! # Unistore Core
//!
//! Core traits and types for a unidirectional state container.
//!
//! A store holds a single state value that only changes through an ordered
//! chain of pure reducers. Every action first passes a chain of middlewares
//! (side effects only), then folds through the reducers, and the result is
//! published to observers.
//!
//! ## Core Concepts
//!
//! - **State**: The whole application state for one store. Absent until the
//!   first action produces one.
//! - **Action**: An intent to change state, either available now
//!   ([`Action::Sync`]) or produced over time ([`Action::Async`]).
//! - **Reducer**: Pure function `(Option<&State>, &Action) → State`
//! - **Middleware**: Side-effect observer `(Option<&State>, &Action) → ()`
//!
//! ## Example
//!
//! ```
//! use unistore_core::{reducer::Reducer, reducer_fn};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Deposit {
//!     amount: i64,
//! }
//!
//! let balance = reducer_fn(|state: Option<&i64>, action: &Deposit| {
//!     state.copied().unwrap_or(0) + action.amount
//! });
//!
//! assert_eq!(balance.reduce(None, &Deposit { amount: 5 }), 5);
//! assert_eq!(balance.reduce(Some(&5), &Deposit { amount: 2 }), 7);
//! ```

use std::marker::PhantomData;

/// Action shapes and the producer stream type
pub mod action;

/// Reducer composition utilities
pub mod composition;

/// Error types shared by the store and its handles
pub mod error;

pub use action::{Action, ActionStream};
pub use error::{DispatchError, ProducerError};
pub use middleware::{BoxMiddleware, Dispatch, Middleware};
pub use reducer::{BoxReducer, Reducer};

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(Option<&State>, &Action) → State`
///
/// They contain all state-transition logic and are deterministic and testable.
pub mod reducer {
    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state type this reducer produces
    /// - `Action`: The action type this reducer processes
    ///
    /// # Contract
    ///
    /// A reducer must be total: it accepts an absent state (before the
    /// store's first publish) and every reachable action, and it must not
    /// panic or perform side effects. Returning a value equal to the input
    /// is allowed and still counts as a new state.
    ///
    /// # Example
    ///
    /// ```
    /// use unistore_core::reducer::Reducer;
    ///
    /// struct Counter;
    ///
    /// enum CounterAction {
    ///     Increment,
    ///     Reset,
    /// }
    ///
    /// impl Reducer for Counter {
    ///     type State = u32;
    ///     type Action = CounterAction;
    ///
    ///     fn reduce(&self, state: Option<&u32>, action: &CounterAction) -> u32 {
    ///         match action {
    ///             CounterAction::Increment => state.copied().unwrap_or(0) + 1,
    ///             CounterAction::Reset => 0,
    ///         }
    ///     }
    /// }
    ///
    /// assert_eq!(Counter.reduce(None, &CounterAction::Increment), 1);
    /// ```
    pub trait Reducer {
        /// The state type this reducer produces
        type State;

        /// The action type this reducer processes
        type Action;

        /// Reduce an action into the next state
        ///
        /// # Arguments
        ///
        /// - `state`: The current state, or `None` before the first publish
        /// - `action`: The action to process
        ///
        /// # Returns
        ///
        /// The next state
        fn reduce(&self, state: Option<&Self::State>, action: &Self::Action) -> Self::State;
    }

    /// A type-erased reducer, as stored in a store's reducer chain
    pub type BoxReducer<S, A> = Box<dyn Reducer<State = S, Action = A> + Send + Sync>;
}

/// Middleware module - Side-effect observers that run before reducers
pub mod middleware {
    use crate::action::Action;
    use crate::error::{DispatchError, ProducerError};

    /// A handle able to feed actions back into a store
    ///
    /// Implemented by the runtime's store and its non-owning dispatcher.
    /// Middlewares receive one so they can trigger follow-up actions; those
    /// actions are queued behind the action currently being processed.
    pub trait Dispatch<A> {
        /// Queue an action for processing
        ///
        /// # Errors
        ///
        /// Returns [`DispatchError`] if the store behind this handle is gone
        /// or its pipeline has stopped.
        fn dispatch(&self, action: Action<A>) -> Result<(), DispatchError>;
    }

    /// The Middleware trait - side-effect hooks around the reducer chain
    ///
    /// Middlewares see the state as it was *before* the current action is
    /// reduced. They return nothing and cannot change state; logging,
    /// analytics and dispatching further actions are their job.
    ///
    /// # Example
    ///
    /// ```
    /// use unistore_core::{Dispatch, Middleware};
    ///
    /// struct Trace;
    ///
    /// impl Middleware for Trace {
    ///     type State = u32;
    ///     type Action = String;
    ///
    ///     fn handle(&self, state: Option<&u32>, action: &String, _dispatch: &dyn Dispatch<String>) {
    ///         println!("{action} at {state:?}");
    ///     }
    /// }
    /// ```
    pub trait Middleware {
        /// The state type observed
        type State;

        /// The action type observed
        type Action;

        /// Observe an action before it reaches the reducers
        fn handle(
            &self,
            state: Option<&Self::State>,
            action: &Self::Action,
            dispatch: &dyn Dispatch<Self::Action>,
        );

        /// Observe the failure of an asynchronous action producer
        ///
        /// Called in pipeline order with the state current at that point.
        /// The failed producer contributes no further actions. The default
        /// implementation ignores the failure.
        fn producer_failed(&self, state: Option<&Self::State>, error: &ProducerError) {
            let _ = (state, error);
        }
    }

    /// A type-erased middleware, as stored in a store's middleware chain
    pub type BoxMiddleware<S, A> = Box<dyn Middleware<State = S, Action = A> + Send + Sync>;
}

/// Reducer built from a closure, see [`reducer_fn`]
pub struct FnReducer<S, A, F> {
    f: F,
    _marker: PhantomData<fn(Option<&S>, &A) -> S>,
}

impl<S, A, F> Reducer for FnReducer<S, A, F>
where
    F: Fn(Option<&S>, &A) -> S,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: Option<&S>, action: &A) -> S {
        (self.f)(state, action)
    }
}

/// Wrap a closure as a [`Reducer`]
///
/// ```
/// use unistore_core::{reducer_fn, BoxReducer};
///
/// let double: BoxReducer<i32, ()> =
///     Box::new(reducer_fn(|state: Option<&i32>, _: &()| state.map_or(1, |s| s * 2)));
/// assert_eq!(double.reduce(Some(&4), &()), 8);
/// ```
#[must_use]
pub const fn reducer_fn<S, A, F>(f: F) -> FnReducer<S, A, F>
where
    F: Fn(Option<&S>, &A) -> S,
{
    FnReducer {
        f,
        _marker: PhantomData,
    }
}

/// Middleware built from a closure, see [`middleware_fn`]
pub struct FnMiddleware<S, A, F> {
    f: F,
    _marker: PhantomData<fn(Option<&S>, &A)>,
}

impl<S, A, F> Middleware for FnMiddleware<S, A, F>
where
    F: Fn(Option<&S>, &A, &dyn Dispatch<A>),
{
    type State = S;
    type Action = A;

    fn handle(&self, state: Option<&S>, action: &A, dispatch: &dyn Dispatch<A>) {
        (self.f)(state, action, dispatch);
    }
}

/// Wrap a closure as a [`Middleware`]
///
/// The closure receives the pre-mutation state, the action and a dispatch
/// handle for follow-up actions.
#[must_use]
pub const fn middleware_fn<S, A, F>(f: F) -> FnMiddleware<S, A, F>
where
    F: Fn(Option<&S>, &A, &dyn Dispatch<A>),
{
    FnMiddleware {
        f,
        _marker: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;

    struct NullDispatch;

    impl Dispatch<u8> for NullDispatch {
        fn dispatch(&self, _action: Action<u8>) -> Result<(), DispatchError> {
            Err(DispatchError::StoreDropped)
        }
    }

    #[test]
    fn reducer_fn_receives_absent_state() {
        let reducer = reducer_fn(|state: Option<&u8>, action: &u8| {
            state.copied().unwrap_or_default() + action
        });

        assert_eq!(reducer.reduce(None, &3), 3);
        assert_eq!(reducer.reduce(Some(&3), &3), 6);
    }

    #[test]
    fn middleware_fn_sees_state_and_action() {
        let seen = Mutex::new(Vec::new());
        let middleware = middleware_fn(|state: Option<&u8>, action: &u8, _: &dyn Dispatch<u8>| {
            seen.lock().unwrap().push((state.copied(), *action));
        });

        middleware.handle(None, &1, &NullDispatch);
        middleware.handle(Some(&1), &2, &NullDispatch);

        assert_eq!(*seen.lock().unwrap(), vec![(None, 1), (Some(1), 2)]);
    }

    #[test]
    fn default_failure_hook_is_a_no_op() {
        let middleware = middleware_fn(|_: Option<&u8>, _: &u8, _: &dyn Dispatch<u8>| {});
        let error = ProducerError::new(anyhow::anyhow!("socket closed"));

        middleware.producer_failed(Some(&1), &error);
    }
}
