//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Fold several reducers into one, left to right
//! - **`scope_reducer`**: Focus a reducer on a subset of state
//!
//! # Examples
//!
//! ## Combining Reducers
//!
//! ```
//! use unistore_core::composition::combine_reducers;
//! use unistore_core::{reducer::Reducer, reducer_fn};
//!
//! #[derive(Clone, Default, Debug, PartialEq)]
//! struct Profile {
//!     visits: u32,
//!     name: String,
//! }
//!
//! enum ProfileAction {
//!     Visit,
//!     Rename(String),
//! }
//!
//! let combined = combine_reducers(vec![
//!     Box::new(reducer_fn(|state: Option<&Profile>, action: &ProfileAction| {
//!         let mut next = state.cloned().unwrap_or_default();
//!         if matches!(action, ProfileAction::Visit) {
//!             next.visits += 1;
//!         }
//!         next
//!     })),
//!     Box::new(reducer_fn(|state: Option<&Profile>, action: &ProfileAction| {
//!         let mut next = state.cloned().unwrap_or_default();
//!         if let ProfileAction::Rename(name) = action {
//!             next.name = name.clone();
//!         }
//!         next
//!     })),
//! ]);
//!
//! let state = combined.reduce(None, &ProfileAction::Visit);
//! let state = combined.reduce(Some(&state), &ProfileAction::Rename("ada".into()));
//! assert_eq!(state, Profile { visits: 1, name: "ada".into() });
//! ```

use crate::reducer::{BoxReducer, Reducer};
use std::marker::PhantomData;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Reducers run in order; each receives the state produced by the one
/// before it. This is the same fold a store applies to its reducer chain,
/// packaged as a single reducer so a group can be reused or nested.
///
/// An empty combination passes the state through unchanged, falling back to
/// `S::default()` when the state is absent.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
#[must_use]
pub fn combine_reducers<S, A>(reducers: Vec<BoxReducer<S, A>>) -> CombinedReducer<S, A>
where
    S: Clone + Default,
{
    CombinedReducer { reducers }
}

/// A reducer that folds an ordered list of reducers
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A> {
    reducers: Vec<BoxReducer<S, A>>,
}

impl<S, A> CombinedReducer<S, A> {
    /// Number of reducers in the combination
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether the combination holds no reducers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A> Reducer for CombinedReducer<S, A>
where
    S: Clone + Default,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: Option<&S>, action: &A) -> S {
        let mut reducers = self.reducers.iter();

        let Some(first) = reducers.next() else {
            return state.cloned().unwrap_or_default();
        };

        reducers.fold(first.reduce(state, action), |current, reducer| {
            reducer.reduce(Some(&current), action)
        })
    }
}

/// Scopes a reducer to operate on a subset of state.
///
/// The inner reducer sees only the sub-state (absent when the parent state
/// is absent) and its result is written back into a copy of the parent.
/// When the parent state is absent, the copy starts from `S::default()`.
///
/// # Examples
///
/// ```
/// use unistore_core::composition::scope_reducer;
/// use unistore_core::{reducer::Reducer, reducer_fn};
///
/// #[derive(Clone, Default)]
/// struct App {
///     clicks: u32,
///     title: String,
/// }
///
/// let scoped = scope_reducer(
///     reducer_fn(|clicks: Option<&u32>, _: &()| clicks.copied().unwrap_or(0) + 1),
///     |app: &App| &app.clicks,
///     |app: &mut App, clicks| app.clicks = clicks,
/// );
///
/// let app = scoped.reduce(None, &());
/// let app = scoped.reduce(Some(&app), &());
/// assert_eq!(app.clicks, 2);
/// assert!(app.title.is_empty());
/// ```
#[must_use]
pub fn scope_reducer<S, SubS, A, R>(
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
) -> ScopedReducer<S, SubS, A, R>
where
    S: Clone + Default,
    R: Reducer<State = SubS, Action = A>,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        _phantom: PhantomData,
    }
}

/// A reducer focused on part of a larger state
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, R>
where
    R: Reducer<State = SubS, Action = A>,
{
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
    _phantom: PhantomData<fn(&A)>,
}

impl<S, SubS, A, R> Reducer for ScopedReducer<S, SubS, A, R>
where
    S: Clone + Default,
    R: Reducer<State = SubS, Action = A>,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: Option<&S>, action: &A) -> S {
        let sub_state = self.reducer.reduce(state.map(self.get_state), action);

        let mut next = state.cloned().unwrap_or_default();
        (self.set_state)(&mut next, sub_state);
        next
    }
}
