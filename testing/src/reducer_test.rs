//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use unistore_core::reducer::Reducer;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Actions are applied in order, each to the state produced by the one
/// before, starting from the given state (or from the absent state).
///
/// # Example
///
/// ```
/// use unistore_core::reducer_fn;
/// use unistore_testing::ReducerTest;
///
/// ReducerTest::new(reducer_fn(|total: Option<&u32>, amount: &u32| {
///     total.copied().unwrap_or(0) + amount
/// }))
/// .given_no_state()
/// .when_actions([5, 10])
/// .then_state(|total| assert_eq!(*total, 15))
/// .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    initial_state: Option<Option<R::State>>,
    actions: Vec<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
        }
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(Some(state));
        self
    }

    /// Start from the absent state, as a fresh store does (Given)
    #[must_use]
    pub fn given_no_state(mut self) -> Self {
        self.initial_state = Some(None);
        self
    }

    /// Add an action to apply (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Add several actions to apply in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = R::Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the initial state or the actions are not set, or if any
    /// assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let initial = self
            .initial_state
            .expect("Initial state must be set with given_state() or given_no_state()");

        let mut actions = self.actions.iter();
        let Some(first) = actions.next() else {
            panic!("At least one action must be set with when_action()");
        };

        let mut state = self.reducer.reduce(initial.as_ref(), first);
        for action in actions {
            state = self.reducer.reduce(Some(&state), action);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unistore_core::reducer_fn;

    #[derive(Clone, Debug, PartialEq)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;

        fn reduce(&self, state: Option<&TestState>, action: &TestAction) -> TestState {
            let count = state.map_or(0, |s| s.count);
            match action {
                TestAction::Increment => TestState { count: count + 1 },
                TestAction::Decrement => TestState { count: count - 1 },
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_decrement_from_absent() {
        ReducerTest::new(TestReducer)
            .given_no_state()
            .when_action(TestAction::Decrement)
            .then_state(|state| {
                assert_eq!(state.count, -1);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_applies_actions_in_order() {
        let tags = reducer_fn(|state: Option<&String>, tag: &char| {
            let mut next = state.cloned().unwrap_or_default();
            next.push(*tag);
            next
        });

        ReducerTest::new(tags)
            .given_state("x".to_string())
            .when_actions(['a', 'b'])
            .when_action('c')
            .then_state(|state| assert_eq!(state, "xabc"))
            .run();
    }

    #[test]
    #[should_panic(expected = "Initial state must be set")]
    fn test_reducer_test_requires_given() {
        ReducerTest::new(TestReducer)
            .when_action(TestAction::Increment)
            .run();
    }
}
