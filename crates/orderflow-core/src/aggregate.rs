//! Aggregate folding.

/// State that is rebuilt by folding an aggregate's events in order.
///
/// `apply` must be pure: no I/O, and an event it does not understand leaves
/// the state unchanged.
pub trait Aggregate: Default {
    /// The event type this aggregate consumes.
    type Event;

    /// Apply a single event to the current state.
    fn apply(&mut self, event: &Self::Event);
}

/// Reduces an ordered sequence of events into the aggregate's current state,
/// starting from `A::default()`.
pub fn fold<'a, A, I>(events: I) -> A
where
    A: Aggregate,
    A::Event: 'a,
    I: IntoIterator<Item = &'a A::Event>,
{
    events.into_iter().fold(A::default(), |mut state, event| {
        state.apply(event);
        state
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Tally(i64);

    impl Aggregate for Tally {
        type Event = i64;

        fn apply(&mut self, event: &i64) {
            self.0 += event;
        }
    }

    #[test]
    fn test_fold_of_no_events_is_default() {
        let state: Tally = fold(&[]);
        assert_eq!(state, Tally(0));
    }

    #[test]
    fn test_fold_applies_events_in_order() {
        let state: Tally = fold(&[1, 2, 3]);
        assert_eq!(state, Tally(6));
    }
}
