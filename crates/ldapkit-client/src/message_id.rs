//! Message ID generator.
//!
//! Message IDs correlate requests with their responses. Zero is reserved
//! for unsolicited notifications, so IDs run from 1 to `i32::MAX` and then
//! wrap back to 1.

use std::sync::atomic::{AtomicI32, Ordering};

/// Atomic message ID generator.
#[derive(Debug)]
pub struct MessageIdGenerator {
    next: AtomicI32,
}

impl MessageIdGenerator {
    /// Creates a generator whose first ID is `initial`. Values below 1
    /// start at 1.
    #[must_use]
    pub const fn new(initial: i32) -> Self {
        Self {
            next: AtomicI32::new(if initial < 1 { 1 } else { initial }),
        }
    }

    /// Returns the next ID.
    #[must_use]
    pub fn next(&self) -> i32 {
        match self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(if id == i32::MAX { 1 } else { id + 1 })
            }) {
            Ok(id) | Err(id) => id,
        }
    }

    /// Returns the ID the next call will hand out.
    #[must_use]
    pub fn peek(&self) -> i32 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequence() {
        let ids = MessageIdGenerator::default();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn test_wraps_to_one() {
        let ids = MessageIdGenerator::new(i32::MAX);
        assert_eq!(ids.next(), i32::MAX);
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn test_initial_clamped() {
        assert_eq!(MessageIdGenerator::new(0).next(), 1);
        assert_eq!(MessageIdGenerator::new(-5).next(), 1);
    }

    #[test]
    fn test_unique_across_threads() {
        let ids = std::sync::Arc::new(MessageIdGenerator::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..1000).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate message ID {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    proptest! {
        #[test]
        fn prop_ids_stay_positive_and_step_by_one(
            initial in prop_oneof![1i32..=100, (i32::MAX - 100)..=i32::MAX],
            count in 1usize..300,
        ) {
            let ids = MessageIdGenerator::new(initial);
            let mut previous = ids.next();
            prop_assert_eq!(previous, initial);
            for _ in 1..count {
                let id = ids.next();
                prop_assert!(id >= 1);
                let expected = if previous == i32::MAX { 1 } else { previous + 1 };
                prop_assert_eq!(id, expected);
                previous = id;
            }
        }
    }
}
