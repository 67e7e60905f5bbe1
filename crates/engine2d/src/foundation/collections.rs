//! Specialized collection types

use std::collections::VecDeque;

/// FIFO of deferred work drained a bounded number of items per tick
///
/// Used for requests that are too expensive to service all at once in a single
/// frame (path searches, slot assignments). Items pushed while draining wait
/// for the next tick.
#[derive(Debug, Clone)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    per_tick: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue that yields at most `per_tick` items per drain
    pub fn new(per_tick: usize) -> Self {
        Self {
            items: VecDeque::new(),
            per_tick: per_tick.max(1),
        }
    }

    /// Enqueue an item
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Take up to `per_tick` items from the front of the queue
    pub fn drain_tick(&mut self) -> Vec<T> {
        let count = self.per_tick.min(self.items.len());
        self.items.drain(..count).collect()
    }

    /// Maximum items handed out per tick
    pub fn per_tick(&self) -> usize {
        self.per_tick
    }

    /// Number of waiting items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every waiting item
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Keep only the items matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_is_bounded_and_fifo() {
        let mut queue = BoundedQueue::new(2);
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.drain_tick(), vec![0, 1]);
        assert_eq!(queue.drain_tick(), vec![2, 3]);
        assert_eq!(queue.drain_tick(), vec![4]);
        assert!(queue.drain_tick().is_empty());
    }

    #[test]
    fn test_zero_per_tick_is_clamped() {
        let mut queue = BoundedQueue::new(0);
        queue.push("a");
        assert_eq!(queue.per_tick(), 1);
        assert_eq!(queue.drain_tick(), vec!["a"]);
    }
}
