//! Fixed-capacity ring buffer between report processing and keystroke translation.
//!
//! One slot is always kept free so that `head == tail` means empty and
//! `(tail + 1) % SLOTS == head` means full. Pushing into a full queue drops the
//! oldest unread entry; there is no blocking or failing variant.

use tracing::debug;

/// Slot count used by the session queues (16 live entries + 1 spare).
pub const QUEUE_SLOTS: usize = 17;

#[derive(Debug, Clone)]
pub struct EventQueue<T: Copy + Default, const SLOTS: usize> {
    buffer: [T; SLOTS],
    head: usize,
    tail: usize,
}

impl<T: Copy + Default, const SLOTS: usize> Default for EventQueue<T, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default, const SLOTS: usize> EventQueue<T, SLOTS> {
    pub fn new() -> Self {
        Self {
            buffer: [T::default(); SLOTS],
            head: 0,
            tail: 0,
        }
    }

    /// Number of items the queue holds before it starts dropping.
    pub const fn capacity(&self) -> usize {
        SLOTS - 1
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.tail + 1) % SLOTS == self.head
    }

    pub fn len(&self) -> usize {
        (self.tail + SLOTS - self.head) % SLOTS
    }

    /// Appends an item. Returns `true` when the oldest entry had to be dropped.
    pub fn push(&mut self, item: T) -> bool {
        let overflowed = self.is_full();
        if overflowed {
            debug!("Event queue full, dropping oldest entry");
            self.head = (self.head + 1) % SLOTS;
        }
        self.buffer[self.tail] = item;
        self.tail = (self.tail + 1) % SLOTS;
        overflowed
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.buffer[self.head];
        self.head = (self.head + 1) % SLOTS;
        Some(item)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_queue_returns_none() {
        let mut queue: EventQueue<u8, QUEUE_SLOTS> = EventQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn keeps_fifo_order() {
        let mut queue: EventQueue<u8, 5> = EventQueue::new();
        for i in 1..=3 {
            assert!(!queue.push(i));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn overflow_keeps_the_newest_items() {
        let mut queue: EventQueue<u32, QUEUE_SLOTS> = EventQueue::new();
        let capacity = queue.capacity() as u32;
        assert_eq!(capacity, 16);

        let mut dropped = 0;
        for i in 1..=capacity + 2 {
            if queue.push(i) {
                dropped += 1;
            }
        }
        assert_eq!(dropped, 2);
        assert!(queue.is_full());

        let drained: Vec<u32> = std::iter::from_fn(|| queue.pop()).collect();
        let expected: Vec<u32> = (3..=capacity + 2).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn wraps_around_the_buffer_end() {
        let mut queue: EventQueue<u8, 4> = EventQueue::new();
        for round in 0..10u8 {
            queue.push(round);
            queue.push(round.wrapping_add(100));
            assert_eq!(queue.pop(), Some(round));
            assert_eq!(queue.pop(), Some(round.wrapping_add(100)));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_discards_everything() {
        let mut queue: EventQueue<u8, 4> = EventQueue::new();
        queue.push(1);
        queue.push(2);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
