//! Arbitrary Scheduler module used for the lower transport timers (incomplete timer, block ack
//! timer). `TimeQueue` is a min-heap of deadlines and `Scheduler` adds keyed cancellation on top.
use crate::timestamp::TimestampTrait;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::time::Duration;

#[derive(Debug)]
pub struct TimeQueueEntry<T, Timestamp: TimestampTrait> {
    timestamp: Timestamp,
    item: T,
}
impl<T, Timestamp: TimestampTrait> TimeQueueEntry<T, Timestamp> {
    #[must_use]
    pub fn new(timestamp: Timestamp, item: T) -> TimeQueueEntry<T, Timestamp> {
        TimeQueueEntry { timestamp, item }
    }
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
impl<T: Clone, Timestamp: TimestampTrait> Clone for TimeQueueEntry<T, Timestamp> {
    #[must_use]
    fn clone(&self) -> Self {
        TimeQueueEntry {
            timestamp: self.timestamp,
            item: self.item.clone(),
        }
    }
}
impl<T, Timestamp: TimestampTrait> AsRef<T> for TimeQueueEntry<T, Timestamp> {
    #[must_use]
    fn as_ref(&self) -> &T {
        &self.item
    }
}
impl<T, Timestamp: TimestampTrait> PartialOrd for TimeQueueEntry<T, Timestamp> {
    #[must_use]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T, Timestamp: TimestampTrait> PartialEq for TimeQueueEntry<T, Timestamp> {
    #[must_use]
    fn eq(&self, other: &Self) -> bool {
        self.timestamp.eq(&other.timestamp)
    }
}
impl<T, Timestamp: TimestampTrait> Eq for TimeQueueEntry<T, Timestamp> {}
impl<T, Timestamp: TimestampTrait> Ord for TimeQueueEntry<T, Timestamp> {
    #[must_use]
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}
/// Items ordered by deadline, earliest first.
#[derive(Debug)]
pub struct TimeQueue<T, Timestamp: TimestampTrait> {
    priority_queue: BinaryHeap<Reverse<TimeQueueEntry<T, Timestamp>>>,
}
impl<T, Timestamp: TimestampTrait> Default for TimeQueue<T, Timestamp> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: Clone, Timestamp: TimestampTrait> Clone for TimeQueue<T, Timestamp> {
    #[must_use]
    fn clone(&self) -> Self {
        TimeQueue {
            priority_queue: self.priority_queue.clone(),
        }
    }
}
impl<T, Timestamp: TimestampTrait> TimeQueue<T, Timestamp> {
    #[must_use]
    pub fn new() -> TimeQueue<T, Timestamp> {
        TimeQueue {
            priority_queue: BinaryHeap::default(),
        }
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.priority_queue.len()
    }
    #[must_use]
    pub fn peek(&self) -> Option<&TimeQueueEntry<T, Timestamp>> {
        self.priority_queue.peek().map(|r| &r.0)
    }
    #[must_use]
    pub fn peek_timestamp(&self) -> Option<Timestamp> {
        Some(self.peek()?.timestamp())
    }
    pub fn push(&mut self, timestamp: Timestamp, item: T) {
        self.priority_queue
            .push(Reverse(TimeQueueEntry::new(timestamp, item)))
    }
    pub fn pop_force(&mut self) -> Option<TimeQueueEntry<T, Timestamp>> {
        self.priority_queue.pop().map(|r| r.0)
    }
    /// Pops the earliest entry if its deadline is `<= now`.
    pub fn pop_ready(&mut self, now: Timestamp) -> Option<TimeQueueEntry<T, Timestamp>> {
        if self.next_is_ready(now) {
            self.pop_force()
        } else {
            None
        }
    }
    pub fn pop_item_ready(&mut self, now: Timestamp) -> Option<T> {
        Some(self.pop_ready(now)?.item)
    }
    /// Time left until the earliest deadline (zero if it already passed).
    #[must_use]
    pub fn time_until_next(&self, now: Timestamp) -> Option<Duration> {
        Some(self.peek_timestamp()?.until(now).unwrap_or_default())
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.priority_queue.is_empty()
    }
    #[must_use]
    pub fn next_is_ready(&self, now: Timestamp) -> bool {
        self.peek_timestamp().map_or(false, |t| t <= now)
    }
    pub fn clear(&mut self) {
        self.priority_queue.clear()
    }
}
/// Keyed cancellable timers. Scheduling a key that is already pending replaces (cancels) the old
/// deadline. Cancelled entries stay in the `TimeQueue` and are skipped lazily by generation.
#[derive(Debug)]
pub struct Scheduler<K: Ord + Clone, Timestamp: TimestampTrait> {
    queue: TimeQueue<(K, u64), Timestamp>,
    pending: BTreeMap<K, (u64, Timestamp)>,
    generation: u64,
}
impl<K: Ord + Clone, Timestamp: TimestampTrait> Default for Scheduler<K, Timestamp> {
    fn default() -> Self {
        Self::new()
    }
}
impl<K: Ord + Clone, Timestamp: TimestampTrait> Scheduler<K, Timestamp> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: TimeQueue::new(),
            pending: BTreeMap::new(),
            generation: 0,
        }
    }
    /// Schedules `key` to fire at `deadline`, cancelling any pending firing of `key`.
    pub fn schedule(&mut self, key: K, deadline: Timestamp) {
        self.generation = self.generation.wrapping_add(1);
        self.pending
            .insert(key.clone(), (self.generation, deadline));
        self.queue.push(deadline, (key, self.generation));
    }
    /// Returns `true` if a pending timer was cancelled.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }
    #[must_use]
    pub fn is_scheduled(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }
    #[must_use]
    pub fn deadline(&self, key: &K) -> Option<Timestamp> {
        self.pending.get(key).map(|(_, t)| *t)
    }
    fn drop_stale(&mut self) {
        while let Some(entry) = self.queue.peek() {
            let (key, generation) = entry.as_ref();
            match self.pending.get(key) {
                Some((g, _)) if g == generation => return,
                _ => {
                    self.queue.pop_force();
                }
            }
        }
    }
    /// Earliest pending deadline.
    pub fn next_deadline(&mut self) -> Option<Timestamp> {
        self.drop_stale();
        self.queue.peek_timestamp()
    }
    /// Pops the next pending key whose deadline is `<= now`. Call in a loop to drain every
    /// expired timer in deadline order.
    pub fn pop_ready(&mut self, now: Timestamp) -> Option<K> {
        self.drop_stale();
        let (key, _) = self.queue.pop_item_ready(now)?;
        self.pending.remove(&key);
        Some(key)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
    pub fn clear(&mut self) {
        self.pending.clear();
        self.queue.clear();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_time_queue_earliest_first() {
        let now = Instant::now();
        let mut queue = TimeQueue::new();
        queue.push(now + Duration::from_secs(3), 3);
        queue.push(now + Duration::from_secs(1), 1);
        queue.push(now + Duration::from_secs(2), 2);
        assert_eq!(queue.pop_item_ready(now), None);
        assert_eq!(
            queue.time_until_next(now),
            Some(Duration::from_secs(1))
        );
        let later = now + Duration::from_secs(5);
        assert_eq!(queue.pop_item_ready(later), Some(1));
        assert_eq!(queue.pop_item_ready(later), Some(2));
        assert_eq!(queue.pop_item_ready(later), Some(3));
        assert!(queue.is_empty());
    }
    #[test]
    fn test_restart_cancels_pending() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule("incomplete", now + Duration::from_secs(10));
        scheduler.schedule("ack", now + Duration::from_millis(150));
        // Restart the incomplete timer 5 seconds later.
        scheduler.schedule("incomplete", now + Duration::from_secs(15));
        assert_eq!(scheduler.len(), 2);
        assert_eq!(
            scheduler.next_deadline(),
            Some(now + Duration::from_millis(150))
        );
        assert!(scheduler.cancel(&"ack"));
        assert!(!scheduler.cancel(&"ack"));
        assert!(!scheduler.is_scheduled(&"ack"));
        // The original 10s deadline must not fire.
        assert_eq!(scheduler.pop_ready(now + Duration::from_secs(12)), None);
        assert_eq!(
            scheduler.pop_ready(now + Duration::from_secs(15)),
            Some("incomplete")
        );
        assert_eq!(scheduler.pop_ready(now + Duration::from_secs(100)), None);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_deadline(), None);
    }
}
