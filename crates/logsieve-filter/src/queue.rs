use std::collections::VecDeque;

use logsieve_types::Record;

/// A record waiting in the queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedEntry {
    /// Admission time in seconds since the Unix epoch
    pub admitted_at: i64,
    pub record: Record,
}

/// FIFO delay queue for matched records
///
/// Only the head is ever released, so records leave in admission order.
/// Admission never fails; growth is bounded only by how often eviction is
/// attempted.
#[derive(Clone, Debug, Default)]
pub struct WaitQueue {
    entries: VecDeque<QueuedEntry>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the tail
    ///
    /// Admission times never decrease: if the clock stepped backwards the
    /// entry inherits the tail's timestamp.
    pub fn admit(&mut self, record: Record, now: i64) {
        let admitted_at = match self.entries.back() {
            Some(tail) => now.max(tail.admitted_at),
            None => now,
        };
        self.entries.push_back(QueuedEntry {
            admitted_at,
            record,
        });
    }

    /// Release the head if it is older than `max_age` seconds or the queue
    /// holds more than `max_size` entries
    pub fn try_evict(&mut self, now: i64, max_age: u64, max_size: usize) -> Option<Record> {
        let head = self.entries.front()?;
        if !is_expired(head.admitted_at, now, max_age) && self.entries.len() <= max_size {
            return None;
        }
        self.entries.pop_front().map(|entry| entry.record)
    }

    /// Release every head older than `max_age` seconds, oldest first
    pub fn evict_expired(&mut self, now: i64, max_age: u64) -> Vec<Record> {
        let mut released = Vec::new();
        while self
            .entries
            .front()
            .is_some_and(|head| is_expired(head.admitted_at, now, max_age))
        {
            if let Some(entry) = self.entries.pop_front() {
                released.push(entry.record);
            }
        }
        released
    }

    /// Release everything, oldest first
    pub fn drain(&mut self) -> Vec<Record> {
        self.entries.drain(..).map(|entry| entry.record).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Admission time of the head entry
    pub fn oldest_admitted_at(&self) -> Option<i64> {
        self.entries.front().map(|entry| entry.admitted_at)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedEntry> {
        self.entries.iter()
    }
}

/// Strictly older than `max_age`; an entry from the future is never expired
fn is_expired(admitted_at: i64, now: i64, max_age: u64) -> bool {
    u64::try_from(now.saturating_sub(admitted_at)).is_ok_and(|age| age > max_age)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(record: &Record) -> String {
        record.body_lossy().into_owned()
    }

    #[test]
    fn test_zero_thresholds_evict_immediately() {
        let mut queue = WaitQueue::new();
        queue.admit(Record::from("a"), 10);
        let evicted = queue.try_evict(10, 0, 0);
        assert_eq!(evicted.as_ref().map(body).as_deref(), Some("a"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_size_threshold() {
        let mut queue = WaitQueue::new();
        queue.admit(Record::from("a"), 0);
        assert_eq!(queue.try_evict(0, 100, 1), None);

        queue.admit(Record::from("b"), 1);
        let evicted = queue.try_evict(1, 100, 1);
        assert_eq!(evicted.as_ref().map(body).as_deref(), Some("a"));
        assert_eq!(queue.len(), 1);

        // Back within the size bound, nothing else leaves
        assert_eq!(queue.try_evict(1, 100, 1), None);
    }

    #[test]
    fn test_age_threshold_is_strict() {
        let mut queue = WaitQueue::new();
        queue.admit(Record::from("a"), 100);

        assert_eq!(queue.try_evict(105, 10, 10), None);
        assert_eq!(queue.try_evict(110, 10, 10), None);
        let evicted = queue.try_evict(111, 10, 10);
        assert_eq!(evicted.as_ref().map(body).as_deref(), Some("a"));
    }

    #[test]
    fn test_only_head_is_released_per_call() {
        let mut queue = WaitQueue::new();
        for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
            queue.admit(Record::from(name), i as i64);
        }

        // All three are expired, but one call releases one entry
        let evicted = queue.try_evict(1_000, 10, 10);
        assert_eq!(evicted.as_ref().map(body).as_deref(), Some("a"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.oldest_admitted_at(), Some(1));
    }

    #[test]
    fn test_fifo_order_across_evictions() {
        let mut queue = WaitQueue::new();
        let mut released = Vec::new();

        for i in 0..20 {
            queue.admit(Record::from(format!("r{i}")), i);
            if let Some(record) = queue.try_evict(i, 3, 4) {
                released.push(body(&record));
            }
        }
        released.extend(queue.drain().iter().map(body));

        let expected: Vec<String> = (0..20).map(|i| format!("r{i}")).collect();
        assert_eq!(released, expected);
    }

    #[test]
    fn test_clock_going_backwards_keeps_order() {
        let mut queue = WaitQueue::new();
        queue.admit(Record::from("a"), 50);
        queue.admit(Record::from("b"), 40);

        let times: Vec<i64> = queue.iter().map(|e| e.admitted_at).collect();
        assert_eq!(times, vec![50, 50]);
    }

    #[test]
    fn test_future_entry_never_expires() {
        let mut queue = WaitQueue::new();
        queue.admit(Record::from("a"), 100);
        assert_eq!(queue.try_evict(0, 0, 5), None);
    }

    #[test]
    fn test_evict_expired_stops_at_young_head() {
        let mut queue = WaitQueue::new();
        queue.admit(Record::from("old1"), 0);
        queue.admit(Record::from("old2"), 1);
        queue.admit(Record::from("young"), 9);

        let released: Vec<String> = queue.evict_expired(10, 5).iter().map(body).collect();
        assert_eq!(released, vec!["old1", "old2"]);
        assert_eq!(queue.len(), 1);
        assert!(queue.evict_expired(10, 5).is_empty());
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = WaitQueue::new();
        assert_eq!(queue.try_evict(0, 0, 0), None);
        assert_eq!(queue.oldest_admitted_at(), None);
        assert!(queue.drain().is_empty());
    }
}
