use crate::graph::DailyContacts;
use std::collections::VecDeque;

/// How many past days contact tracing can look back over.
pub const TRACING_WINDOW_DAYS: usize = 14;

/// A bounded FIFO of past daily edge sets. Once full, pushing a new day evicts the oldest.
#[derive(Debug, Clone)]
pub struct ContactHistory {
    capacity: usize,
    days: VecDeque<DailyContacts>,
}

impl Default for ContactHistory {
    fn default() -> Self {
        Self::with_capacity(TRACING_WINDOW_DAYS)
    }
}

impl ContactHistory {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        ContactHistory {
            capacity,
            days: VecDeque::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Appends the snapshot of a finished day, returning the evicted oldest day if the window
    /// was full.
    pub fn push(&mut self, snapshot: DailyContacts) -> Option<DailyContacts> {
        let evicted = if self.days.len() == self.capacity {
            self.days.pop_front()
        } else {
            None
        };
        self.days.push_back(snapshot);
        evicted
    }

    /// Snapshots from the most recent day backwards.
    pub fn most_recent_first(&self) -> impl Iterator<Item = &DailyContacts> {
        self.days.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = ContactHistory::with_capacity(2);
        assert!(history.push(DailyContacts::new(1)).is_none());
        assert!(history.push(DailyContacts::new(2)).is_none());

        let evicted = history.push(DailyContacts::new(3)).unwrap();

        assert_eq!(evicted.agent_count(), 1);
        assert_eq!(history.len(), 2);
        let order: Vec<usize> = history
            .most_recent_first()
            .map(DailyContacts::agent_count)
            .collect();
        assert_eq!(order, vec![3, 2]);
    }

    #[test]
    fn default_window_is_two_weeks() {
        let mut history = ContactHistory::default();
        assert!(history.is_empty());
        for day in 1..=TRACING_WINDOW_DAYS {
            assert!(history.push(DailyContacts::new(day)).is_none());
        }
        let evicted = history.push(DailyContacts::new(0)).unwrap();
        assert_eq!(evicted.agent_count(), 1);
        assert_eq!(history.len(), TRACING_WINDOW_DAYS);
    }
}
