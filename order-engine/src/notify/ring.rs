//! Bounded per-channel event ring

use shared::message::NotificationEvent;
use std::collections::VecDeque;

/// Fixed-capacity FIFO; the oldest event is overwritten when full
#[derive(Debug)]
pub struct EventRing {
    events: VecDeque<NotificationEvent>,
    capacity: usize,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: NotificationEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events younger than `window_ms` at `now`
    pub fn recent(&self, now: i64, window_ms: i64) -> impl Iterator<Item = &NotificationEvent> {
        self.events
            .iter()
            .filter(move |e| now - e.timestamp < window_ms)
    }
}
