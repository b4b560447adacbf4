//! Notification Fanout
//!
//! - **hub**: actor owning the connection registry and poll rings
//! - **routing**: notice kind → push rooms / poll channel
//! - **ring**: bounded per-channel buffer
//!
//! Delivery is best effort: push subscribers get low latency, poll clients
//! get everything inside the visibility window. Nothing survives a restart.

pub mod hub;
pub mod ring;
pub mod routing;

pub use hub::{Connection, HubConfig, HubError, HubHandle, HubStats, spawn_hub};

use shared::message::NotificationEvent;
use std::sync::Mutex;

/// Destination of committed order notices
///
/// Publishing never fails the command that produced the notice.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: NotificationEvent);
}

/// Sink that keeps every event in memory
///
/// Used where no hub runs (tests, embedding without push delivery).
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event received so far
    pub fn events(&self) -> Vec<NotificationEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drain received events
    pub fn take(&self) -> Vec<NotificationEvent> {
        match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Wire names of received events, in order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.notice.kind()).collect()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: NotificationEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
