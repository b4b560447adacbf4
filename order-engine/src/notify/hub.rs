//! Notification hub actor
//!
//! One tokio task owns the connection registry and the poll rings; request
//! handlers only talk to it through [`HubHandle`].
//!
//! ```text
//! OrderService ──publish──▶ HubHandle ──mpsc──▶ HubActor
//!                                               ├─ push: every connection whose rooms match
//!                                               └─ ring: per poll channel (bounded)
//! poll client ──poll(role)──▶ HubHandle ──oneshot reply── role channel ∪ general, within window
//! ```

use serde::Serialize;
use shared::message::{NotificationEvent, PollChannel, PollResponse, Role, Room};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::EventSink;
use super::ring::EventRing;
use super::routing::{poll_channel, push_rooms};

/// Hub settings
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per poll channel ring capacity
    pub ring_capacity: usize,
    /// Poll visibility window
    pub poll_window: Duration,
    /// Per connection push buffer
    pub push_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 100,
            poll_window: Duration::from_secs(300),
            push_buffer: 256,
        }
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Hub mailbox closed")]
    Closed,

    #[error("Hub reply channel dropped")]
    NoReply,
}

pub type HubResult<T> = Result<T, HubError>;

/// A live push connection
#[derive(Debug)]
pub struct Connection {
    pub id: Uuid,
    pub role: Role,
    pub receiver: mpsc::Receiver<NotificationEvent>,
}

/// Registry and buffer counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub by_role: BTreeMap<String, usize>,
    /// Order rooms joined beyond the role rooms
    pub order_subscriptions: usize,
    pub buffered: BTreeMap<String, usize>,
}

/// Message sent to the hub actor
pub enum HubMessage {
    Register {
        role: Role,
        user: String,
        response: oneshot::Sender<Connection>,
    },
    Subscribe {
        connection_id: Uuid,
        room: Room,
        response: oneshot::Sender<bool>,
    },
    Unsubscribe {
        connection_id: Uuid,
        room: Room,
        response: oneshot::Sender<bool>,
    },
    Disconnect {
        connection_id: Uuid,
    },
    Publish(NotificationEvent),
    Poll {
        role: Role,
        /// Unix millis the window is measured from
        now: i64,
        response: oneshot::Sender<PollResponse>,
    },
    Stats {
        response: oneshot::Sender<HubStats>,
    },
    Shutdown,
}

struct ConnectionEntry {
    role: Role,
    user: String,
    rooms: BTreeSet<Room>,
    sender: mpsc::Sender<NotificationEvent>,
}

/// Actor owning connections and rings
pub struct HubActor {
    mailbox: mpsc::UnboundedReceiver<HubMessage>,
    connections: HashMap<Uuid, ConnectionEntry>,
    rings: HashMap<PollChannel, EventRing>,
    config: HubConfig,
}

impl HubActor {
    pub fn new(mailbox: mpsc::UnboundedReceiver<HubMessage>, config: HubConfig) -> Self {
        let rings = PollChannel::ALL
            .into_iter()
            .map(|c| (c, EventRing::new(config.ring_capacity)))
            .collect();
        Self {
            mailbox,
            connections: HashMap::new(),
            rings,
            config,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                HubMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }
        tracing::info!(
            connections = self.connections.len(),
            "Notification hub stopped"
        );
    }

    fn handle_message(&mut self, msg: HubMessage) {
        match msg {
            HubMessage::Register {
                role,
                user,
                response,
            } => {
                let id = Uuid::new_v4();
                let (sender, receiver) = mpsc::channel(self.config.push_buffer.max(1));
                tracing::info!(connection_id = %id, role = %role, user = %user, "Connection registered");
                self.connections.insert(
                    id,
                    ConnectionEntry {
                        role,
                        user,
                        rooms: role.rooms().into_iter().collect(),
                        sender,
                    },
                );
                let _ = response.send(Connection { id, role, receiver });
            }

            HubMessage::Subscribe {
                connection_id,
                room,
                response,
            } => {
                let ok = match self.connections.get_mut(&connection_id) {
                    Some(entry) => {
                        entry.rooms.insert(room);
                        true
                    }
                    None => false,
                };
                let _ = response.send(ok);
            }

            HubMessage::Unsubscribe {
                connection_id,
                room,
                response,
            } => {
                let ok = self
                    .connections
                    .get_mut(&connection_id)
                    .is_some_and(|entry| entry.rooms.remove(&room));
                let _ = response.send(ok);
            }

            HubMessage::Disconnect { connection_id } => {
                if let Some(entry) = self.connections.remove(&connection_id) {
                    tracing::info!(connection_id = %connection_id, user = %entry.user, "Connection closed");
                }
            }

            HubMessage::Publish(event) => self.fanout(event),

            HubMessage::Poll {
                role,
                now,
                response,
            } => {
                let _ = response.send(self.poll(role, now));
            }

            HubMessage::Stats { response } => {
                let _ = response.send(self.stats());
            }

            HubMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Push to matching connections and append to the poll ring
    fn fanout(&mut self, event: NotificationEvent) {
        let rooms = push_rooms(&event.notice);
        let mut closed = Vec::new();

        for (id, entry) in &self.connections {
            // at most one copy per connection
            if !rooms.iter().any(|r| entry.rooms.contains(r)) {
                continue;
            }
            match entry.sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %id, kind = event.notice.kind(), "Push buffer full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            if let Some(entry) = self.connections.remove(&id) {
                tracing::warn!(connection_id = %id, user = %entry.user, "Push receiver gone, connection removed");
            }
        }

        let channel = poll_channel(&event.notice);
        if let Some(ring) = self.rings.get_mut(&channel) {
            ring.push(event);
        }
    }

    fn poll(&self, role: Role, now: i64) -> PollResponse {
        let window_ms = i64::try_from(self.config.poll_window.as_millis()).unwrap_or(i64::MAX);
        let mut events: Vec<NotificationEvent> = [role.poll_channel(), PollChannel::General]
            .iter()
            .filter_map(|c| self.rings.get(c))
            .flat_map(|ring| ring.recent(now, window_ms).cloned())
            .collect();
        events.sort_by_key(|e| e.timestamp);
        let total = events.len();
        PollResponse { events, total }
    }

    fn stats(&self) -> HubStats {
        let mut by_role = BTreeMap::new();
        let mut order_subscriptions = 0;
        for entry in self.connections.values() {
            *by_role.entry(entry.role.to_string()).or_insert(0) += 1;
            order_subscriptions += entry
                .rooms
                .iter()
                .filter(|r| matches!(r, Room::Order(_)))
                .count();
        }
        let buffered = self
            .rings
            .iter()
            .map(|(c, ring)| (c.as_str().to_string(), ring.len()))
            .collect();
        HubStats {
            connections: self.connections.len(),
            by_role,
            order_subscriptions,
            buffered,
        }
    }
}

/// Handle for sending messages to the hub
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::UnboundedSender<HubMessage>,
}

impl std::fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubHandle")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl HubHandle {
    pub fn new(sender: mpsc::UnboundedSender<HubMessage>) -> Self {
        Self { sender }
    }

    fn send(&self, msg: HubMessage) -> HubResult<()> {
        self.sender.send(msg).map_err(|_| HubError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HubMessage,
    ) -> HubResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx))?;
        rx.await.map_err(|_| HubError::NoReply)
    }

    /// Register a push connection; it joins its role rooms
    pub async fn register(&self, role: Role, user: impl Into<String>) -> HubResult<Connection> {
        let user = user.into();
        self.request(|response| HubMessage::Register {
            role,
            user,
            response,
        })
        .await
    }

    /// Join a room; `false` when the connection is unknown
    pub async fn subscribe(&self, connection_id: Uuid, room: Room) -> HubResult<bool> {
        self.request(|response| HubMessage::Subscribe {
            connection_id,
            room,
            response,
        })
        .await
    }

    pub async fn unsubscribe(&self, connection_id: Uuid, room: Room) -> HubResult<bool> {
        self.request(|response| HubMessage::Unsubscribe {
            connection_id,
            room,
            response,
        })
        .await
    }

    pub fn disconnect(&self, connection_id: Uuid) -> HubResult<()> {
        self.send(HubMessage::Disconnect { connection_id })
    }

    /// Events visible to `role` right now
    pub async fn poll(&self, role: Role) -> HubResult<PollResponse> {
        self.poll_at(role, shared::util::now_millis()).await
    }

    /// Events visible to `role` at `now` (unix millis)
    pub async fn poll_at(&self, role: Role, now: i64) -> HubResult<PollResponse> {
        self.request(|response| HubMessage::Poll {
            role,
            now,
            response,
        })
        .await
    }

    pub async fn stats(&self) -> HubResult<HubStats> {
        self.request(|response| HubMessage::Stats { response }).await
    }

    pub fn shutdown(&self) -> HubResult<()> {
        self.send(HubMessage::Shutdown)
    }
}

impl EventSink for HubHandle {
    fn publish(&self, event: NotificationEvent) {
        if self.send(HubMessage::Publish(event)).is_err() {
            tracing::warn!("Notification hub closed, event dropped");
        }
    }
}

/// Spawn the hub actor on the current tokio runtime
pub fn spawn_hub(config: HubConfig) -> HubHandle {
    // 无界邮箱: publish 在同步的订单命令中调用，不能等待
    let (tx, rx) = mpsc::unbounded_channel();
    let actor = HubActor::new(rx, config);

    tokio::spawn(async move {
        actor.run().await;
    });

    HubHandle::new(tx)
}
