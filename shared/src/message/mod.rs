//! 通知消息类型定义
//!
//! Wire shape of lifecycle notifications, shared by push subscribers and
//! poll clients: `{type, payload, timestamp}`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::order::{OrderState, PaymentMode};

/// Staff role of a connection or poll client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Kitchen,
    Waitstaff,
    Cashier,
    Manager,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Kitchen, Role::Waitstaff, Role::Cashier, Role::Manager];

    /// Role rooms joined on registration; managers join all four
    pub fn rooms(&self) -> Vec<Room> {
        match self {
            Role::Kitchen => vec![Room::Kitchen],
            Role::Waitstaff => vec![Room::Waitstaff],
            Role::Cashier => vec![Room::Cashiers],
            Role::Manager => vec![Room::Kitchen, Room::Waitstaff, Room::Cashiers, Room::Managers],
        }
    }

    /// Ring buffer read by this role's poll requests (besides `general`)
    pub fn poll_channel(&self) -> PollChannel {
        match self {
            Role::Kitchen => PollChannel::Kitchen,
            Role::Waitstaff => PollChannel::Waitstaff,
            Role::Cashier => PollChannel::Cashiers,
            Role::Manager => PollChannel::Managers,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Kitchen => "kitchen",
            Role::Waitstaff => "waitstaff",
            Role::Cashier => "cashier",
            Role::Manager => "manager",
        };
        f.write_str(s)
    }
}

/// Push audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    Kitchen,
    Waitstaff,
    Cashiers,
    Managers,
    /// Dynamic room of a single order
    Order(u64),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Kitchen => f.write_str("kitchen"),
            Room::Waitstaff => f.write_str("waitstaff"),
            Room::Cashiers => f.write_str("cashiers"),
            Room::Managers => f.write_str("managers"),
            Room::Order(id) => write!(f, "order_{}", id),
        }
    }
}

/// Pull-side ring buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollChannel {
    Kitchen,
    Waitstaff,
    Cashiers,
    Managers,
    General,
}

impl PollChannel {
    pub const ALL: [PollChannel; 5] = [
        PollChannel::Kitchen,
        PollChannel::Waitstaff,
        PollChannel::Cashiers,
        PollChannel::Managers,
        PollChannel::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PollChannel::Kitchen => "kitchen",
            PollChannel::Waitstaff => "waitstaff",
            PollChannel::Cashiers => "cashiers",
            PollChannel::Managers => "managers",
            PollChannel::General => "general",
        }
    }
}

/// Kind of line-level change carried by `item_changed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemChange {
    Added,
    Removed,
    QuantityChanged,
    DocumentIssued,
    /// Receipt type or tip changed after payment
    PaymentAdjusted,
}

/// Lifecycle notice; serialized as `{"type": ..., "payload": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OrderNotice {
    NewOrder {
        order_id: u64,
        table_id: Option<u64>,
        payment_mode: PaymentMode,
        state: OrderState,
        total: Decimal,
        item_count: usize,
    },
    OrderReady {
        order_id: u64,
        table_id: Option<u64>,
    },
    StateChanged {
        order_id: u64,
        table_id: Option<u64>,
        from: OrderState,
        to: OrderState,
    },
    ItemChanged {
        order_id: u64,
        change: ItemChange,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<u64>,
    },
    LowStock {
        stock_item_id: u64,
        name: String,
        level: Decimal,
        min_level: Decimal,
    },
}

impl OrderNotice {
    /// Wire name of the `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            OrderNotice::NewOrder { .. } => "new_order",
            OrderNotice::OrderReady { .. } => "order_ready",
            OrderNotice::StateChanged { .. } => "state_changed",
            OrderNotice::ItemChanged { .. } => "item_changed",
            OrderNotice::LowStock { .. } => "low_stock",
        }
    }

    pub fn order_id(&self) -> Option<u64> {
        match self {
            OrderNotice::NewOrder { order_id, .. }
            | OrderNotice::OrderReady { order_id, .. }
            | OrderNotice::StateChanged { order_id, .. }
            | OrderNotice::ItemChanged { order_id, .. } => Some(*order_id),
            OrderNotice::LowStock { .. } => None,
        }
    }
}

/// Timestamped notice as delivered over push and poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(flatten)]
    pub notice: OrderNotice,
    /// Unix millis
    pub timestamp: i64,
}

impl NotificationEvent {
    pub fn new(notice: OrderNotice, timestamp: i64) -> Self {
        Self { notice, timestamp }
    }
}

/// Poll endpoint result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub events: Vec<NotificationEvent>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let event = NotificationEvent::new(
            OrderNotice::OrderReady {
                order_id: 12,
                table_id: Some(3),
            },
            1_700_000_000_000,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_ready");
        assert_eq!(json["payload"]["order_id"], 12);
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);

        let back: NotificationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_manager_joins_every_role_room() {
        let rooms = Role::Manager.rooms();
        assert_eq!(rooms.len(), 4);
        assert!(rooms.contains(&Room::Managers));
        assert_eq!(Role::Kitchen.rooms(), vec![Room::Kitchen]);
    }

    #[test]
    fn test_room_display() {
        assert_eq!(Room::Order(42).to_string(), "order_42");
        assert_eq!(Room::Cashiers.to_string(), "cashiers");
    }
}
