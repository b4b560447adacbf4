//! Routing table: notice kind → push rooms / poll channel

use shared::message::{OrderNotice, PollChannel, Room};
use shared::order::OrderState;

/// Rooms whose live connections receive the notice
pub fn push_rooms(notice: &OrderNotice) -> Vec<Room> {
    match notice {
        OrderNotice::NewOrder { .. } => vec![Room::Kitchen],
        OrderNotice::OrderReady { order_id, .. } => vec![Room::Waitstaff, Room::Order(*order_id)],
        OrderNotice::StateChanged { order_id, to, .. } => {
            let mut rooms = vec![Room::Order(*order_id)];
            match to {
                OrderState::PendingPayment | OrderState::Paid | OrderState::InKitchen => {
                    rooms.push(Room::Kitchen)
                }
                OrderState::Ready | OrderState::Served => rooms.push(Room::Waitstaff),
                _ => {}
            }
            rooms
        }
        OrderNotice::ItemChanged { .. } => vec![Room::Kitchen, Room::Waitstaff],
        OrderNotice::LowStock { .. } => vec![Room::Managers],
    }
}

/// Ring buffer the notice is appended to for poll clients
pub fn poll_channel(notice: &OrderNotice) -> PollChannel {
    match notice {
        OrderNotice::NewOrder { .. } => PollChannel::Kitchen,
        OrderNotice::OrderReady { .. } => PollChannel::Waitstaff,
        OrderNotice::StateChanged { .. } | OrderNotice::ItemChanged { .. } => PollChannel::General,
        OrderNotice::LowStock { .. } => PollChannel::Managers,
    }
}
