//! Order lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Order lifecycle state (订单状态)
///
/// `closed` and `cancelled` are terminal. `credit` is quasi-terminal: the
/// order is settled against customer credit and only `closed` may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    PendingPayment,
    InTable,
    Paid,
    InKitchen,
    Ready,
    Served,
    Closed,
    Cancelled,
    Credit,
}

impl OrderState {
    pub const ALL: [OrderState; 9] = [
        OrderState::PendingPayment,
        OrderState::InTable,
        OrderState::Paid,
        OrderState::InKitchen,
        OrderState::Ready,
        OrderState::Served,
        OrderState::Closed,
        OrderState::Cancelled,
        OrderState::Credit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::PendingPayment => "pending_payment",
            OrderState::InTable => "in_table",
            OrderState::Paid => "paid",
            OrderState::InKitchen => "in_kitchen",
            OrderState::Ready => "ready",
            OrderState::Served => "served",
            OrderState::Closed => "closed",
            OrderState::Cancelled => "cancelled",
            OrderState::Credit => "credit",
        }
    }

    /// closed / cancelled
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Closed | OrderState::Cancelled)
    }

    /// Counts toward table occupancy and accepts further work.
    pub fn is_active(&self) -> bool {
        !self.is_terminal() && *self != OrderState::Credit
    }

    /// Entering this state triggers table-release evaluation.
    pub fn releases_table(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order state: {0}")]
pub struct UnknownOrderState(pub String);

impl FromStr for OrderState {
    type Err = UnknownOrderState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownOrderState(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_state() {
        for state in OrderState::ALL {
            assert_eq!(state.as_str().parse::<OrderState>(), Ok(state));
        }
    }

    #[test]
    fn test_parse_unknown_state() {
        let err = "delivered".parse::<OrderState>().unwrap_err();
        assert_eq!(err, UnknownOrderState("delivered".to_string()));
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&OrderState::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
    }

    #[test]
    fn test_activity() {
        assert!(OrderState::InKitchen.is_active());
        assert!(!OrderState::Credit.is_active());
        assert!(!OrderState::Credit.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Closed.releases_table());
    }
}
