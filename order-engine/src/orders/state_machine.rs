//! Order state machine
//!
//! ```text
//!  prepaid:   pending_payment ─▶ paid ─▶ in_kitchen ─▶ ready ─▶ served ─▶ closed
//!  pay-later: in_table ─▶ in_kitchen ─▶ ready ─▶ served ─▶ paid ─▶ closed
//!  credit:    (unpaid) ══ credit admission ══▶ credit ─▶ closed
//!  cancelled: any unpaid, non-terminal state
//! ```
//!
//! Entering `paid` is followed automatically by `in_kitchen` (prepaid) or
//! `closed` (pay-later); see [`follow_on`].

use shared::order::{Order, OrderState, PaymentMode};

use super::error::{Conflict, OrderError, OrderResult};

/// Targets reachable from `order` by an explicit transition request
pub fn allowed_targets(order: &Order) -> Vec<OrderState> {
    use OrderState::*;
    let unpaid = !order.is_paid();
    let mut targets = match order.state {
        PendingPayment => vec![Paid, Cancelled],
        InTable => vec![InKitchen, Ready, Served, Paid, Cancelled],
        Paid => vec![InKitchen, Closed],
        InKitchen => vec![Ready, Served, Paid, Cancelled],
        Ready => vec![Served, Paid],
        Served => vec![Paid, Closed],
        Credit => vec![Closed],
        Closed | Cancelled => vec![],
    };
    targets.retain(|t| match t {
        Paid | Cancelled => unpaid,
        Closed if order.state == Served => !unpaid,
        _ => true,
    });
    targets
}

/// Check an explicit transition request against the policy table
///
/// `credit` is never a valid target here; it is only reachable through
/// credit admission.
pub fn validate_transition(order: &Order, to: OrderState) -> OrderResult<()> {
    let from = order.state;
    if from.is_terminal() {
        return Err(Conflict::Inactive { state: from }.into());
    }
    if allowed_targets(order).contains(&to) {
        return Ok(());
    }
    // Pick the most useful reason for the rejection
    let conflict = match to {
        OrderState::Paid if order.is_paid() => Conflict::AlreadyPaid,
        OrderState::Cancelled if order.is_paid() => Conflict::AlreadyPaid,
        OrderState::Closed if from == OrderState::Served => Conflict::NotPaid { state: from },
        _ => Conflict::Transition { from, to },
    };
    Err(conflict.into())
}

/// Parse a target state name coming from the request layer
pub fn parse_target(name: &str) -> OrderResult<OrderState> {
    name.parse::<OrderState>()
        .map_err(|e| OrderError::validation(e.to_string()))
}

/// Move the order into `to`, recording the lifecycle timestamp
pub fn enter(order: &mut Order, to: OrderState, now: i64) {
    match to {
        OrderState::Paid => order.paid_at = Some(now),
        OrderState::InKitchen => order.kitchen_at = Some(now),
        OrderState::Ready => order.ready_at = Some(now),
        OrderState::Served => order.served_at = Some(now),
        _ => {}
    }
    order.state = to;
    order.updated_at = now;
}

/// Automatic transition after entering `paid`
pub fn follow_on(order: &Order) -> Option<OrderState> {
    if order.state != OrderState::Paid {
        return None;
    }
    match order.payment_mode {
        PaymentMode::Prepaid => Some(OrderState::InKitchen),
        // 后付: 厨房早已出单，付款即结束
        PaymentMode::PayLater => Some(OrderState::Closed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::CreateOrder;

    fn order(mode: PaymentMode) -> Order {
        let input = CreateOrder {
            table_id: Some(1),
            operator: "ana".into(),
            payment_mode: mode,
            customer_name: None,
            note: None,
            items: vec![],
        };
        Order::new(1, &input, 0)
    }

    #[test]
    fn test_prepaid_happy_path() {
        let mut o = order(PaymentMode::Prepaid);
        assert_eq!(o.state, OrderState::PendingPayment);

        validate_transition(&o, OrderState::Paid).unwrap();
        enter(&mut o, OrderState::Paid, 10);
        assert_eq!(o.paid_at, Some(10));
        assert_eq!(follow_on(&o), Some(OrderState::InKitchen));
        enter(&mut o, OrderState::InKitchen, 10);

        for (to, ts) in [(OrderState::Ready, 20), (OrderState::Served, 30)] {
            validate_transition(&o, to).unwrap();
            enter(&mut o, to, ts);
        }
        assert_eq!(o.ready_at, Some(20));
        assert_eq!(o.served_at, Some(30));

        // Already paid: served → closed allowed, served → paid not
        validate_transition(&o, OrderState::Closed).unwrap();
        assert!(matches!(
            validate_transition(&o, OrderState::Paid),
            Err(OrderError::StateConflict(Conflict::AlreadyPaid))
        ));
    }

    #[test]
    fn test_pay_later_flow_closes_on_payment() {
        let mut o = order(PaymentMode::PayLater);
        for to in [OrderState::InKitchen, OrderState::Ready, OrderState::Served] {
            validate_transition(&o, to).unwrap();
            enter(&mut o, to, 1);
        }
        assert!(matches!(
            validate_transition(&o, OrderState::Closed),
            Err(OrderError::StateConflict(Conflict::NotPaid { .. }))
        ));
        validate_transition(&o, OrderState::Paid).unwrap();
        enter(&mut o, OrderState::Paid, 2);
        assert_eq!(follow_on(&o), Some(OrderState::Closed));
    }

    #[test]
    fn test_credit_is_never_an_explicit_target() {
        for mode in [PaymentMode::Prepaid, PaymentMode::PayLater] {
            let o = order(mode);
            assert!(validate_transition(&o, OrderState::Credit).is_err());
        }
        let mut o = order(PaymentMode::PayLater);
        o.state = OrderState::Credit;
        assert_eq!(allowed_targets(&o), vec![OrderState::Closed]);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut o = order(PaymentMode::Prepaid);
        o.state = OrderState::Cancelled;
        for to in OrderState::ALL {
            assert!(matches!(
                validate_transition(&o, to),
                Err(OrderError::StateConflict(Conflict::Inactive { .. }))
            ));
        }
    }

    #[test]
    fn test_same_state_is_conflict() {
        let o = order(PaymentMode::PayLater);
        assert!(matches!(
            validate_transition(&o, OrderState::InTable),
            Err(OrderError::StateConflict(Conflict::Transition { .. }))
        ));
    }

    #[test]
    fn test_cancel_only_while_unpaid() {
        let mut o = order(PaymentMode::Prepaid);
        validate_transition(&o, OrderState::Cancelled).unwrap();
        enter(&mut o, OrderState::Paid, 1);
        enter(&mut o, OrderState::InKitchen, 1);
        assert!(validate_transition(&o, OrderState::Cancelled).is_err());
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("in_kitchen").unwrap(), OrderState::InKitchen);
        assert!(matches!(
            parse_target("flying"),
            Err(OrderError::Validation { .. })
        ));
    }
}
