//! Money calculation utilities using rust_decimal for precision
//!
//! All amounts are `Decimal`, rounded to 2 places half-up (midpoint away
//! from zero). Only billing lines carry money; decomposition lines stay zero.

use rust_decimal::prelude::*;
use shared::error::ErrorCode;
use shared::order::OrderSnapshot;

use super::error::OrderError;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// IVA 13%
pub const IVA_RATE: Decimal = Decimal::from_parts(13, 0, 0, false, 2);

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;

/// Maximum allowed tip / credit amount
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

pub fn validate_quantity(quantity: u32) -> Result<(), OrderError> {
    if quantity == 0 {
        return Err(OrderError::invalid(
            ErrorCode::ValueOutOfRange,
            "quantity must be positive, got 0",
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(OrderError::invalid(
            ErrorCode::ValueOutOfRange,
            format!(
                "quantity exceeds maximum allowed ({}), got {}",
                MAX_QUANTITY, quantity
            ),
        ));
    }
    Ok(())
}

pub fn validate_tip(tip: Decimal) -> Result<(), OrderError> {
    if tip < Decimal::ZERO {
        return Err(OrderError::invalid(
            ErrorCode::ValueOutOfRange,
            format!("tip must be non-negative, got {}", tip),
        ));
    }
    if tip > MAX_AMOUNT {
        return Err(OrderError::invalid(
            ErrorCode::ValueOutOfRange,
            format!("tip exceeds maximum allowed ({}), got {}", MAX_AMOUNT, tip),
        ));
    }
    Ok(())
}

pub fn validate_credit_amount(amount: Decimal) -> Result<(), OrderError> {
    if amount <= Decimal::ZERO {
        return Err(OrderError::invalid(
            ErrorCode::ValueOutOfRange,
            format!("credit amount must be positive, got {}", amount),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(OrderError::invalid(
            ErrorCode::ValueOutOfRange,
            format!(
                "credit amount exceeds maximum allowed ({}), got {}",
                MAX_AMOUNT, amount
            ),
        ));
    }
    Ok(())
}

/// Recalculate line and order totals
///
/// For each billing line: subtotal = unit_price × quantity,
/// tax = round(subtotal × rate), line_total = subtotal + tax.
/// Order: subtotal = Σ subtotal, tax = Σ tax, total = subtotal + tax + tip.
/// The rate is 0 for tax-exempt orders.
pub fn recalculate_totals(snapshot: &mut OrderSnapshot) {
    let rate = if snapshot.order.tax_exempt {
        Decimal::ZERO
    } else {
        IVA_RATE
    };

    let mut subtotal = Decimal::ZERO;
    let mut tax = Decimal::ZERO;

    for item in &mut snapshot.items {
        if !item.is_billing() {
            item.subtotal = Decimal::ZERO;
            item.tax_rate = Decimal::ZERO;
            item.tax_amount = Decimal::ZERO;
            item.line_total = Decimal::ZERO;
            continue;
        }

        let line_subtotal = round_money(item.unit_price * Decimal::from(item.quantity));
        let line_tax = round_money(line_subtotal * rate);

        item.subtotal = line_subtotal;
        item.tax_rate = rate;
        item.tax_amount = line_tax;
        item.line_total = line_subtotal + line_tax;

        subtotal += line_subtotal;
        tax += line_tax;
    }

    let order = &mut snapshot.order;
    order.subtotal = subtotal;
    order.tax = tax;
    order.tip = round_money(order.tip);
    order.total = subtotal + tax + order.tip;
}
