use super::errors::OrderError;
use super::value_objects::{Money, PaymentStatus};

// ============================================================================
// Total & Balance Calculator
// ============================================================================

/// Anything with a quantity and a unit price
pub trait PricedLine {
    fn quantity(&self) -> i32;
    fn unit_price(&self) -> Money;
}

/// Sum of `quantity * price` over all lines.
///
/// Fails only when the sum does not fit in the money type.
pub fn compute_total<'a, L, I>(lines: I) -> Result<Money, OrderError>
where
    L: PricedLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines.into_iter().try_fold(Money::ZERO, |total, line| {
        line.unit_price()
            .checked_times(line.quantity())
            .and_then(|amount| total.checked_add(amount))
            .ok_or_else(|| OrderError::validation("order total exceeds the supported amount"))
    })
}

/// Amount still owed. Negative when the order is overpaid.
pub fn compute_balance(total_amount: Money, paid_amount: Money) -> Money {
    total_amount - paid_amount
}

pub fn payment_status(total_amount: Money, paid_amount: Money) -> PaymentStatus {
    if paid_amount >= total_amount {
        PaymentStatus::Paid
    } else if paid_amount.is_positive() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}
