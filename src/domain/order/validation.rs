use serde::Serialize;

use super::calculator::{compute_total, PricedLine};
use super::errors::OrderError;
use super::value_objects::{Money, NewOrderItem, PaymentMethod, PaymentRequest, ValidatedItem};

// ============================================================================
// Order Item Validator
// ============================================================================
//
// Stops at the first violation in submission order. Values are never coerced:
// anything out of range is rejected as submitted.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedItems {
    pub items: Vec<ValidatedItem>,
    pub total_amount: Money,
}

impl PricedLine for ValidatedItem {
    fn quantity(&self) -> i32 {
        self.quantity
    }

    fn unit_price(&self) -> Money {
        self.price
    }
}

pub fn validate_items(items: &[NewOrderItem]) -> Result<ValidatedItems, OrderError> {
    if items.is_empty() {
        return Err(OrderError::validation("at least one item is required"));
    }

    let mut validated = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        validated.push(validate_item(index + 1, item)?);
    }

    let total_amount = compute_total(&validated)?;

    Ok(ValidatedItems {
        items: validated,
        total_amount,
    })
}

fn validate_item(position: usize, item: &NewOrderItem) -> Result<ValidatedItem, OrderError> {
    let item_type = match item.item_type.as_deref() {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => {
            return Err(OrderError::validation(format!(
                "item {}: item type is required",
                position
            )))
        }
    };

    let quantity = match item.quantity {
        Some(quantity) if quantity > 0 => quantity,
        Some(quantity) => {
            return Err(OrderError::validation(format!(
                "item {}: quantity must be greater than zero, got {}",
                position, quantity
            )))
        }
        None => {
            return Err(OrderError::validation(format!(
                "item {}: quantity is required",
                position
            )))
        }
    };

    let price = match item.price {
        Some(price) if price.is_positive() => price,
        Some(price) => {
            return Err(OrderError::validation(format!(
                "item {}: price must be greater than zero, got {}",
                position, price
            )))
        }
        None => {
            return Err(OrderError::validation(format!(
                "item {}: price is required",
                position
            )))
        }
    };

    Ok(ValidatedItem {
        item_type,
        service_type: item.service_type.clone(),
        quantity,
        price,
        notes: item.notes.clone(),
    })
}

/// Combine optional amount and method into a payment to apply.
///
/// A zero or absent amount means no payment. A negative amount, or a
/// positive amount without a method, is rejected.
pub fn payment_from_parts(
    amount: Option<Money>,
    method: Option<PaymentMethod>,
) -> Result<Option<PaymentRequest>, OrderError> {
    match (amount, method) {
        (Some(amount), _) if amount.minor_units() < 0 => Err(OrderError::validation(format!(
            "payment amount cannot be negative, got {}",
            amount
        ))),
        (Some(amount), Some(method)) if amount.is_positive() => {
            Ok(Some(PaymentRequest { amount, method }))
        }
        (Some(amount), None) if amount.is_positive() => Err(OrderError::validation(
            "payment method is required when a payment amount is given",
        )),
        _ => Ok(None),
    }
}
