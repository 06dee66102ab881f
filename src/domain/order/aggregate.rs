use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calculator::{compute_balance, compute_total, payment_status, PricedLine};
use super::errors::OrderError;
use super::transitions::plan_status_change;
use super::value_objects::{
    Money, OrderStatus, PaymentMethod, PaymentRequest, PaymentStatus, ValidatedItem,
};

// ============================================================================
// Order Aggregate
// ============================================================================

/// Current time at the microsecond precision a `TIMESTAMPTZ` column keeps
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub order_number: String,

    // Ownership
    pub user_id: Uuid,
    pub customer_id: Uuid,

    // State
    pub status: OrderStatus,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_type: String,
    pub service_type: Option<String>,
    pub quantity: i32,
    pub price: Money,
    pub notes: Option<String>,
}

impl PricedLine for OrderItem {
    fn quantity(&self) -> i32 {
        self.quantity
    }

    fn unit_price(&self) -> Money {
        self.price
    }
}

/// Append-only record of money applied to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: Money,
    pub method: PaymentMethod,
    pub date: DateTime<Utc>,
}

impl Payment {
    pub fn record(order_id: Uuid, user_id: Uuid, request: PaymentRequest, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            user_id,
            amount: request.amount,
            method: request.method,
            date,
        }
    }
}

impl Order {
    pub fn balance(&self) -> Money {
        compute_balance(self.total_amount, self.paid_amount)
    }

    pub fn payment_status(&self) -> PaymentStatus {
        payment_status(self.total_amount, self.paid_amount)
    }

    /// Total recomputed from the line items
    pub fn items_total(&self) -> Result<Money, OrderError> {
        compute_total(&self.items)
    }

    /// Sum of recorded payments
    pub fn payments_total(&self) -> Money {
        self.payments
            .iter()
            .fold(Money::ZERO, |sum, payment| Money(sum.0.saturating_add(payment.amount.0)))
    }

    pub fn view(self) -> OrderView {
        OrderView {
            balance: self.balance(),
            payment_status: self.payment_status(),
            order: self,
        }
    }
}

/// Order plus the amounts derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub balance: Money,
    pub payment_status: PaymentStatus,
}

// ============================================================================
// Draft - a fully validated order that has not been persisted yet
// ============================================================================

#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub order_number: String,
    pub items: Vec<ValidatedItem>,
    pub total_amount: Money,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub initial_payment: Option<PaymentRequest>,
}

impl OrderDraft {
    /// Assign ids and build the rows that a store must write together.
    ///
    /// The initial payment is applied as the first payment: one payment row
    /// and a paid amount equal to it.
    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        let order_id = Uuid::new_v4();

        let items = self
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                item_type: item.item_type,
                service_type: item.service_type,
                quantity: item.quantity,
                price: item.price,
                notes: item.notes,
            })
            .collect();

        let payments: Vec<Payment> = self
            .initial_payment
            .into_iter()
            .map(|request| Payment::record(order_id, self.user_id, request, now))
            .collect();

        let paid_amount = payments
            .iter()
            .fold(Money::ZERO, |sum, payment| Money(sum.0.saturating_add(payment.amount.0)));

        Order {
            id: order_id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer_id: self.customer_id,
            status: OrderStatus::Received,
            total_amount: self.total_amount,
            paid_amount,
            due_date: self.due_date,
            notes: self.notes,
            created_at: now,
            updated_at: now,
            items,
            payments,
        }
    }
}

// ============================================================================
// Update - changes requested against an existing order
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub payment: Option<PaymentRequest>,
}

impl OrderUpdate {
    /// Resolve the requested status against the order's current (locked)
    /// status. An unchanged status drops out of the returned update.
    pub fn plan(&self, current: OrderStatus) -> Result<OrderUpdate, OrderError> {
        Ok(OrderUpdate {
            status: plan_status_change(current, self.status)?,
            notes: self.notes.clone(),
            payment: self.payment,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.status.is_none() && self.notes.is_none() && self.payment.is_none()
    }

    /// Amount to add to `paid_amount` in the same write as the payment row
    pub fn paid_increment(&self) -> Money {
        self.payment.map(|p| p.amount).unwrap_or(Money::ZERO)
    }
}
