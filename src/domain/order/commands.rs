use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::value_objects::{Money, NewOrderItem, OrderStatus, PaymentMethod};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================
//
// `user_id` is the tenant the caller acts for. Every command is scoped to it.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub payment_amount: Option<Money>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone)]
pub struct UpdateOrder {
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub payment_amount: Option<Money>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteOrder {
    pub user_id: Uuid,
    pub order_id: Uuid,
}
