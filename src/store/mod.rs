// ============================================================================
// Order Store - persistence seam for the order aggregate
// ============================================================================
//
// Every write method is one unit of work: either all of its rows are
// committed or none are. Tenant scoping is part of every lookup, and rows
// that belong to another tenant behave exactly like missing rows.
//
// ============================================================================

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderError, OrderUpdate};

mod postgres;
#[cfg(test)]
mod memory;

pub use postgres::{connect, PostgresOrderRepository};
#[cfg(test)]
pub use memory::{FailPoint, InMemoryOrderRepository};

/// Order after an update, with the changes that were actually written
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedOrder {
    pub order: Order,
    pub applied: OrderUpdate,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Whether the customer exists under this tenant
    async fn customer_exists(&self, user_id: Uuid, customer_id: Uuid) -> Result<bool, OrderError>;

    /// Write the order header, its items and its payments together
    async fn insert_order(&self, order: &Order) -> Result<(), OrderError>;

    async fn find_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>, OrderError>;

    /// Lock the order, resolve `update` against its current status and apply
    /// status, notes, payment row and paid amount increment together.
    async fn update_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        update: &OrderUpdate,
    ) -> Result<UpdatedOrder, OrderError>;

    /// Delete the order with its items and payments unless it was delivered
    async fn delete_order(&self, user_id: Uuid, order_id: Uuid) -> Result<(), OrderError>;
}
