use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{
    ensure_deletable, timestamp_now, Order, OrderError, OrderItem, OrderStatus, OrderUpdate,
    Payment,
};

use super::{OrderRepository, UpdatedOrder};

// ============================================================================
// In-memory Order Store
// ============================================================================
//
// Keeps orders, items and payments in separate tables like the relational
// store. Writes are staged on a copy of the tables and swapped in only when
// every step succeeded, which gives the same all-or-nothing behaviour as a
// database transaction. A fail point makes one step fail on demand.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertOrder,
    InsertItems,
    InsertPayment,
    UpdateOrder,
    DeleteOrder,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    customers: HashSet<(Uuid, Uuid)>,
    orders: HashMap<Uuid, Order>,
    items: Vec<OrderItem>,
    payments: Vec<Payment>,
}

impl Tables {
    fn assemble(&self, header: &Order) -> Order {
        let mut order = header.clone();
        order.items = self
            .items
            .iter()
            .filter(|item| item.order_id == header.id)
            .cloned()
            .collect();
        order.payments = self
            .payments
            .iter()
            .filter(|payment| payment.order_id == header.id)
            .cloned()
            .collect();
        order
    }

    fn owned_order(&self, user_id: Uuid, order_id: Uuid) -> Option<&Order> {
        self.orders
            .get(&order_id)
            .filter(|order| order.user_id == user_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    tables: Mutex<Tables>,
    fail_point: Mutex<Option<FailPoint>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&self, user_id: Uuid, customer_id: Uuid) {
        self.lock_tables().customers.insert((user_id, customer_id));
    }

    /// Make the next write fail at `point`
    pub fn fail_next(&self, point: FailPoint) {
        *self.fail_point.lock().unwrap_or_else(|e| e.into_inner()) = Some(point);
    }

    pub fn order_count(&self) -> usize {
        self.lock_tables().orders.len()
    }

    pub fn item_count(&self) -> usize {
        self.lock_tables().items.len()
    }

    pub fn payment_count(&self) -> usize {
        self.lock_tables().payments.len()
    }

    /// Overwrite the stored status, bypassing the transition policy
    pub fn force_status(&self, order_id: Uuid, status: OrderStatus) {
        if let Some(order) = self.lock_tables().orders.get_mut(&order_id) {
            order.status = status;
        }
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, point: FailPoint) -> Result<(), OrderError> {
        let mut armed = self.fail_point.lock().unwrap_or_else(|e| e.into_inner());
        if *armed == Some(point) {
            *armed = None;
            return Err(OrderError::Other(anyhow!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn customer_exists(&self, user_id: Uuid, customer_id: Uuid) -> Result<bool, OrderError> {
        Ok(self.lock_tables().customers.contains(&(user_id, customer_id)))
    }

    async fn insert_order(&self, order: &Order) -> Result<(), OrderError> {
        let mut tables = self.lock_tables();
        let mut staged = tables.clone();

        let duplicate = staged.orders.values().any(|existing| {
            existing.user_id == order.user_id && existing.order_number == order.order_number
        });
        if duplicate {
            return Err(OrderError::Conflict(format!(
                "order number {} is already in use",
                order.order_number
            )));
        }

        self.check(FailPoint::InsertOrder)?;
        let mut header = order.clone();
        header.items.clear();
        header.payments.clear();
        staged.orders.insert(order.id, header);

        self.check(FailPoint::InsertItems)?;
        staged.items.extend(order.items.iter().cloned());

        if !order.payments.is_empty() {
            self.check(FailPoint::InsertPayment)?;
            staged.payments.extend(order.payments.iter().cloned());
        }

        *tables = staged;
        Ok(())
    }

    async fn find_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let tables = self.lock_tables();
        Ok(tables
            .owned_order(user_id, order_id)
            .map(|header| tables.assemble(header)))
    }

    async fn update_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        update: &OrderUpdate,
    ) -> Result<UpdatedOrder, OrderError> {
        let mut tables = self.lock_tables();
        let mut staged = tables.clone();

        let current = staged
            .owned_order(user_id, order_id)
            .map(|order| order.status)
            .ok_or_else(|| OrderError::order_not_found(order_id))?;

        let planned = update.plan(current)?;
        if planned.is_noop() {
            return Ok(UpdatedOrder {
                order: tables.assemble(&tables.orders[&order_id]),
                applied: planned,
            });
        }

        let now = timestamp_now();

        self.check(FailPoint::UpdateOrder)?;
        if let Some(header) = staged.orders.get_mut(&order_id) {
            if let Some(status) = planned.status {
                header.status = status;
            }
            if let Some(notes) = &planned.notes {
                header.notes = Some(notes.clone());
            }
            header.paid_amount = header
                .paid_amount
                .checked_add(planned.paid_increment())
                .ok_or_else(|| OrderError::validation("paid amount exceeds the supported amount"))?;
            header.updated_at = now;
        }

        if let Some(request) = planned.payment {
            self.check(FailPoint::InsertPayment)?;
            staged.payments.push(Payment::record(order_id, user_id, request, now));
        }

        *tables = staged;
        Ok(UpdatedOrder {
            order: tables.assemble(&tables.orders[&order_id]),
            applied: planned,
        })
    }

    async fn delete_order(&self, user_id: Uuid, order_id: Uuid) -> Result<(), OrderError> {
        let mut tables = self.lock_tables();

        let status = tables
            .owned_order(user_id, order_id)
            .map(|order| order.status)
            .ok_or_else(|| OrderError::order_not_found(order_id))?;
        ensure_deletable(status)?;

        self.check(FailPoint::DeleteOrder)?;
        tables.orders.remove(&order_id);
        tables.items.retain(|item| item.order_id != order_id);
        tables.payments.retain(|payment| payment.order_id != order_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::order::{Money, OrderDraft, ValidatedItem};

    fn order(user_id: Uuid, order_number: &str) -> Order {
        OrderDraft {
            user_id,
            customer_id: Uuid::new_v4(),
            order_number: order_number.to_string(),
            items: vec![ValidatedItem {
                item_type: "Curtain".to_string(),
                service_type: Some("dry_clean".to_string()),
                quantity: 3,
                price: Money(150),
                notes: None,
            }],
            total_amount: Money(450),
            due_date: Utc::now(),
            notes: None,
            initial_payment: None,
        }
        .into_order(timestamp_now())
    }

    #[tokio::test]
    async fn test_duplicate_order_number_is_conflict() {
        let store = InMemoryOrderRepository::new();
        let tenant = Uuid::new_v4();

        store.insert_order(&order(tenant, "ORD-000042-001")).await.unwrap();
        let result = store.insert_order(&order(tenant, "ORD-000042-001")).await;

        assert!(matches!(result, Err(OrderError::Conflict(_))));
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.item_count(), 1);
    }

    #[tokio::test]
    async fn test_order_number_is_unique_per_tenant() {
        let store = InMemoryOrderRepository::new();

        store.insert_order(&order(Uuid::new_v4(), "ORD-000042-001")).await.unwrap();
        store.insert_order(&order(Uuid::new_v4(), "ORD-000042-001")).await.unwrap();

        assert_eq!(store.order_count(), 2);
    }

    #[tokio::test]
    async fn test_noop_update_reports_nothing_applied() {
        let store = InMemoryOrderRepository::new();
        let tenant = Uuid::new_v4();
        let order = order(tenant, "ORD-000042-002");
        store.insert_order(&order).await.unwrap();

        let update = OrderUpdate {
            status: Some(OrderStatus::Received),
            ..Default::default()
        };
        let updated = store.update_order(tenant, order.id, &update).await.unwrap();

        assert!(updated.applied.is_noop());
        assert_eq!(updated.order.updated_at, order.updated_at);
    }
}
