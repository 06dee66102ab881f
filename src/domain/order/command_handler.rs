use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::metrics::Metrics;
use crate::store::{OrderRepository, UpdatedOrder};

use super::aggregate::{timestamp_now, Order, OrderDraft, OrderUpdate};
use super::commands::{CreateOrder, DeleteOrder, UpdateOrder};
use super::errors::OrderError;
use super::order_number::OrderNumberGenerator;
use super::transitions::is_valid_transition;
use super::validation::{payment_from_parts, validate_items, ValidatedItems};
use super::value_objects::{NewOrderItem, OrderStatus};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → validation → policy → Repository (one transaction)
//
// Input is fully validated before the repository is touched. Writes are
// never retried here; a failed unit of work leaves nothing behind and the
// caller may resubmit.
//
// ============================================================================

pub struct OrderCommandHandler {
    repository: Arc<dyn OrderRepository>,
    numbers: OrderNumberGenerator,
    metrics: Arc<Metrics>,
}

impl OrderCommandHandler {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        numbers: OrderNumberGenerator,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repository,
            numbers,
            metrics,
        }
    }

    /// Create an order with its items and optional first payment
    pub async fn create_order(&self, command: CreateOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.try_create(command).await;
        self.finish("create_order", started, &result);

        if let Ok(order) = &result {
            self.metrics.orders_created.inc();
            for payment in &order.payments {
                self.metrics.record_payment(payment.method, payment.amount);
            }
        }

        result
    }

    async fn try_create(&self, command: CreateOrder) -> Result<Order, OrderError> {
        let validated = validate_items(&command.items)?;
        let initial_payment = payment_from_parts(command.payment_amount, command.payment_method)?;

        if !self
            .repository
            .customer_exists(command.user_id, command.customer_id)
            .await?
        {
            return Err(OrderError::customer_not_found(command.customer_id));
        }

        let now = timestamp_now();
        let draft = OrderDraft {
            user_id: command.user_id,
            customer_id: command.customer_id,
            order_number: self.numbers.generate(now),
            items: validated.items,
            total_amount: validated.total_amount,
            due_date: command.due_date,
            notes: command.notes,
            initial_payment,
        };

        let order = draft.into_order(now);
        self.repository.insert_order(&order).await?;
        warn_if_overpaid(&order);

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            tenant_id = %order.user_id,
            customer_id = %order.customer_id,
            total_amount = %order.total_amount,
            paid_amount = %order.paid_amount,
            item_count = order.items.len(),
            "Order created"
        );

        Ok(order)
    }

    /// Apply a status change, notes and/or a payment as one unit
    pub async fn update_order(&self, command: UpdateOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.try_update(command).await;
        self.finish("update_order", started, &result);
        result
    }

    async fn try_update(&self, command: UpdateOrder) -> Result<Order, OrderError> {
        let payment = payment_from_parts(command.payment_amount, command.payment_method)?;

        let update = OrderUpdate {
            status: command.status,
            notes: command.notes,
            payment,
        };

        let UpdatedOrder { order, applied } = self
            .repository
            .update_order(command.user_id, command.order_id, &update)
            .await?;

        if applied.status.is_some() {
            self.metrics.record_update("status");
        }
        if applied.notes.is_some() {
            self.metrics.record_update("notes");
        }
        if let Some(payment) = &applied.payment {
            self.metrics.record_update("payment");
            self.metrics.record_payment(payment.method, payment.amount);
            warn_if_overpaid(&order);
        }

        tracing::info!(
            order_id = %order.id,
            tenant_id = %order.user_id,
            status = %order.status,
            paid_amount = %order.paid_amount,
            balance = %order.balance(),
            "Order updated"
        );

        Ok(order)
    }

    /// Delete an order and its dependent rows unless it was delivered
    pub async fn delete_order(&self, command: DeleteOrder) -> Result<(), OrderError> {
        let started = Instant::now();
        let result = self
            .repository
            .delete_order(command.user_id, command.order_id)
            .await;
        self.finish("delete_order", started, &result);

        if result.is_ok() {
            self.metrics.orders_deleted.inc();
            tracing::info!(
                order_id = %command.order_id,
                tenant_id = %command.user_id,
                "Order deleted"
            );
        }

        result
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, OrderError> {
        self.repository
            .find_order(user_id, order_id)
            .await?
            .ok_or_else(|| OrderError::order_not_found(order_id))
    }

    /// Validate a list of items without persisting anything
    pub fn validate_items(&self, items: &[NewOrderItem]) -> Result<ValidatedItems, OrderError> {
        validate_items(items)
    }

    pub fn check_transition(&self, from: OrderStatus, to: OrderStatus) -> bool {
        is_valid_transition(from, to)
    }

    fn finish<T>(&self, operation: &str, started: Instant, result: &Result<T, OrderError>) {
        self.metrics
            .observe_duration(operation, started.elapsed().as_secs_f64());

        if let Err(error) = result {
            self.metrics.record_failure(operation, error.kind());
            match error {
                OrderError::Database(_) | OrderError::Other(_) => {
                    tracing::error!(operation = operation, error = %error, "Order operation failed")
                }
                _ => tracing::warn!(operation = operation, error = %error, "Order operation rejected"),
            }
        }
    }
}

/// Overpayment is accepted; it is only surfaced in the logs.
fn warn_if_overpaid(order: &Order) {
    if order.paid_amount > order.total_amount {
        tracing::warn!(
            order_id = %order.id,
            total_amount = %order.total_amount,
            paid_amount = %order.paid_amount,
            balance = %order.balance(),
            "Order is overpaid"
        );
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
