use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::order::{
    ensure_deletable, timestamp_now, Money, Order, OrderError, OrderItem, OrderStatus,
    OrderUpdate, Payment, PaymentMethod,
};
use crate::utils::{retry_with_backoff, RetryConfig};

use super::{OrderRepository, UpdatedOrder};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// Each write runs in one transaction. Updates and deletes take a row lock on
// the order (`SELECT ... FOR UPDATE`) before reading its status, and the paid
// amount is incremented in SQL, so two concurrent payments on the same order
// serialize instead of overwriting each other.
//
// ============================================================================

/// Open the connection pool, retrying while the database comes up
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout);

    let retry = RetryConfig::with_attempts(config.connect_attempts);
    let pool = retry_with_backoff(&retry, "postgres_connect", |_attempt| {
        let options = options.clone();
        let url = config.url.clone();
        async move { options.connect(&url).await }
    })
    .await?;

    Ok(pool)
}

#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    customer_id: Uuid,
    status: String,
    total_amount: i64,
    paid_amount: i64,
    due_date: DateTime<Utc>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    item_type: String,
    service_type: Option<String>,
    quantity: i32,
    price: i64,
    notes: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    user_id: Uuid,
    amount: i64,
    method: String,
    date: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>, payments: Vec<Payment>) -> Result<Order, OrderError> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer_id: self.customer_id,
            status: parse_status(&self.status)?,
            total_amount: Money(self.total_amount),
            paid_amount: Money(self.paid_amount),
            due_date: self.due_date,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
            payments,
        })
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            item_type: row.item_type,
            service_type: row.service_type,
            quantity: row.quantity,
            price: Money(row.price),
            notes: row.notes,
        }
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = OrderError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            amount: Money(row.amount),
            method: row
                .method
                .parse::<PaymentMethod>()
                .map_err(|e| OrderError::Other(e.into()))?,
            date: row.date,
        })
    }
}

fn parse_status(value: &str) -> Result<OrderStatus, OrderError> {
    value
        .parse::<OrderStatus>()
        .map_err(|e| OrderError::Other(e.into()))
}

// ============================================================================
// Statements
// ============================================================================

async fn load_order(
    conn: &mut PgConnection,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<Option<Order>, OrderError> {
    let header = sqlx::query_as::<_, OrderRow>(
        "SELECT id, order_number, user_id, customer_id, status, total_amount, paid_amount,
                due_date, notes, created_at, updated_at
         FROM orders
         WHERE id = $1 AND user_id = $2",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, item_type, service_type, quantity, price, notes
         FROM order_items
         WHERE order_id = $1
         ORDER BY position ASC",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(OrderItem::from)
    .collect();

    let payments = sqlx::query_as::<_, PaymentRow>(
        "SELECT id, order_id, user_id, amount, method, date
         FROM payments
         WHERE order_id = $1
         ORDER BY date ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Payment::try_from)
    .collect::<Result<Vec<_>, _>>()?;

    let order = header.into_order(items, payments)?;
    let items_match = order.items_total().ok() == Some(order.total_amount);
    if !items_match || order.payments_total() != order.paid_amount {
        tracing::warn!(
            order_id = %order.id,
            total_amount = %order.total_amount,
            paid_amount = %order.paid_amount,
            payments_total = %order.payments_total(),
            "Stored order amounts do not match its rows"
        );
    }

    Ok(Some(order))
}

/// Current status of a tenant's order, locked until the transaction ends
async fn lock_status(
    conn: &mut PgConnection,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<OrderStatus, OrderError> {
    let status: Option<String> = sqlx::query_scalar(
        "SELECT status FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    match status {
        Some(status) => parse_status(&status),
        None => Err(OrderError::order_not_found(order_id)),
    }
}

async fn insert_payment(conn: &mut PgConnection, payment: &Payment) -> Result<(), OrderError> {
    sqlx::query(
        "INSERT INTO payments (id, order_id, user_id, amount, method, date)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(payment.id)
    .bind(payment.order_id)
    .bind(payment.user_id)
    .bind(payment.amount.minor_units())
    .bind(payment.method.as_str())
    .bind(payment.date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn map_insert_error(err: sqlx::Error, order_number: &str) -> OrderError {
    let unique_violation = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());

    if unique_violation {
        OrderError::Conflict(format!("order number {} is already in use", order_number))
    } else {
        OrderError::Database(err)
    }
}

// ============================================================================
// Repository
// ============================================================================

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn customer_exists(&self, user_id: Uuid, customer_id: Uuid) -> Result<bool, OrderError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1 AND user_id = $2)",
        )
        .bind(customer_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (
                id, order_number, user_id, customer_id, status, total_amount, paid_amount,
                due_date, notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.customer_id)
        .bind(order.status.as_str())
        .bind(order.total_amount.minor_units())
        .bind(order.paid_amount.minor_units())
        .bind(order.due_date)
        .bind(order.notes.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, &order.order_number))?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (
                    id, order_id, position, item_type, service_type, quantity, price, notes
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(position as i32)
            .bind(&item.item_type)
            .bind(item.service_type.as_deref())
            .bind(item.quantity)
            .bind(item.price.minor_units())
            .bind(item.notes.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        for payment in &order.payments {
            insert_payment(&mut tx, payment).await?;
        }

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await?;

        tracing::debug!(
            order_id = %order.id,
            items = order.items.len(),
            payments = order.payments.len(),
            "Committed order rows"
        );

        Ok(())
    }

    async fn find_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, user_id, order_id).await
    }

    async fn update_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        update: &OrderUpdate,
    ) -> Result<UpdatedOrder, OrderError> {
        let mut tx = self.pool.begin().await?;

        let current = lock_status(&mut tx, user_id, order_id).await?;
        let planned = update.plan(current)?;

        if !planned.is_noop() {
            let now = timestamp_now();

            sqlx::query(
                "UPDATE orders
                 SET status = COALESCE($3, status),
                     notes = COALESCE($4, notes),
                     paid_amount = paid_amount + $5,
                     updated_at = $6
                 WHERE id = $1 AND user_id = $2",
            )
            .bind(order_id)
            .bind(user_id)
            .bind(planned.status.map(OrderStatus::as_str))
            .bind(planned.notes.as_deref())
            .bind(planned.paid_increment().minor_units())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if let Some(request) = planned.payment {
                let payment = Payment::record(order_id, user_id, request, now);
                insert_payment(&mut tx, &payment).await?;
            }
        }

        let order = load_order(&mut tx, user_id, order_id)
            .await?
            .ok_or_else(|| OrderError::order_not_found(order_id))?;

        tx.commit().await?;
        Ok(UpdatedOrder {
            order,
            applied: planned,
        })
    }

    async fn delete_order(&self, user_id: Uuid, order_id: Uuid) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await?;

        let status = lock_status(&mut tx, user_id, order_id).await?;
        ensure_deletable(status)?;

        // Items and payments go with the order through ON DELETE CASCADE.
        sqlx::query("DELETE FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_row(method: &str) -> PaymentRow {
        PaymentRow {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: 300,
            method: method.to_string(),
            date: Utc::now(),
        }
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("in_progress").unwrap(), OrderStatus::InProgress);
        assert!(matches!(parse_status("shipped"), Err(OrderError::Other(_))));
    }

    #[test]
    fn test_payment_row_conversion() {
        let payment = Payment::try_from(payment_row("mobile_money")).unwrap();
        assert_eq!(payment.method, PaymentMethod::MobileMoney);
        assert_eq!(payment.amount, Money(300));
    }

    #[test]
    fn test_payment_row_with_unknown_method_fails() {
        let err = Payment::try_from(payment_row("cheque")).unwrap_err();
        assert!(matches!(err, OrderError::Other(_)));
        assert!(err.to_string().contains("cheque"));
    }

    #[test]
    fn test_order_row_with_unknown_status_fails() {
        let now = Utc::now();
        let row = OrderRow {
            id: Uuid::new_v4(),
            order_number: "ORD-000001-001".to_string(),
            user_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            status: "lost".to_string(),
            total_amount: 900,
            paid_amount: 0,
            due_date: now,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(row.into_order(Vec::new(), Vec::new()), Err(OrderError::Other(_))));
    }

    #[test]
    fn test_non_database_insert_error_is_not_conflict() {
        let err = map_insert_error(sqlx::Error::PoolTimedOut, "ORD-000001-001");
        assert!(matches!(err, OrderError::Database(_)));
    }
}
