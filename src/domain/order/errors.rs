use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing rows and rows owned by another tenant are reported the same way.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrderError {
    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::Validation(message.into())
    }

    pub fn order_not_found(id: Uuid) -> Self {
        OrderError::NotFound { entity: "Order", id }
    }

    pub fn customer_not_found(id: Uuid) -> Self {
        OrderError::NotFound { entity: "Customer", id }
    }

    /// Short label used for metrics and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "validation",
            OrderError::NotFound { .. } => "not_found",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::Conflict(_) => "conflict",
            OrderError::Database(_) | OrderError::Other(_) => "internal",
        }
    }
}
