// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (Money, OrderStatus, PaymentMethod, ...)
// - Aggregate (Order, OrderItem, Payment, drafts and updates)
// - Pure policies (item validation, totals, transitions, order numbers)
// - Commands and errors
// - Command Handler (OrderCommandHandler)
//
// Persistence lives behind `crate::store::OrderRepository`.
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod calculator;
pub mod validation;
pub mod transitions;
pub mod order_number;
pub mod aggregate;
pub mod commands;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use transitions::*;
pub use order_number::*;
pub use aggregate::*;
pub use commands::*;
pub use command_handler::*;
