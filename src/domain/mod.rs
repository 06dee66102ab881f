// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with value objects, commands,
// errors, the aggregate itself and its command handler.
//
// Customers, staff, inventory and expenses are plain records owned by other
// parts of the application. The order flow only checks that a customer exists
// for the tenant.
//
// ============================================================================

pub mod order;
