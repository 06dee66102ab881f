// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

use crate::domain::order::{Money, PaymentMethod};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order service
// ============================================================================
//
// Provides metrics for:
// - Order creation, updates and deletion
// - Payments recorded (count and amount per method)
// - Failed operations by reason
// - Operation latency
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Order Lifecycle Metrics
    pub orders_created: IntCounter,
    pub order_updates: IntCounterVec,
    pub orders_deleted: IntCounter,

    // Payment Metrics
    pub payments_recorded: IntCounterVec,
    pub payment_amount: IntCounterVec,

    // Operation Metrics
    pub operation_failures: IntCounterVec,
    pub operation_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_updates = IntCounterVec::new(
            Opts::new("order_updates_total", "Order updates by kind of change"),
            &["change"],
        )?;
        registry.register(Box::new(order_updates.clone()))?;

        let orders_deleted = IntCounter::new("orders_deleted_total", "Total orders deleted")?;
        registry.register(Box::new(orders_deleted.clone()))?;

        let payments_recorded = IntCounterVec::new(
            Opts::new("payments_recorded_total", "Payments recorded against orders"),
            &["method"],
        )?;
        registry.register(Box::new(payments_recorded.clone()))?;

        let payment_amount = IntCounterVec::new(
            Opts::new("payment_amount_minor_total", "Sum of recorded payments in minor units"),
            &["method"],
        )?;
        registry.register(Box::new(payment_amount.clone()))?;

        let operation_failures = IntCounterVec::new(
            Opts::new("order_operation_failures_total", "Order operations that failed"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(operation_failures.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Order operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_updates,
            orders_deleted,
            payments_recorded,
            payment_amount,
            operation_failures,
            operation_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_payment(&self, method: PaymentMethod, amount: Money) {
        let label = method.as_str();
        self.payments_recorded.with_label_values(&[label]).inc();
        // Amounts are validated positive before they get here.
        self.payment_amount
            .with_label_values(&[label])
            .inc_by(amount.minor_units().max(0) as u64);
    }

    pub fn record_update(&self, change: &str) {
        self.order_updates.with_label_values(&[change]).inc();
    }

    pub fn record_failure(&self, operation: &str, reason: &str) {
        self.operation_failures.with_label_values(&[operation, reason]).inc();
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        server::encode(&self.registry)
    }
}
