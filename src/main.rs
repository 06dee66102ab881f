use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod metrics;
mod store;
mod utils;

use api::AppState;
use config::Config;
use domain::order::{OrderCommandHandler, OrderNumberGenerator};
use store::PostgresOrderRepository;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Structured logging, overridable with RUST_LOG
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,laundry_orders=debug")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        metrics_port = config.server.metrics_port,
        "🚀 Starting laundry order service"
    );

    // === 1. Database ===
    tracing::info!("Connecting to PostgreSQL...");
    let pool = store::connect(&config.database).await?;
    let repository = PostgresOrderRepository::new(pool);
    repository.migrate().await?;
    tracing::info!("Database migrations applied");

    // === 2. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Order handling ===
    let orders = OrderCommandHandler::new(
        Arc::new(repository),
        OrderNumberGenerator::new(config.order_number_prefix.clone()),
        metrics.clone(),
    );
    let state = web::Data::new(AppState { orders });

    // === 4. Servers ===
    let api_server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run();

    let metrics_server =
        metrics::start_metrics_server(metrics, config.server.host.clone(), config.server.metrics_port);

    tracing::info!("✅ Order API listening on {}:{}", config.server.host, config.server.port);
    tokio::try_join!(api_server, metrics_server)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
