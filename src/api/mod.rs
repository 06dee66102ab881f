// ============================================================================
// HTTP API
// ============================================================================
//
// Thin transport over `OrderCommandHandler`. The tenant comes from the
// `X-Tenant-Id` header set by the identity layer in front of this service.
//
// ============================================================================

mod error;
mod handlers;
mod tenant;

use actix_web::web;

use crate::domain::order::OrderCommandHandler;

pub struct AppState {
    pub orders: OrderCommandHandler,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/orders", web::post().to(handlers::create_order))
        .route("/orders/validate-items", web::post().to(handlers::validate_items))
        .route("/orders/{id}", web::get().to(handlers::get_order))
        .route("/orders/{id}", web::patch().to(handlers::update_order))
        .route("/orders/{id}", web::delete().to(handlers::delete_order))
        .route("/order-transitions", web::get().to(handlers::check_transition));
}
