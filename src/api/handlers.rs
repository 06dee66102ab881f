use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{
    CreateOrder, DeleteOrder, Money, NewOrderItem, OrderStatus, PaymentMethod, UpdateOrder,
};

use super::error::ApiError;
use super::tenant::TenantId;
use super::AppState;

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub payment_amount: Option<Money>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub payment_amount: Option<Money>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateItemsRequest {
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionQuery {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Serialize)]
struct TransitionResponse {
    from: OrderStatus,
    to: OrderStatus,
    allowed: bool,
}

#[derive(Serialize)]
struct DeletedResponse {
    deleted: bool,
    id: Uuid,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_order(
    state: web::Data<AppState>,
    tenant: TenantId,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let order = state
        .orders
        .create_order(CreateOrder {
            user_id: tenant.0,
            customer_id: body.customer_id,
            items: body.items,
            due_date: body.due_date,
            notes: body.notes,
            payment_amount: body.payment_amount,
            payment_method: body.payment_method,
        })
        .await?;

    Ok(HttpResponse::Created().json(order.view()))
}

pub async fn get_order(
    state: web::Data<AppState>,
    tenant: TenantId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let order = state.orders.get_order(tenant.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order.view()))
}

pub async fn update_order(
    state: web::Data<AppState>,
    tenant: TenantId,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let order = state
        .orders
        .update_order(UpdateOrder {
            user_id: tenant.0,
            order_id: path.into_inner(),
            status: body.status,
            notes: body.notes,
            payment_amount: body.payment_amount,
            payment_method: body.payment_method,
        })
        .await?;

    Ok(HttpResponse::Ok().json(order.view()))
}

pub async fn delete_order(
    state: web::Data<AppState>,
    tenant: TenantId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    state
        .orders
        .delete_order(DeleteOrder {
            user_id: tenant.0,
            order_id,
        })
        .await?;

    Ok(HttpResponse::Ok().json(DeletedResponse {
        deleted: true,
        id: order_id,
    }))
}

pub async fn validate_items(
    state: web::Data<AppState>,
    body: web::Json<ValidateItemsRequest>,
) -> Result<HttpResponse, ApiError> {
    let validated = state.orders.validate_items(&body.items)?;
    Ok(HttpResponse::Ok().json(validated))
}

pub async fn check_transition(
    state: web::Data<AppState>,
    query: web::Query<TransitionQuery>,
) -> HttpResponse {
    let TransitionQuery { from, to } = query.into_inner();
    HttpResponse::Ok().json(TransitionResponse {
        from,
        to,
        allowed: state.orders.check_transition(from, to),
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
