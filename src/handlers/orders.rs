use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::dispatch;
use crate::domain::order::{DeliveryMethod, NewOrder, Order, OrderItemInput};
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemRequest {
    pub title: String,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "149.99"
    pub unit_price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// `delivery` or `pickup`
    pub delivery_method: String,
    pub shipping_address: Option<String>,
    pub items: Vec<CreateOrderItemRequest>,
    pub shipping_fee: Option<String>,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub delivery_method: String,
    pub status: String,
    pub shipping_address: Option<String>,
    pub subtotal: String,
    pub shipping_fee: String,
    pub discount: String,
    pub total_amount: String,
    pub coupon_code: Option<String>,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub payment_intent_id: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            customer_name: o.customer_name,
            customer_email: o.customer_email,
            delivery_method: o.delivery_method.to_string(),
            status: o.status.to_string(),
            shipping_address: o.shipping_address,
            subtotal: o.subtotal.to_string(),
            shipping_fee: o.shipping_fee.to_string(),
            discount: o.discount.to_string(),
            total_amount: o.total_amount.to_string(),
            coupon_code: o.coupon_code,
            payment_status: o.payment_status.to_string(),
            payment_method: o.payment_method,
            payment_intent_id: o.payment_intent_id,
            confirmed_at: o.confirmed_at,
            created_at: o.created_at,
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    id: i.id,
                    title: i.title,
                    quantity: i.quantity,
                    unit_price: i.unit_price.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub order_id: Uuid,
    pub previous_status: String,
    pub status: String,
    /// False when the order was already at the end of its chain.
    pub changed: bool,
}

fn decimal(field: &str, value: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(value.trim())
        .map_err(|_| AppError::BadRequest(format!("{} '{}' is not a decimal", field, value)))
}

impl CreateOrderRequest {
    fn into_domain(self) -> Result<NewOrder, AppError> {
        let delivery_method = DeliveryMethod::from_str(&self.delivery_method)?;
        let items = self
            .items
            .into_iter()
            .map(|i| {
                Ok(OrderItemInput {
                    unit_price: decimal("unitPrice", &i.unit_price)?,
                    title: i.title,
                    quantity: i.quantity,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        let zero_or = |field: &str, v: Option<String>| match v {
            Some(v) => decimal(field, &v),
            None => Ok(BigDecimal::from(0)),
        };
        Ok(NewOrder {
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            delivery_method,
            shipping_address: self.shipping_address,
            items,
            shipping_fee: zero_or("shippingFee", self.shipping_fee)?,
            discount: zero_or("discount", self.discount)?,
            coupon_code: self.coupon_code.filter(|c| !c.trim().is_empty()),
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Records a checked-out order with payment pending. The order, its items
/// and an `OrderCreated` outbox event are written in one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created"),
        (status = 400, description = "Invalid order"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let new_order = body.into_inner().into_domain()?;
    let service = state.orders.clone();
    let id = web::block(move || service.create_order(new_order)).await??;
    Ok(HttpResponse::Created().json(json!({ "id": id })))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let service = state.orders.clone();
    let order = web::block(move || service.get_order(order_id))
        .await??
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/advance
///
/// Staff action: move the order one step along its fulfillment chain. The
/// customer status email is sent after the response.
#[utoipa::path(
    post,
    path = "/orders/{id}/advance",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Status advanced (or already final)", body = StatusChangeResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order changed concurrently"),
    ),
    tag = "orders"
)]
pub async fn advance_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let service = state.orders.clone();
    let update = web::block(move || service.advance_status(order_id)).await??;
    let body = StatusChangeResponse {
        order_id,
        previous_status: update.change.previous.to_string(),
        status: update.change.order.status.to_string(),
        changed: update.change.changed(),
    };
    dispatch(update.followups);
    Ok(HttpResponse::Ok().json(body))
}

/// POST /orders/{id}/complete-pickup
///
/// Staff action: a pickup order has been collected.
#[utoipa::path(
    post,
    path = "/orders/{id}/complete-pickup",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order completed", body = StatusChangeResponse),
        (status = 400, description = "Not a pickup order"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not ready for pickup"),
    ),
    tag = "orders"
)]
pub async fn complete_pickup(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let service = state.orders.clone();
    let update = web::block(move || service.complete_pickup(order_id)).await??;
    let body = StatusChangeResponse {
        order_id,
        previous_status: update.change.previous.to_string(),
        status: update.change.order.status.to_string(),
        changed: update.change.changed(),
    };
    dispatch(update.followups);
    Ok(HttpResponse::Ok().json(body))
}
