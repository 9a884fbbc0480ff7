use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    DeliveryMethod, NewOrder, Order, OrderItem, OutcomeApplied, PaymentAttempt, PaymentOutcome,
    PaymentStatus, StatusChange,
};
use crate::domain::ports::OrderRepository;
use crate::domain::status::{OrderStatus, CONFIRMED_LITERAL};
use crate::schema::{order_items, order_outbox, orders, payment_attempts};

use super::models::{
    NewOrderItemRow, NewOrderRow, NewOutboxEventRow, NewPaymentAttemptRow, OrderItemRow, OrderRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn to_domain(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
    let status = OrderStatus::parse(&row.status).ok_or_else(|| {
        DomainError::Internal(format!("order {} has unknown status '{}'", row.id, row.status))
    })?;
    let delivery_method = row
        .delivery_method
        .parse::<DeliveryMethod>()
        .map_err(|e| DomainError::Internal(e.to_string()))?;
    let payment_status = row
        .payment_status
        .parse::<PaymentStatus>()
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    Ok(Order {
        id: row.id,
        customer_name: row.customer_name,
        customer_email: row.customer_email,
        customer_phone: row.customer_phone,
        delivery_method,
        status,
        shipping_address: row.shipping_address,
        items: items
            .into_iter()
            .map(|i| OrderItem {
                id: i.id,
                title: i.title,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect(),
        subtotal: row.subtotal,
        shipping_fee: row.shipping_fee,
        discount: row.discount,
        total_amount: row.total_amount,
        coupon_code: row.coupon_code,
        payment_status,
        payment_method: row.payment_method,
        payment_intent_id: row.payment_intent_id,
        payment_method_id: row.payment_method_id,
        payment_id: row.payment_id,
        paid_at: row.paid_at,
        failed_at: row.failed_at,
        qr_code_expired_at: row.qr_code_expired_at,
        confirmed_at: row.confirmed_at,
        payment_failed_reason: row.payment_failed_reason,
        payment_failed_code: row.payment_failed_code,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn load_items(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderItemRow>, DomainError> {
    Ok(order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::created_at.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?)
}

/// Outbox rows are written inside the caller's transaction.
fn write_outbox(
    conn: &mut PgConnection,
    order_id: Uuid,
    event_type: &str,
    payload: serde_json::Value,
) -> Result<(), DomainError> {
    diesel::insert_into(order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order_id.to_string(),
            event_type: event_type.to_string(),
            payload,
        })
        .execute(conn)?;
    Ok(())
}

fn order_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, DomainError> {
    Ok(diesel::select(diesel::dsl::exists(orders::table.filter(orders::id.eq(id))))
        .get_result(conn)?)
}

/// Order that issued `payment_intent_id`, with the method bound to that intent.
struct IntentOwner {
    order_id: Uuid,
    payment_method_id: Option<String>,
    current: bool,
}

fn find_intent_owner(
    conn: &mut PgConnection,
    payment_intent_id: &str,
) -> Result<Option<IntentOwner>, DomainError> {
    let current = orders::table
        .filter(orders::payment_intent_id.eq(payment_intent_id))
        .select((orders::id, orders::payment_method_id))
        .first::<(Uuid, Option<String>)>(conn)
        .optional()?;
    if let Some((order_id, payment_method_id)) = current {
        return Ok(Some(IntentOwner {
            order_id,
            payment_method_id,
            current: true,
        }));
    }

    let earlier = payment_attempts::table
        .filter(payment_attempts::payment_intent_id.eq(payment_intent_id))
        .select((payment_attempts::order_id, payment_attempts::payment_method_id))
        .first::<(Uuid, String)>(conn)
        .optional()?;
    Ok(earlier.map(|(order_id, payment_method_id)| IntentOwner {
        order_id,
        payment_method_id: Some(payment_method_id),
        current: false,
    }))
}

/// Why an outcome for a known intent wrote nothing.
fn unchanged(conn: &mut PgConnection, order_id: Uuid) -> Result<OutcomeApplied, DomainError> {
    let payment_status = orders::table
        .filter(orders::id.eq(order_id))
        .select(orders::payment_status)
        .first::<String>(conn)?;
    Ok(if payment_status == PaymentStatus::Paid.as_str() {
        OutcomeApplied::AlreadySettled(order_id)
    } else {
        OutcomeApplied::Superseded(order_id)
    })
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        let subtotal = order.subtotal();
        let total = order.total();

        conn.transaction::<_, DomainError, _>(|conn| {
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    customer_name: order.customer_name.clone(),
                    customer_email: order.customer_email.clone(),
                    customer_phone: order.customer_phone.clone(),
                    delivery_method: order.delivery_method.as_str().to_string(),
                    status: OrderStatus::Pending.as_str().to_string(),
                    shipping_address: order.shipping_address.clone(),
                    subtotal: subtotal.clone(),
                    shipping_fee: order.shipping_fee.clone(),
                    discount: order.discount.clone(),
                    total_amount: total.clone(),
                    coupon_code: order.coupon_code.clone(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                })
                .execute(conn)?;

            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .map(|i| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    title: i.title.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            let item_payloads: Vec<serde_json::Value> = order
                .items
                .iter()
                .map(|i| {
                    json!({
                        "title": i.title,
                        "quantity": i.quantity,
                        "unit_price": i.unit_price.to_string()
                    })
                })
                .collect();
            write_outbox(
                conn,
                order_id,
                "OrderCreated",
                json!({
                    "order_id": order_id,
                    "delivery_method": order.delivery_method.as_str(),
                    "status": OrderStatus::Pending.as_str(),
                    "total_amount": total.to_string(),
                    "items": item_payloads
                }),
            )?;

            Ok(order_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = load_items(&mut conn, order.id)?;
        to_domain(order, items).map(Some)
    }

    fn record_payment_attempt(
        &self,
        id: Uuid,
        attempt: &PaymentAttempt,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::payment_status.ne(PaymentStatus::Paid.as_str())),
            )
            .set((
                orders::payment_intent_id.eq(Some(attempt.payment_intent_id.as_str())),
                orders::payment_method_id.eq(Some(attempt.payment_method_id.as_str())),
                orders::payment_method.eq(Some(attempt.payment_method.as_str())),
                orders::payment_status.eq(PaymentStatus::Pending.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

            if updated == 0 {
                return Err(if order_exists(conn, id)? {
                    DomainError::Conflict(format!("order {} is already paid", id))
                } else {
                    DomainError::NotFound
                });
            }

            diesel::insert_into(payment_attempts::table)
                .values(&NewPaymentAttemptRow {
                    payment_intent_id: &attempt.payment_intent_id,
                    order_id: id,
                    payment_method_id: &attempt.payment_method_id,
                })
                .on_conflict_do_nothing()
                .execute(conn)?;

            write_outbox(
                conn,
                id,
                "PaymentAttemptRecorded",
                json!({
                    "order_id": id,
                    "payment_intent_id": attempt.payment_intent_id,
                    "payment_method_id": attempt.payment_method_id,
                    "payment_method": attempt.payment_method,
                }),
            )
        })
    }

    fn apply_payment_outcome(
        &self,
        payment_intent_id: &str,
        outcome: &PaymentOutcome,
        at: DateTime<Utc>,
    ) -> Result<OutcomeApplied, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let Some(owner) = find_intent_owner(conn, payment_intent_id)? else {
                return Ok(OutcomeApplied::UnknownIntent);
            };
            let paid = matches!(outcome, PaymentOutcome::Paid { .. });
            if !owner.current && !paid {
                return unchanged(conn, owner.order_id);
            }

            let unpaid = orders::table
                .filter(orders::id.eq(owner.order_id))
                .filter(orders::payment_status.ne(PaymentStatus::Paid.as_str()));

            let (row, event_type) = match outcome {
                // Points the order back at the intent that was actually paid.
                PaymentOutcome::Paid { payment_id } => (
                    diesel::update(unpaid)
                        .set((
                            orders::payment_status.eq(PaymentStatus::Paid.as_str()),
                            orders::payment_intent_id.eq(Some(payment_intent_id)),
                            orders::payment_method_id.eq(owner.payment_method_id.as_deref()),
                            orders::payment_id.eq(payment_id.as_deref()),
                            orders::paid_at.eq(Some(at)),
                            orders::status.eq(CONFIRMED_LITERAL),
                            orders::confirmed_at.eq(Some(at)),
                            orders::updated_at.eq(at),
                        ))
                        .returning(OrderRow::as_returning())
                        .get_result(conn)
                        .optional()?,
                    "PaymentConfirmed",
                ),
                PaymentOutcome::Failed { reason, code } => (
                    diesel::update(unpaid.filter(orders::payment_intent_id.eq(payment_intent_id)))
                        .set((
                            orders::payment_status.eq(PaymentStatus::Failed.as_str()),
                            orders::payment_failed_reason.eq(reason.as_deref()),
                            orders::payment_failed_code.eq(code.as_deref()),
                            orders::failed_at.eq(Some(at)),
                            orders::status.eq(OrderStatus::PaymentFailed.as_str()),
                            orders::updated_at.eq(at),
                        ))
                        .returning(OrderRow::as_returning())
                        .get_result(conn)
                        .optional()?,
                    "PaymentFailed",
                ),
                PaymentOutcome::Expired => (
                    diesel::update(unpaid.filter(orders::payment_intent_id.eq(payment_intent_id)))
                        .set((
                            orders::payment_status.eq(PaymentStatus::Expired.as_str()),
                            orders::qr_code_expired_at.eq(Some(at)),
                            orders::status.eq(OrderStatus::QrcodeExpired.as_str()),
                            orders::updated_at.eq(at),
                        ))
                        .returning(OrderRow::as_returning())
                        .get_result(conn)
                        .optional()?,
                    "QrCodeExpired",
                ),
            };

            let Some(row) = row else {
                return unchanged(conn, owner.order_id);
            };

            write_outbox(
                conn,
                row.id,
                event_type,
                json!({
                    "order_id": row.id,
                    "payment_intent_id": payment_intent_id,
                    "payment_status": row.payment_status,
                    "status": row.status,
                    "payment_id": row.payment_id,
                    "payment_failed_code": row.payment_failed_code,
                }),
            )?;

            let items = load_items(conn, row.id)?;
            to_domain(row, items).map(OutcomeApplied::Applied)
        })
    }

    fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusChange, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::status.eq_any(from.stored_aliases().to_vec())),
            )
            .set((
                orders::status.eq(to.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .returning(OrderRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(row) = row else {
                return Err(if order_exists(conn, id)? {
                    DomainError::Conflict(format!("order {} is no longer {}", id, from))
                } else {
                    DomainError::NotFound
                });
            };

            write_outbox(
                conn,
                id,
                "OrderStatusChanged",
                json!({ "order_id": id, "from": from.as_str(), "to": to.as_str() }),
            )?;

            let items = load_items(conn, id)?;
            Ok(StatusChange {
                order: to_domain(row, items)?,
                previous: from,
            })
        })
    }
}
