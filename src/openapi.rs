use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{orders, payments, webhooks};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QR Ph Checkout API",
        version = "0.1.0",
        description = "QR Ph payment initiation, gateway webhook reconciliation and order fulfillment."
    ),
    tags(
        (name = "orders", description = "Checkout hand-off and staff fulfillment actions"),
        (name = "payments", description = "QR Ph payment initiation and status polling"),
        (name = "webhooks", description = "Gateway event reconciliation"),
    ),
    paths(
        orders::create_order,
        orders::get_order,
        orders::advance_status,
        orders::complete_pickup,
        payments::create_qrph_payment,
        payments::payment_status,
        webhooks::paymongo_webhook,
    ),
    components(schemas(
        orders::CreateOrderRequest,
        orders::CreateOrderItemRequest,
        orders::OrderResponse,
        orders::OrderItemResponse,
        orders::StatusChangeResponse,
        payments::CreateQrPaymentRequest,
        payments::QrPaymentResponse,
        payments::PaymentStatusResponse,
    ))
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi())
}
