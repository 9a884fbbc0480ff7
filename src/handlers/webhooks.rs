use actix_web::{web, HttpResponse};
use serde_json::json;

use super::dispatch;
use crate::application::webhook_processor::Disposition;
use crate::infrastructure::paymongo::parse_webhook;
use crate::AppState;

/// POST /webhooks/paymongo
///
/// Reconciles a gateway event against its order. Once the envelope parses,
/// the gateway always gets `200 {"success": true}`: failures after that point
/// are logged, and follow-up emails run after the response is decided.
#[utoipa::path(
    post,
    path = "/webhooks/paymongo",
    request_body(
        content = String,
        content_type = "application/json",
        description = "Gateway event envelope, read as raw bytes"
    ),
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Body is not a gateway event envelope"),
    ),
    tag = "webhooks"
)]
pub async fn paymongo_webhook(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let event = match parse_webhook(&body) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("Rejecting unparsable webhook body: {}", e);
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": format!("invalid webhook payload: {}", e),
            }));
        }
    };
    log::info!(
        "Webhook {:?} received: {} for intent {:?}",
        event.id,
        event.kind.as_str(),
        event.payment_intent_id
    );

    let processor = state.webhooks.clone();
    match web::block(move || processor.process(&event)).await {
        Ok(Ok(outcome)) => {
            if let Disposition::Ignored(kind) = &outcome.disposition {
                log::debug!("Webhook of type {} acknowledged without changes", kind);
            }
            dispatch(outcome.followups);
        }
        Ok(Err(e)) => log::error!("Webhook reconciliation failed, acknowledging anyway: {}", e),
        Err(e) => log::error!("Webhook worker failed, acknowledging anyway: {}", e),
    }

    HttpResponse::Ok().json(json!({ "success": true }))
}
