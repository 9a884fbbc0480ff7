use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::Order;
use crate::domain::ports::Notifier;
use crate::domain::status::OrderStatus;

/// Message handed to the mail relay.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: &'static str,
    pub to: String,
    pub subject: String,
    pub order_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub total_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
}

impl Notification {
    fn order_confirmation(order: &Order, to: String) -> Self {
        Self {
            kind: "order_confirmation",
            to,
            subject: format!("Payment received for order {}", order.id),
            order_id: order.id,
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            total_amount: order.total_amount.to_string(),
            previous_status: None,
        }
    }

    fn staff_alert(order: &Order, to: String) -> Self {
        Self {
            kind: "staff_order_alert",
            to,
            subject: format!("New paid {} order {}", order.delivery_method, order.id),
            order_id: order.id,
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            total_amount: order.total_amount.to_string(),
            previous_status: None,
        }
    }

    fn status_update(order: &Order, previous: OrderStatus, to: String) -> Self {
        Self {
            kind: "status_update",
            to,
            subject: format!("Your order {} is now {}", order.id, order.status),
            order_id: order.id,
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            total_amount: order.total_amount.to_string(),
            previous_status: Some(previous.to_string()),
        }
    }
}

fn customer_address(order: &Order) -> Result<String, DomainError> {
    order
        .customer_email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            DomainError::InvalidInput(format!("order {} has no customer email", order.id))
        })
}

/// Posts notifications as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    http: Client,
    endpoint: String,
    staff_email: Option<String>,
}

impl HttpNotifier {
    pub fn new(
        endpoint: impl Into<String>,
        staff_email: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("notifier client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            staff_email,
        })
    }

    fn deliver(&self, message: &Notification) -> Result<(), DomainError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(message)
            .send()
            .map_err(|e| DomainError::Internal(format!("notification relay unreachable: {}", e)))?;
        if !response.status().is_success() {
            return Err(DomainError::Internal(format!(
                "notification relay answered {} for {}",
                response.status(),
                message.kind
            )));
        }
        log::debug!("Sent {} for order {}", message.kind, message.order_id);
        Ok(())
    }
}

impl Notifier for HttpNotifier {
    fn send_order_confirmation(&self, order: &Order) -> Result<(), DomainError> {
        self.deliver(&Notification::order_confirmation(
            order,
            customer_address(order)?,
        ))
    }

    fn send_staff_order_alert(&self, order: &Order) -> Result<(), DomainError> {
        let Some(staff) = self.staff_email.clone() else {
            log::debug!("No staff address configured; skipping alert for {}", order.id);
            return Ok(());
        };
        self.deliver(&Notification::staff_alert(order, staff))
    }

    fn send_status_update(&self, order: &Order, previous: OrderStatus) -> Result<(), DomainError> {
        self.deliver(&Notification::status_update(
            order,
            previous,
            customer_address(order)?,
        ))
    }
}

/// Used when no relay is configured: notifications only reach the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_order_confirmation(&self, order: &Order) -> Result<(), DomainError> {
        log::info!(
            "[notify] payment confirmation for order {} to {:?}",
            order.id,
            order.customer_email
        );
        Ok(())
    }

    fn send_staff_order_alert(&self, order: &Order) -> Result<(), DomainError> {
        log::info!(
            "[notify] staff alert: new paid {} order {} ({})",
            order.delivery_method,
            order.id,
            order.total_amount
        );
        Ok(())
    }

    fn send_status_update(&self, order: &Order, previous: OrderStatus) -> Result<(), DomainError> {
        log::info!(
            "[notify] order {} moved {} -> {}",
            order.id,
            previous,
            order.status
        );
        Ok(())
    }
}
