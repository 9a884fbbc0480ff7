use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{DeliveryMethod, NewOrder, Order, StatusChange};
use crate::domain::ports::{Notifier, OrderRepository};
use crate::domain::status::OrderStatus;

use super::side_effects::NonCriticalTasks;

/// A committed staff status change plus the notification it triggers.
#[derive(Debug)]
pub struct StatusUpdate {
    pub change: StatusChange,
    pub followups: NonCriticalTasks,
}

pub struct OrderService<R, N> {
    repo: R,
    notifier: N,
}

impl<R: OrderRepository, N: Notifier + Clone> OrderService<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self { repo, notifier }
    }

    pub fn create_order(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        order.validate()?;
        self.repo.create(order)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        self.repo.find_by_id(id)
    }

    /// Move the order one step along its delivery-method chain. Already
    /// terminal orders come back unchanged with no follow-ups.
    pub fn advance_status(&self, id: Uuid) -> Result<StatusUpdate, DomainError> {
        let order = self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)?;
        let previous = order.status;
        let next = previous.next(order.delivery_method);
        if next == previous {
            return Ok(StatusUpdate {
                change: StatusChange { order, previous },
                followups: NonCriticalTasks::new(),
            });
        }
        self.commit(id, previous, next)
    }

    /// Staff confirmation that a pickup order has been collected.
    pub fn complete_pickup(&self, id: Uuid) -> Result<StatusUpdate, DomainError> {
        let order = self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)?;
        if order.delivery_method != DeliveryMethod::Pickup {
            return Err(DomainError::InvalidInput(
                "only pickup orders can be completed at the counter".to_string(),
            ));
        }
        if order.status != OrderStatus::ReadyForPickup {
            return Err(DomainError::Conflict(format!(
                "order is {}, not ready_for_pickup",
                order.status
            )));
        }
        self.commit(id, OrderStatus::ReadyForPickup, OrderStatus::Completed)
    }

    fn commit(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusUpdate, DomainError> {
        let change = self.repo.transition_status(id, from, to)?;
        log::info!("Order {} moved from {} to {}", id, from, to);

        let mut followups = NonCriticalTasks::new();
        if change.changed() {
            let notifier = self.notifier.clone();
            let order = change.order.clone();
            let previous = change.previous;
            followups.push("status_update_email", move || {
                notifier.send_status_update(&order, previous)
            });
        }
        Ok(StatusUpdate { change, followups })
    }
}
