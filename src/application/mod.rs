pub mod order_service;
pub mod payment_orchestrator;
pub mod retry;
pub mod side_effects;
pub mod webhook_processor;
