use std::time::Duration;

use crate::domain::errors::GatewayError;

/// Gateway code meaning the method is already bound to the intent.
pub const ALREADY_ATTACHED: &str = "payment_method_already_attached";
/// Gateway code meaning the intent is busy and the call may be repeated.
pub const PROCESSING: &str = "resource_processing_state";

/// Bounded retry budget for the attach step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachFailure {
    /// Recover the outcome with a fetch instead of repeating the attach.
    AlreadyAttached,
    Transient,
    Terminal,
}

pub fn classify_attach_error(err: &GatewayError) -> AttachFailure {
    match err {
        GatewayError::Transport(_) => AttachFailure::Transient,
        GatewayError::Api { status, .. } => match err.code() {
            Some(ALREADY_ATTACHED) => AttachFailure::AlreadyAttached,
            Some(PROCESSING) => AttachFailure::Transient,
            // Upstream outage or overload.
            _ if *status >= 500 => AttachFailure::Transient,
            _ => AttachFailure::Terminal,
        },
        GatewayError::Decode(_) => AttachFailure::Terminal,
    }
}
