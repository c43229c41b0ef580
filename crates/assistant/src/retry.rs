//! Declarative retry table for the streaming turn job.
//!
//! Mirrors the job queue's retry declarations: transient transport failures
//! get three attempts with a short fixed backoff, upstream API errors get
//! two with a longer one. Nothing else is retried — the whole turn is
//! re-invoked, not an individual step.

use namecard_core::error::{Error, ProviderError};
use std::time::Duration;

/// Max attempts (total, including the first) and fixed backoff for one
/// failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryRule {
    pub attempts: u32,
    pub backoff: Duration,
}

/// The retry rule for an error, or `None` when the error is terminal.
pub fn rule_for(error: &Error) -> Option<RetryRule> {
    let Error::Provider(provider_error) = error else {
        return None;
    };
    match provider_error {
        ProviderError::Timeout(_)
        | ProviderError::Network(_)
        | ProviderError::StreamInterrupted(_) => Some(RetryRule {
            attempts: 3,
            backoff: Duration::from_secs(5),
        }),
        ProviderError::ApiError { .. } | ProviderError::RateLimited { .. } => Some(RetryRule {
            attempts: 2,
            backoff: Duration::from_secs(10),
        }),
        ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_) => None,
    }
}

/// The wait before re-running the turn after a failed `attempt` (1-based),
/// or `None` when the turn should give up.
pub fn backoff_after(error: &Error, attempt: u32) -> Option<Duration> {
    let rule = rule_for(error)?;
    (attempt < rule.attempts).then_some(rule.backoff)
}
