//! Error types for the namecard domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Tool failures are deliberately absent: the dispatcher returns structured
//! JSON error payloads to the model instead of raising, so nothing here
//! models a "tool error".

use thiserror::Error;

/// The top-level error type for all namecard operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- WeChat signature errors ---
    #[error("WeChat error: {0}")]
    Wechat(#[from] WechatError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Chat session not found: {0}")]
    SessionNotFound(i64),

    #[error("Profile not found: {0}")]
    ProfileNotFound(i64),
}

#[derive(Debug, Clone, Error)]
pub enum WechatError {
    #[error("WeChat AppID or AppSecret not configured")]
    NotConfigured,

    #[error("Failed to get {kind}: errcode={errcode}, errmsg={errmsg}")]
    Upstream {
        kind: String,
        errcode: i64,
        errmsg: String,
    },

    #[error("Malformed response from WeChat API: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}
