//! The §7 error taxonomy.
//!
//! `tower_resilience_core::ResilienceError<E>` avoids per-layer `From`
//! boilerplate by wrapping an application error generically. This workspace
//! doesn't compose arbitrary application errors through multiple generic
//! layers — it has one fixed, concrete taxonomy shared by every source
//! client, the retry engine, and the circuit breaker — so `IntelError` is a
//! closed enum rather than a generic wrapper, but keeps the same shape:
//! every variant carries the shared base fields and a `source_module`.

use std::fmt;
use std::time::Duration;

use crate::clock::Clock;

/// Fields every `IntelError` variant carries, mirroring §7's "shared base".
#[derive(Debug, Clone)]
pub struct ErrorBase {
    pub source_module: String,
    pub correlation_id: Option<String>,
    pub retry_count: u32,
    pub timestamp: String,
}

impl ErrorBase {
    pub fn new(source_module: impl Into<String>) -> Self {
        Self {
            source_module: source_module.into(),
            correlation_id: None,
            retry_count: 0,
            timestamp: Clock::now_iso(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// The unified error type returned by source clients, the retry engine, the
/// circuit breaker, and the orchestrator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IntelError {
    /// Non-2xx response or connection failure.
    #[error("{service} request to {endpoint} failed with status {http_status:?} after {request_duration_ms}ms")]
    Api {
        base: ErrorBase,
        service: String,
        endpoint: String,
        http_status: Option<u16>,
        request_duration_ms: u64,
    },

    /// HTTP 429 or an equivalent rate-limit signal.
    #[error("{service} rate limited, retry after {retry_after_seconds}s")]
    RateLimit {
        base: ErrorBase,
        service: String,
        retry_after_seconds: u64,
        quota_remaining: Option<u64>,
        quota_reset_at: Option<String>,
    },

    /// A circuit breaker refused the call outright.
    #[error("circuit breaker for {service} is open, reopens in {reopens_in_seconds}s")]
    CircuitOpen {
        base: ErrorBase,
        service: String,
        reopens_in_seconds: u64,
    },

    /// An input violated a precondition.
    #[error("validation failed for {field_name}: expected {expected}, got {received} ({rule})")]
    Validation {
        base: ErrorBase,
        field_name: String,
        expected: String,
        received: String,
        rule: String,
    },

    /// Missing or invalid configuration (e.g. an absent API token).
    #[error("configuration error: {message}")]
    Configuration { base: ErrorBase, message: String },
}

impl IntelError {
    pub fn base(&self) -> &ErrorBase {
        match self {
            IntelError::Api { base, .. }
            | IntelError::RateLimit { base, .. }
            | IntelError::CircuitOpen { base, .. }
            | IntelError::Validation { base, .. }
            | IntelError::Configuration { base, .. } => base,
        }
    }

    /// Whether C3's retry engine should consider this retryable at all.
    /// `CircuitOpen`, `Validation` and `Configuration` never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IntelError::Api { .. } | IntelError::RateLimit { .. })
    }

    /// Whether this failure should draw from the rate-limit budget rather
    /// than the general API budget (§4.1).
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, IntelError::RateLimit { .. })
    }

    /// The service-supplied retry delay, if this error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            IntelError::RateLimit {
                retry_after_seconds,
                ..
            } => Some(Duration::from_secs(*retry_after_seconds)),
            _ => None,
        }
    }

    pub fn api(
        source_module: impl Into<String>,
        service: impl Into<String>,
        endpoint: impl Into<String>,
        http_status: Option<u16>,
        request_duration_ms: u64,
    ) -> Self {
        IntelError::Api {
            base: ErrorBase::new(source_module),
            service: service.into(),
            endpoint: endpoint.into(),
            http_status,
            request_duration_ms,
        }
    }

    pub fn rate_limit(
        source_module: impl Into<String>,
        service: impl Into<String>,
        retry_after_seconds: u64,
    ) -> Self {
        IntelError::RateLimit {
            base: ErrorBase::new(source_module),
            service: service.into(),
            retry_after_seconds,
            quota_remaining: None,
            quota_reset_at: None,
        }
    }

    pub fn circuit_open(
        source_module: impl Into<String>,
        service: impl Into<String>,
        reopens_in_seconds: u64,
    ) -> Self {
        IntelError::CircuitOpen {
            base: ErrorBase::new(source_module),
            service: service.into(),
            reopens_in_seconds,
        }
    }

    pub fn validation(
        source_module: impl Into<String>,
        field_name: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        IntelError::Validation {
            base: ErrorBase::new(source_module),
            field_name: field_name.into(),
            expected: expected.into(),
            received: received.into(),
            rule: rule.into(),
        }
    }

    pub fn configuration(source_module: impl Into<String>, message: impl Into<String>) -> Self {
        IntelError::Configuration {
            base: ErrorBase::new(source_module),
            message: message.into(),
        }
    }

    /// The HTTP status this error should surface as at the boundary (§7).
    pub fn http_status(&self) -> u16 {
        match self {
            IntelError::Validation { .. } => 400,
            IntelError::Configuration { .. } => 503,
            IntelError::RateLimit { .. } => 429,
            IntelError::CircuitOpen { .. } => 503,
            IntelError::Api { http_status, .. } => http_status.unwrap_or(502),
        }
    }
}

impl fmt::Display for ErrorBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.source_module)
    }
}
