//! Endpoint policy: one normalized view of an endpoint's transport contract,
//! shared by emitters, plus the checks that reject contradictory contracts.

use crate::{ThisError, duration::parse_duration};
use archon_ir::{
    error::ErrorTree,
    model::{CircuitBreaker, Endpoint, RateLimit, RetryPolicy},
};

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

///
/// PolicyError
///

#[derive(Debug, ThisError)]
pub enum PolicyError {
    #[error("idempotency is not allowed for {0} endpoints")]
    IdempotentRead(String),

    #[error("invalid timeout {value:?}: {reason}")]
    InvalidTimeout { value: String, reason: String },

    #[error("invalid cache.ttl {value:?}: {reason}")]
    InvalidCacheTtl { value: String, reason: String },

    #[error("max_body_size cannot be negative")]
    NegativeBodySize,

    #[error("rate_limit values cannot be negative")]
    NegativeRateLimit,

    #[error("retry.max_attempts cannot be negative")]
    NegativeRetryAttempts,

    #[error("retry.base_delay_ms cannot be negative")]
    NegativeRetryDelay,

    #[error("retry.retry_on_statuses contains invalid HTTP code {0}")]
    InvalidRetryStatus(i64),

    #[error("endpoint policy validation failed:\n{0}")]
    Endpoints(ErrorTree),
}

///
/// EndpointPolicy
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EndpointPolicy {
    pub auth_type: String,
    pub permission: String,
    pub auth_roles: Vec<String>,
    pub cache_ttl: String,
    pub timeout: String,
    pub idempotency: bool,
    pub max_body_size: i64,
    pub rate_limit: Option<RateLimit>,
    pub circuit_breaker: Option<CircuitBreaker>,
    pub retry: RetryPolicy,
    pub required_headers: Vec<String>,
}

impl EndpointPolicy {
    #[must_use]
    pub fn from_endpoint(ep: &Endpoint) -> Self {
        let auth = ep.auth.clone().unwrap_or_default();

        Self {
            required_headers: required_headers(ep),
            auth_type: auth.kind,
            permission: auth.permission,
            auth_roles: auth.roles,
            cache_ttl: ep.cache.clone(),
            timeout: ep.timeout.clone(),
            idempotency: ep.idempotent,
            max_body_size: ep.max_body_size,
            rate_limit: ep.rate_limit.clone(),
            circuit_breaker: ep.circuit_breaker.clone(),
            retry: ep.retry.clone().unwrap_or_default(),
        }
    }
}

fn required_headers(ep: &Endpoint) -> Vec<String> {
    let mut out = Vec::new();

    let auth_type = ep.auth.as_ref().map_or("", |a| a.kind.trim());
    if !auth_type.is_empty() && auth_type != "none" {
        out.push(AUTHORIZATION_HEADER.to_string());
    }
    if ep.idempotent && !ep.is_read_only() {
        out.push(IDEMPOTENCY_HEADER.to_string());
    }

    out
}

/// First contract conflict of one endpoint.
pub fn validate_endpoint_policy(ep: &Endpoint) -> Result<(), PolicyError> {
    if ep.idempotent && ep.is_read_only() {
        return Err(PolicyError::IdempotentRead(ep.http_method()));
    }
    if !ep.timeout.is_empty() {
        parse_duration(&ep.timeout).map_err(|e| PolicyError::InvalidTimeout {
            value: ep.timeout.clone(),
            reason: e.to_string(),
        })?;
    }
    if !ep.cache.is_empty() {
        parse_duration(&ep.cache).map_err(|e| PolicyError::InvalidCacheTtl {
            value: ep.cache.clone(),
            reason: e.to_string(),
        })?;
    }
    if ep.max_body_size < 0 {
        return Err(PolicyError::NegativeBodySize);
    }
    if let Some(rl) = &ep.rate_limit
        && (rl.rps < 0 || rl.burst < 0)
    {
        return Err(PolicyError::NegativeRateLimit);
    }
    if let Some(retry) = &ep.retry {
        if retry.max_attempts < 0 {
            return Err(PolicyError::NegativeRetryAttempts);
        }
        if retry.base_delay_ms < 0 {
            return Err(PolicyError::NegativeRetryDelay);
        }
        if let Some(code) = retry
            .retry_on_statuses
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(PolicyError::InvalidRetryStatus(*code));
        }
    }

    Ok(())
}

/// Every endpoint's first conflict, keyed by route.
pub fn validate_policies(endpoints: &[Endpoint]) -> Result<(), PolicyError> {
    let mut errs = ErrorTree::new();
    for ep in endpoints {
        if let Err(e) = validate_endpoint_policy(ep) {
            errs.add_at(format!("endpoint {}", ep.route()), e);
        }
    }

    if !errs.is_empty() {
        tracing::warn!(violations = errs.len(), "endpoint policy validation failed");
    }

    errs.result().map_err(PolicyError::Endpoints)
}
