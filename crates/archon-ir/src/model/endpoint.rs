use crate::{impl_has_metadata, model::Pagination, value::Metadata};
use serde::{Deserialize, Serialize};

///
/// Endpoint
///
/// One HTTP (or WS) route bound to a service RPC.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    pub service: String,
    pub rpc: String,
    pub description: String,
    pub messages: Vec<String>,
    pub room_param: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<EndpointAuth>,

    /// Cache TTL as a duration string.
    pub cache: String,
    pub cache_tags: Vec<String>,
    pub invalidate: Vec<String>,
    pub optimistic_update: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreaker>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,

    pub timeout: String,

    /// Request body limit in bytes.
    pub max_body_size: i64,
    pub idempotent: bool,
    pub dedupe_key: String,
    pub errors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    pub view: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slo: Option<Slo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_hints: Option<TestHints>,

    pub metadata: Option<Metadata>,
    pub source: String,
}

impl Endpoint {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Upper-cased, trimmed HTTP method.
    #[must_use]
    pub fn http_method(&self) -> String {
        self.method.trim().to_ascii_uppercase()
    }

    /// Whether the method is read-only (`GET` or `WS`).
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self.http_method().as_str(), "GET" | "WS")
    }

    /// `METHOD path`, the endpoint's identity.
    #[must_use]
    pub fn route(&self) -> String {
        format!("{} {}", self.http_method(), self.path)
    }
}

///
/// EndpointAuth
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct EndpointAuth {
    /// `jwt`, `api_key` or `none`.
    #[serde(rename = "type")]
    pub kind: String,
    pub permission: String,
    pub roles: Vec<String>,
    pub check: String,
    pub inject: Vec<String>,
}

///
/// RateLimit
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct RateLimit {
    pub rps: i64,
    pub burst: i64,
}

///
/// CircuitBreaker
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct CircuitBreaker {
    /// Consecutive failures before opening.
    pub threshold: i64,

    /// Time spent open, as a duration string.
    pub timeout: String,

    /// Requests admitted while half-open.
    pub half_open_max: i64,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self {
            threshold: 5,
            timeout: "30s".to_string(),
            half_open_max: 3,
        }
    }
}

///
/// RetryPolicy
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: i64,
    pub base_delay_ms: i64,
    pub retry_on_statuses: Vec<i64>,
    pub retry_network_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 200,
            retry_on_statuses: vec![429, 502, 503, 504],
            retry_network_errors: true,
        }
    }
}

///
/// Slo
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Slo {
    pub latency: String,
    pub success: String,
}

///
/// TestHints
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct TestHints {
    pub happy_path: String,
    pub error_cases: Vec<String>,
}

///
/// Repository
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Repository {
    pub name: String,
    pub entity: String,
    pub finders: Vec<Finder>,
    pub source: String,
}

///
/// Finder
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Finder {
    pub name: String,

    /// `find`, `find_one`, `count`, `exists` or `custom`.
    pub action: String,
    pub returns: String,
    pub return_type: String,
    pub select: Vec<String>,
    pub scan_fields: Vec<String>,
    #[serde(rename = "where")]
    pub where_clauses: Vec<WhereClause>,
    pub order_by: String,
    pub limit: i64,
    pub for_update: bool,
    pub custom_sql: String,
    pub source: String,
}

///
/// WhereClause
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct WhereClause {
    pub field: String,
    pub op: String,
    pub param: String,
    pub param_type: String,
}

impl_has_metadata!(Endpoint);
