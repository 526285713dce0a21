use crate::model::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Config
///
/// Application configuration fields from `#AppConfig`.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub fields: Vec<Field>,
}

///
/// Auth
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Auth {
    pub algorithm: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: String,
    pub refresh_ttl: String,
    pub rotation: bool,

    /// `redis`, `postgres`, `memory` or `hybrid`.
    pub refresh_store: String,
    pub claims: AuthClaims,
    pub operations: AuthOps,
}

///
/// AuthClaims
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct AuthClaims {
    pub user_id: String,
    pub company_id: String,
    pub roles: String,
    pub permissions: String,
}

///
/// AuthOps
///
/// Wiring of the auth service's login, refresh and logout operations.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct AuthOps {
    pub service: String,
    pub login_op: String,
    pub login_access_field: String,
    pub login_refresh_field: String,
    pub refresh_op: String,
    pub refresh_token_field: String,
    pub refresh_access_field: String,
    pub refresh_refresh_field: String,
    pub logout_op: String,
    pub logout_token_field: String,
}

///
/// Rbac
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Rbac {
    /// role -> permissions
    pub roles: BTreeMap<String, Vec<String>>,

    /// permission -> description
    pub permissions: BTreeMap<String, String>,
}

///
/// View
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct View {
    pub name: String,

    /// role -> visible fields
    pub roles: BTreeMap<String, Vec<String>>,
}

///
/// NotificationsConfig
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<NotificationChannels>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policies: Option<NotificationPolicies>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub muting: Option<NotificationMuting>,
}

///
/// NotificationChannels
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct NotificationChannels {
    pub enabled: bool,
    pub default_channels: Vec<String>,
    pub channels: BTreeMap<String, NotificationChannelSpec>,
}

///
/// NotificationChannelSpec
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct NotificationChannelSpec {
    pub enabled: bool,
    pub driver: String,
    pub topic: String,
    pub subject: String,
    pub template: String,
    pub dsn_env: String,
    pub brokers_env: String,
}

///
/// NotificationPolicies
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct NotificationPolicies {
    pub enabled: bool,
    pub rules: Vec<NotificationPolicyRule>,
}

///
/// NotificationPolicyRule
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct NotificationPolicyRule {
    pub enabled: bool,
    pub event: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub audience: String,
    pub channels: Vec<String>,
    pub template: String,
    pub mute_key: String,
}

///
/// NotificationMuting
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct NotificationMuting {
    pub enabled: bool,
}

///
/// Template
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Template {
    pub id: String,
    pub kind: String,
    pub channel: String,
    pub locale: String,
    pub version: String,

    /// `go_template`, `plain` or `json`; empty means `go_template`.
    pub engine: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub body: String,

    /// File references, already joined with the catalogue directory.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject_file: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub text_file: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub html_file: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub body_file: String,

    pub required_vars: Vec<String>,
    pub optional_vars: Vec<String>,
}

impl Template {
    pub const DEFAULT_ENGINE: &str = "go_template";

    /// Engine with the default applied, lower-cased.
    #[must_use]
    pub fn effective_engine(&self) -> String {
        let engine = self.engine.trim().to_ascii_lowercase();
        if engine.is_empty() {
            Self::DEFAULT_ENGINE.to_string()
        } else {
            engine
        }
    }

    #[must_use]
    pub fn is_email(&self) -> bool {
        self.channel.trim().eq_ignore_ascii_case("email")
            || self.kind.trim().eq_ignore_ascii_case("email")
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        [&self.text, &self.html, &self.body]
            .iter()
            .any(|s| !s.trim().is_empty())
    }
}
