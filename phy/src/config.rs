//! Provider credential resolution
//!
//! Each provider-block attribute resolves independently: an explicit value
//! wins, otherwise its environment variable is consulted. Token and secret
//! are mandatory; the API root URL falls back to the public endpoint.

use std::collections::HashMap;
use std::fmt;
use tfplug::{AttributePath, Diagnostic, Dynamic};
use thiserror::Error;

use crate::api::ApiError;

pub const ENV_ACCESS_TOKEN: &str = "SAKURACLOUD_ACCESS_TOKEN";
pub const ENV_ACCESS_TOKEN_SECRET: &str = "SAKURACLOUD_ACCESS_TOKEN_SECRET";
pub const ENV_API_ROOT_URL: &str = "SAKURACLOUD_PHY_API_ROOT_URL";
pub const ENV_TRACE: &str = "SAKURACLOUD_TRACE";

pub const DEFAULT_API_ROOT_URL: &str = "https://secure.sakura.ad.jp/cloud/api/dedicated-phy/1.0/";

/// Source of environment variables
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Token,
    Secret,
    ApiRootUrl,
}

impl CredentialField {
    pub fn attribute_name(self) -> &'static str {
        match self {
            CredentialField::Token => "token",
            CredentialField::Secret => "secret",
            CredentialField::ApiRootUrl => "api_root_url",
        }
    }

    fn label(self) -> &'static str {
        match self {
            CredentialField::Token => "Token",
            CredentialField::Secret => "Secret",
            CredentialField::ApiRootUrl => "API root URL",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            CredentialField::Token => ENV_ACCESS_TOKEN,
            CredentialField::Secret => ENV_ACCESS_TOKEN_SECRET,
            CredentialField::ApiRootUrl => ENV_API_ROOT_URL,
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

/// One optional provider-block attribute as Terraform supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// Depends on something Terraform has not computed yet
    Unknown,
    Null,
    Known(String),
}

impl ConfigValue {
    /// Non-string values yield None; the schema rejects them earlier
    pub fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::Unknown => Some(ConfigValue::Unknown),
            Dynamic::Null => Some(ConfigValue::Null),
            Dynamic::String(s) => Some(ConfigValue::Known(s.clone())),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Known(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} cannot be interpolated into the provider block")]
    InterpolationNotAllowed(CredentialField),

    #[error("{0} is not set in the provider block or the environment")]
    MissingCredential(CredentialField),

    #[error("failed to create API client: {0}")]
    Client(#[from] ApiError),
}

impl ConfigError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigError::InterpolationNotAllowed(field) => Diagnostic::error(
                "Can't interpolate into provider block",
                "Interpolating that value into the provider block doesn't give the provider enough information to run. Try hard-coding the value, instead.",
            )
            .with_attribute(AttributePath::new(field.attribute_name())),
            ConfigError::MissingCredential(field) => Diagnostic::error(
                format!("Unable to find {}", field),
                format!(
                    "{} cannot be an empty string. Set it in the provider block or via {}.",
                    field.label(),
                    field.env_var()
                ),
            ),
            ConfigError::Client(e) => {
                Diagnostic::error("Unable to create PHY API client", e.to_string())
            }
        }
    }
}

/// Fully resolved credentials, immutable once built
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub token: String,
    pub secret: String,
    pub api_root_url: String,
    pub trace: bool,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .field("api_root_url", &self.api_root_url)
            .field("trace", &self.trace)
            .finish()
    }
}

/// Provider block values before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub token: ConfigValue,
    pub secret: ConfigValue,
    pub api_root_url: ConfigValue,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: ConfigValue::Null,
            secret: ConfigValue::Null,
            api_root_url: ConfigValue::Null,
        }
    }
}

impl ProviderConfig {
    /// Unknown values are rejected before the environment is consulted
    pub fn resolve(&self, env: &dyn Environment) -> Result<ProviderCredentials, ConfigError> {
        let fields = [
            (CredentialField::Token, &self.token),
            (CredentialField::Secret, &self.secret),
            (CredentialField::ApiRootUrl, &self.api_root_url),
        ];
        if let Some((field, _)) = fields
            .iter()
            .find(|(_, value)| **value == ConfigValue::Unknown)
        {
            return Err(ConfigError::InterpolationNotAllowed(*field));
        }

        let token = resolve_field(CredentialField::Token, &self.token, env);
        if token.is_empty() {
            return Err(ConfigError::MissingCredential(CredentialField::Token));
        }

        let secret = resolve_field(CredentialField::Secret, &self.secret, env);
        if secret.is_empty() {
            return Err(ConfigError::MissingCredential(CredentialField::Secret));
        }

        let mut api_root_url = resolve_field(CredentialField::ApiRootUrl, &self.api_root_url, env);
        if api_root_url.is_empty() {
            api_root_url = DEFAULT_API_ROOT_URL.to_string();
        }

        let trace = env.var(ENV_TRACE).is_some_and(|v| !v.is_empty());

        Ok(ProviderCredentials {
            token,
            secret,
            api_root_url,
            trace,
        })
    }
}

fn resolve_field(field: CredentialField, value: &ConfigValue, env: &dyn Environment) -> String {
    match value {
        ConfigValue::Known(v) => v.clone(),
        ConfigValue::Null | ConfigValue::Unknown => env.var(field.env_var()).unwrap_or_default(),
    }
}
