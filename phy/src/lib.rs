pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;

pub use provider_data::PhyProviderData;

use async_trait::async_trait;
use config::{ConfigValue, CredentialField, Environment, ProcessEnvironment, ProviderConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

pub const PROVIDER_TYPE_NAME: &str = "phy";

pub struct PhyProvider {
    env: Box<dyn Environment>,
}

impl Default for PhyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PhyProvider {
    pub fn new() -> Self {
        Self::with_environment(ProcessEnvironment)
    }

    pub fn with_environment(env: impl Environment + 'static) -> Self {
        Self { env: Box::new(env) }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Sakura Cloud PHY provider configuration")
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("API token (or SAKURACLOUD_ACCESS_TOKEN)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret", AttributeType::String)
                    .description("API secret (or SAKURACLOUD_ACCESS_TOKEN_SECRET)")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_root_url", AttributeType::String)
                    .description("Root URL of the PHY API (or SAKURACLOUD_PHY_API_ROOT_URL)")
                    .optional()
                    .build(),
            )
            .build()
    }
}

/// Maps the provider block onto the resolver's input
fn provider_config(config: &DynamicValue) -> Result<ProviderConfig, Diagnostic> {
    Ok(ProviderConfig {
        token: config_value(config, CredentialField::Token)?,
        secret: config_value(config, CredentialField::Secret)?,
        api_root_url: config_value(config, CredentialField::ApiRootUrl)?,
    })
}

fn config_value(config: &DynamicValue, field: CredentialField) -> Result<ConfigValue, Diagnostic> {
    if config.is_unknown() {
        return Ok(ConfigValue::Unknown);
    }
    if config.is_null() {
        return Ok(ConfigValue::Null);
    }

    let path = AttributePath::new(field.attribute_name());
    let value = config
        .get_or_null(&path)
        .map_err(|e| Diagnostic::error("Invalid provider configuration", e.to_string()))?;

    ConfigValue::from_dynamic(&value).ok_or_else(|| {
        Diagnostic::error(
            "Invalid provider configuration",
            format!("{} must be a string, got {}", field, value.type_name()),
        )
        .with_attribute(path)
    })
}

#[async_trait]
impl Provider for PhyProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        let mut data_sources: Vec<String> = self.data_sources().into_keys().collect();
        data_sources.sort();

        ProviderMetadataResponse {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            data_sources,
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = match provider_config(&request.config) {
            Ok(config) => config,
            Err(diagnostic) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![diagnostic],
                    provider_data: None,
                }
            }
        };

        let result = config.resolve(&*self.env).and_then(|credentials| {
            let client = api::Client::new(&credentials)?;
            Ok(PhyProviderData::new(credentials, Arc::new(client)))
        });

        match result {
            Ok(data) => {
                tracing::debug!(
                    api_root_url = %data.credentials.api_root_url,
                    trace = data.credentials.trace,
                    terraform_version = %request.terraform_version,
                    "provider configured"
                );
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => {
                tracing::warn!("provider configuration failed: {}", e);
                ConfigureProviderResponse {
                    diagnostics: vec![e.to_diagnostic()],
                    provider_data: None,
                }
            }
        }
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            data_sources::server::TYPE_NAME.to_string(),
            data_sources::ServerDataSource::factory,
        );
        factories
    }
}
