//! phy_server data source
//!
//! Looks a server up by free-word filter and exposes the first match.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceSchemaRequest, DataSourceSchemaResponse, DataSourceWithConfigure,
    ReadDataSourceRequest, ReadDataSourceResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use thiserror::Error;

use crate::api::{ListServersParams, ServerApi};
use crate::provider_data::PhyProviderData;

pub const TYPE_NAME: &str = "phy_server";

/// State written for a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerState {
    pub id: String,
    pub nickname: String,
    pub filter: String,
}

impl ServerState {
    pub fn to_dynamic(&self) -> DynamicValue {
        DynamicValue::from_pairs([
            ("id", self.id.as_str()),
            ("nickname", self.nickname.as_str()),
            ("filter", self.filter.as_str()),
        ])
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("provider is not configured")]
    NotConfigured,

    #[error("{0}")]
    UpstreamError(String),

    #[error("No Server where {0}")]
    NotFound(String),
}

impl LookupError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LookupError::NotConfigured => Diagnostic::error(
                "Provider not configured",
                "The provider must be configured with valid credentials before phy_server can be read.",
            ),
            LookupError::UpstreamError(message) => {
                Diagnostic::error("Error Getting Servers", message.clone())
            }
            LookupError::NotFound(_) => Diagnostic::error("Error Getting Server", self.to_string()),
        }
    }
}

/// Lists servers matching `filter` and returns the first one
///
/// Multiple matches are not an error; the API's ordering decides.
pub async fn lookup_server(
    api: Option<&dyn ServerApi>,
    filter: &str,
) -> Result<ServerState, LookupError> {
    let api = api.ok_or(LookupError::NotConfigured)?;

    let found = api
        .list_servers(&ListServersParams::free_word(filter))
        .await
        .map_err(|e| LookupError::UpstreamError(e.to_string()))?;

    tracing::debug!(filter, matches = found.servers.len(), "listed servers");

    let server = found
        .servers
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::NotFound(filter.to_string()))?;

    Ok(ServerState {
        id: server.server_id,
        nickname: server.service.nickname,
        filter: filter.to_string(),
    })
}

#[derive(Default)]
pub struct ServerDataSource {
    provider_data: Option<PhyProviderData>,
}

impl ServerDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> Box<dyn DataSourceWithConfigure> {
        Box::new(Self::new())
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Looks up a PHY dedicated server by free word")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("ID of the resource.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("nickname", AttributeType::String)
                    .description("NickName of the server.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("filter", AttributeType::String)
                    .description("The free word filter of the server.")
                    .required()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl DataSource for ServerDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];

        let path = AttributePath::new("filter");
        if let Ok(Dynamic::String(filter)) = request.config.get_or_null(&path) {
            if filter.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::warning(
                        "Empty filter",
                        "An empty filter may match every server; the first one returned will be used.",
                    )
                    .with_attribute(path),
                );
            }
        }

        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            tracing::warn!("{} read before provider configuration", TYPE_NAME);
            return ReadDataSourceResponse::error(LookupError::NotConfigured.to_diagnostic());
        };

        let path = AttributePath::new("filter");
        let filter = match request.config.get_or_null(&path) {
            Ok(Dynamic::String(filter)) => filter,
            Ok(Dynamic::Unknown) => {
                return ReadDataSourceResponse::error(
                    Diagnostic::error(
                        "Filter not known",
                        "The filter value is not known yet; data sources can only be read once it is.",
                    )
                    .with_attribute(path),
                )
            }
            Ok(other) => {
                return ReadDataSourceResponse::error(
                    Diagnostic::error(
                        "Invalid filter",
                        format!("Expected a string filter, got {}.", other.type_name()),
                    )
                    .with_attribute(path),
                )
            }
            Err(e) => {
                return ReadDataSourceResponse::error(Diagnostic::error(
                    "Invalid configuration",
                    e.to_string(),
                ))
            }
        };

        tracing::debug!(filter = %filter, "reading {}", TYPE_NAME);

        match lookup_server(Some(&*provider_data.api), &filter).await {
            Ok(server) => ReadDataSourceResponse {
                state: server.to_dynamic(),
                diagnostics: vec![],
            },
            Err(e) => {
                tracing::error!("{} lookup failed: {}", TYPE_NAME, e);
                ReadDataSourceResponse::error(e.to_diagnostic())
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ServerDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match request.provider_data {
            Some(data) => match data.downcast_ref::<PhyProviderData>() {
                Some(provider_data) => {
                    self.provider_data = Some(provider_data.clone());
                }
                None => {
                    tracing::error!("Failed to downcast provider data to PhyProviderData");
                    diagnostics.push(Diagnostic::error(
                        "Error converting provider",
                        "An unexpected error was encountered converting the provider. This is always a bug in the provider.",
                    ));
                }
            },
            None => {
                tracing::debug!("No provider data; {} left unconfigured", TYPE_NAME);
            }
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
