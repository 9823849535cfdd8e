//! In-process host adapter
//!
//! `ProviderHost` drives a provider the way Terraform does over the plugin
//! protocol: schemas first, then a single configure, then any number of data
//! source reads. The wire transport itself lives outside this crate; the
//! `*_msgpack` entry points cover the payload marshalling it needs.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest,
};
use crate::error::{Result, TfplugError};
use crate::provider::{ConfigureProviderRequest, Provider, ProviderSchemaRequest};
use crate::schema::Schema;
use crate::types::{has_errors, Diagnostic, DynamicValue};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Schemas for the provider block and every data source
pub struct ProviderSchemas {
    pub provider: Schema,
    pub data_sources: HashMap<String, Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderHost<P: Provider> {
    provider: P,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    configured: bool,
}

impl<P: Provider> ProviderHost<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            provider_data: None,
            configured: false,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// True once configure has run, whether or not it succeeded
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub async fn get_schemas(&self, ctx: Context) -> ProviderSchemas {
        let provider = self
            .provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .await;
        let mut diagnostics = provider.diagnostics;
        let mut data_sources = HashMap::new();

        for (name, factory) in self.provider.data_sources() {
            let response = factory()
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_sources.insert(name, response.schema);
        }

        ProviderSchemas {
            provider: provider.schema,
            data_sources,
            diagnostics,
        }
    }

    pub async fn validate_provider_config(
        &self,
        ctx: Context,
        config: &DynamicValue,
    ) -> Vec<Diagnostic> {
        let response = self.provider.schema(ctx, ProviderSchemaRequest).await;
        let mut diagnostics = response.diagnostics;
        diagnostics.extend(response.schema.validate_config(config));
        diagnostics
    }

    pub async fn configure(
        &mut self,
        ctx: Context,
        terraform_version: &str,
        config: DynamicValue,
    ) -> Vec<Diagnostic> {
        if self.configured {
            return vec![Diagnostic::error(
                "Provider already configured",
                "ConfigureProvider may only be called once per provider process.",
            )];
        }
        self.configured = true;

        tracing::debug!(
            provider = self.provider.type_name(),
            terraform_version,
            "configuring provider"
        );

        let response = self
            .provider
            .configure(
                ctx,
                ConfigureProviderRequest {
                    terraform_version: terraform_version.to_string(),
                    config,
                },
            )
            .await;

        if has_errors(&response.diagnostics) {
            tracing::warn!(
                errors = response.diagnostics.len(),
                "provider configuration failed"
            );
        } else {
            self.provider_data = response.provider_data;
        }

        response.diagnostics
    }

    pub async fn validate_data_source_config(
        &self,
        ctx: Context,
        type_name: &str,
        config: DynamicValue,
    ) -> Vec<Diagnostic> {
        let Some(factory) = self.provider.data_sources().get(type_name).copied() else {
            return vec![unknown_data_source(type_name)];
        };

        let data_source = factory();
        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await;
        let mut diagnostics = schema.schema.validate_config(&config);

        let response = data_source
            .validate(
                ctx,
                ValidateDataSourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    /// Creates a fresh data source, hands it the provider data and reads it
    pub async fn read_data_source(
        &self,
        ctx: Context,
        type_name: &str,
        config: DynamicValue,
    ) -> ReadDataSourceResponse {
        let Some(factory) = self.provider.data_sources().get(type_name).copied() else {
            return ReadDataSourceResponse::error(unknown_data_source(type_name));
        };

        let mut data_source = factory();
        let configured = data_source
            .configure(
                ctx.clone(),
                ConfigureDataSourceRequest {
                    provider_data: self.provider_data.clone(),
                },
            )
            .await;
        if has_errors(&configured.diagnostics) {
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: configured.diagnostics,
            };
        }

        if ctx.is_cancelled() {
            return ReadDataSourceResponse::error(Diagnostic::error(
                "Request cancelled",
                format!("Reading {} was cancelled by Terraform.", type_name),
            ));
        }

        tracing::debug!(type_name, "reading data source");

        data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await
    }

    pub async fn configure_msgpack(
        &mut self,
        ctx: Context,
        terraform_version: &str,
        config: &[u8],
    ) -> Result<Vec<Diagnostic>> {
        let config = DynamicValue::decode_msgpack(config)?;
        Ok(self.configure(ctx, terraform_version, config).await)
    }

    /// Returns the msgpack-encoded state; empty when the read failed
    pub async fn read_data_source_msgpack(
        &self,
        ctx: Context,
        type_name: &str,
        config: &[u8],
    ) -> Result<(Vec<u8>, Vec<Diagnostic>)> {
        let config = DynamicValue::decode_msgpack(config)?;
        let response = self.read_data_source(ctx, type_name, config).await;

        let state = if response.state.is_null() {
            Vec::new()
        } else {
            response.state.encode_msgpack()?
        };

        Ok((state, response.diagnostics))
    }
}

fn unknown_data_source(type_name: &str) -> Diagnostic {
    Diagnostic::error(
        "Unknown data source",
        TfplugError::DataSourceNotFound(type_name.to_string()).to_string(),
    )
}
