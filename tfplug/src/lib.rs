//! tfplug - Terraform Plugin Framework for Rust
//!
//! Provider-side building blocks for Terraform providers: dynamic values,
//! schemas, diagnostics and the provider/data source traits, plus an
//! in-process host that sequences configure and read calls.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;

// Host-side modules
pub mod host;
pub mod logging;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use host::ProviderHost;
pub use logging::LogLevel;
pub use provider::{DataSourceFactory, Provider};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{AttributePath, Config, Diagnostic, Dynamic, DynamicValue, State};
