//! PHY dedicated server API

pub mod client;
pub mod error;
pub mod servers;

pub use client::Client;
pub use error::ApiError;
pub use servers::{FreeWordFilter, ListServersParams, ListServersResponse, Server, ServerService};

use async_trait::async_trait;

/// Server operations used by the provider
///
/// `Client` talks to the real API; tests substitute their own implementation.
#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn list_servers(&self, params: &ListServersParams)
        -> Result<ListServersResponse, ApiError>;
}
