//! Provider data structure passed to data sources

use crate::api::ServerApi;
use crate::config::ProviderCredentials;
use std::sync::Arc;

#[derive(Clone)]
pub struct PhyProviderData {
    pub credentials: Arc<ProviderCredentials>,
    pub api: Arc<dyn ServerApi>,
}

impl PhyProviderData {
    pub fn new(credentials: ProviderCredentials, api: Arc<dyn ServerApi>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            api,
        }
    }
}
