use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::error::ApiError;
use super::servers::{ListServersParams, ListServersResponse};
use super::ServerApi;
use crate::config::ProviderCredentials;

const TRACE_TARGET: &str = "phy::trace";

pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

pub const USER_AGENT: &str = concat!("terraform-provider-phy/", env!("CARGO_PKG_VERSION"));

/// PHY API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    root_url: Url,
    token: String,
    secret: String,
    trace: bool,
}

impl Client {
    pub fn new(credentials: &ProviderCredentials) -> Result<Self, ApiError> {
        let root_url = parse_root_url(&credentials.api_root_url)?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                root_url,
                token: credentials.token.clone(),
                secret: credentials.secret.clone(),
                trace: credentials.trace,
            }),
        })
    }

    pub fn root_url(&self) -> &Url {
        &self.inner.root_url
    }

    /// Execute a GET request relative to the API root
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let mut url = self
            .inner
            .root_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        tracing::debug!("GET request to: {}", url);
        if self.inner.trace {
            tracing::info!(target: TRACE_TARGET, method = "GET", url = %url, "request");
        }

        let response = self
            .inner
            .http_client
            .get(url)
            .basic_auth(&self.inner.token, Some(&self.inner.secret))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if self.inner.trace {
            tracing::info!(
                target: TRACE_TARGET,
                status = status.as_u16(),
                body = %text,
                "response"
            );
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthError);
        }

        if !status.is_success() {
            tracing::error!("API error response ({}): {}", status, text);
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(e.to_string())
        })
    }
}

#[async_trait]
impl ServerApi for Client {
    async fn list_servers(
        &self,
        params: &ListServersParams,
    ) -> Result<ListServersResponse, ApiError> {
        self.get("servers/", &params.query_pairs()).await
    }
}

/// Joining relative paths only works against a root ending in a slash
fn parse_root_url(raw: &str) -> Result<Url, ApiError> {
    let mut root = raw.trim().to_string();
    if !root.ends_with('/') {
        root.push('/');
    }

    let url = Url::parse(&root).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ApiError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw, scheme
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn credentials(root: &str) -> ProviderCredentials {
        ProviderCredentials {
            token: "tok".to_string(),
            secret: "sec".to_string(),
            api_root_url: root.to_string(),
            trace: false,
        }
    }

    #[tokio::test]
    async fn list_servers_sends_basic_auth_and_free_word() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/servers/")
            .match_header("authorization", "Basic dG9rOnNlYw==")
            .match_query(Matcher::UrlEncoded("free_word".into(), "web server".into()))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"servers":[{"server_id":"100","service":{"service_id":"s1","nickname":"web"}}]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&credentials(&server.url())).unwrap();
        let response = client
            .list_servers(&ListServersParams::free_word("web server"))
            .await
            .unwrap();

        assert_eq!(response.servers.len(), 1);
        assert_eq!(response.servers[0].server_id, "100");
        assert_eq!(response.servers[0].service.nickname, "web");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_appends_slash_to_root_with_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/cloud/api/dedicated-phy/1.0/servers/")
            .with_body(r#"{"servers":[]}"#)
            .create_async()
            .await;

        let root = format!("{}/cloud/api/dedicated-phy/1.0", server.url());
        let client = Client::new(&credentials(&root)).unwrap();
        assert!(client.root_url().as_str().ends_with("/1.0/"));

        let response = client
            .list_servers(&ListServersParams::default())
            .await
            .unwrap();
        assert!(response.servers.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_handles_authentication_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/servers/")
            .with_status(401)
            .with_body(r#"{"error_code":"unauthorized"}"#)
            .create_async()
            .await;

        let client = Client::new(&credentials(&server.url())).unwrap();
        let result = client.list_servers(&ListServersParams::default()).await;

        assert!(matches!(result, Err(ApiError::AuthError)));
    }

    #[tokio::test]
    async fn client_passes_error_body_through() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/servers/")
            .with_status(503)
            .with_body("maintenance in progress")
            .create_async()
            .await;

        let client = Client::new(&credentials(&server.url())).unwrap();
        match client.list_servers(&ListServersParams::default()).await {
            Err(ApiError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance in progress");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn client_reports_malformed_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/servers/")
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = Client::new(&credentials(&server.url())).unwrap();
        let result = client.list_servers(&ListServersParams::default()).await;

        assert!(matches!(result, Err(ApiError::ParseError(_))));
    }

    #[tokio::test]
    async fn client_handles_network_errors() {
        let client = Client::new(&credentials("http://127.0.0.1:1")).unwrap();

        let result = client.list_servers(&ListServersParams::default()).await;
        assert!(matches!(result, Err(ApiError::RequestError(_))));
    }

    #[tokio::test]
    async fn trace_mode_still_returns_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/servers/")
            .with_body(r#"{"servers":[]}"#)
            .create_async()
            .await;

        let mut creds = credentials(&server.url());
        creds.trace = true;
        let client = Client::new(&creds).unwrap();

        assert!(client
            .list_servers(&ListServersParams::default())
            .await
            .is_ok());
    }

    #[test]
    fn invalid_root_urls_are_rejected() {
        assert!(matches!(
            Client::new(&credentials("not a url")),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            Client::new(&credentials("ftp://example.com/api")),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
