use crate::error::FetchError;
use crate::utils::system::get_system_proxy;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Proxy};

/// User agent sent when a source does not set its own.
pub const DEFAULT_USER_AGENT: &str = "subgen";

#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    pub proxy: Option<String>,
}

/// Interprets the `proxy` setting: `SYSTEM` reads the environment, `NONE`
/// or an empty string disables proxying, anything else is used verbatim.
pub fn parse_proxy(proxy_str: &str) -> ProxyConfig {
    if proxy_str == "SYSTEM" {
        let system = get_system_proxy();
        return ProxyConfig {
            proxy: if system.is_empty() { None } else { Some(system) },
        };
    } else if proxy_str == "NONE" {
        return ProxyConfig { proxy: None };
    } else if !proxy_str.is_empty() {
        return ProxyConfig {
            proxy: Some(proxy_str.to_string()),
        };
    }
    ProxyConfig { proxy: None }
}

/// A fetched body together with its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal GET interface the fetchers and the geolocation client rely on.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, FetchError>;
}

/// [`HttpClient`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(proxy_config: &ProxyConfig) -> Result<Self, FetchError> {
        let mut client_builder = Client::builder().user_agent(DEFAULT_USER_AGENT);

        if let Some(proxy) = &proxy_config.proxy {
            if !proxy.is_empty() {
                let proxy = Proxy::all(proxy)
                    .map_err(|e| FetchError::Http(format!("Failed to set proxy: {}", e)))?;
                client_builder = client_builder.proxy(proxy);
            }
        }

        let client = client_builder
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(ReqwestClient { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, FetchError> {
        let mut request_builder = self.client.get(url).timeout(timeout);
        for (key, value) in headers {
            request_builder = request_builder.header(key.as_str(), value.as_str());
        }

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Http(format!("Failed to send request: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(format!("Failed to read response body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}
