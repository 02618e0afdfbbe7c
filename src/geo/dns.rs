use async_trait::async_trait;
use std::net::IpAddr;

use crate::error::GeoError;

/// Hostname to address resolution.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr, GeoError>;
}

/// Resolver backed by the operating system (`getaddrinfo`). IPv4 answers
/// are preferred.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, GeoError> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| GeoError::Dns(format!("{}: {}", host, e)))?
            .map(|addr| addr.ip())
            .collect();

        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| GeoError::Dns(format!("{}: no addresses", host)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_localhost() {
        let ip = SystemResolver.resolve("localhost").await.unwrap();
        assert!(ip.is_loopback());
    }
}
