//! Best-effort location labels for nodes.
//!
//! [`GeoResolver::resolve`] never fails: service errors degrade to a
//! TLD-based guess and finally to the host itself. Every outcome is stored
//! in the run's [`GeoCache`].

pub mod cache;
pub mod dns;
pub mod ip_api;
pub mod suffix;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::debug;

use crate::error::GeoError;
use crate::models::Node;
use crate::utils::string::{contains_ignore_case, non_blank};

pub use cache::{GeoCache, RateLimiter};
pub use dns::{DnsResolver, SystemResolver};
pub use ip_api::{GeoLookup, GeoRecord, IpApiLookup};
pub use suffix::fallback_label;

/// Operators whose city-level location is meaningless (anycast ranges).
pub const CDN_KEYWORDS: &[&str] = &["cloudflare", "akamai", "fastly", "cloudfront", "cdn"];

/// `host` without a trailing `:port`; bracketed IPv6 loses its brackets.
pub fn strip_port(host: &str) -> &str {
    if let Some(inner) = host.strip_prefix('[') {
        return inner.split(']').next().unwrap_or(inner);
    }
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }
    match host.rsplit_once(':') {
        Some((bare, port)) if port.parse::<u16>().is_ok() => bare,
        _ => host,
    }
}

/// Pick a label from a geolocation record.
///
/// CDN operators get their AS organization name; everyone else gets city,
/// then region, then country. `None` when every candidate is blank.
pub fn label_from_record(record: &GeoRecord, cdn_keywords: &[String]) -> Option<String> {
    let is_cdn = cdn_keywords.iter().any(|kw| {
        contains_ignore_case(&record.isp, kw) || contains_ignore_case(&record.org, kw)
    });

    let label = if is_cdn {
        record
            .asn
            .split_once(' ')
            .and_then(|(_, name)| non_blank(name))
            .or_else(|| non_blank(&record.org))
            .or_else(|| non_blank(&record.isp))
    } else {
        non_blank(&record.city)
            .or_else(|| non_blank(&record.region))
            .or_else(|| non_blank(&record.country))
    };
    label.map(str::to_string)
}

pub struct GeoResolver {
    dns: Arc<dyn DnsResolver>,
    lookup: Arc<dyn GeoLookup>,
    limiter: RateLimiter,
    cdn_keywords: Vec<String>,
}

impl GeoResolver {
    /// `min_delay` is the global spacing between geolocation service calls.
    pub fn new(dns: Arc<dyn DnsResolver>, lookup: Arc<dyn GeoLookup>, min_delay: Duration) -> Self {
        GeoResolver {
            dns,
            lookup,
            limiter: RateLimiter::new(min_delay),
            cdn_keywords: CDN_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_cdn_keywords(mut self, keywords: Vec<String>) -> Self {
        self.cdn_keywords = keywords;
        self
    }

    /// Label for `host`, resolved at most once per cache.
    pub async fn resolve(&self, cache: &GeoCache, host: &str) -> String {
        let cell = cache.cell(host).await;
        cell.get_or_init(|| self.resolve_uncached(host))
            .await
            .clone()
    }

    /// Replace the labels of `nodes` with resolved labels, in place.
    ///
    /// Up to `concurrency` distinct lookups run at once; the rate limit
    /// still applies across all of them.
    pub async fn enrich(&self, cache: &GeoCache, nodes: &mut [Node], concurrency: usize) {
        let hosts: Vec<String> = nodes.iter().map(|n| n.host.clone()).collect();
        let labels: Vec<String> = stream::iter(hosts)
            .map(|host| async move { self.resolve(cache, &host).await })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        for (node, label) in nodes.iter_mut().zip(labels) {
            node.label = label;
        }
    }

    async fn resolve_uncached(&self, host: &str) -> String {
        match self.lookup_label(host).await {
            Ok(label) => {
                debug!("{} -> {}", host, label);
                label
            }
            Err(e) => {
                let fallback = fallback_label(host);
                debug!("{} geolocation failed ({}), using {}", host, e, fallback);
                fallback
            }
        }
    }

    async fn lookup_label(&self, host: &str) -> Result<String, GeoError> {
        let bare = strip_port(host);
        let ip = match bare.parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(_) => self.dns.resolve(bare).await?,
        };

        self.limiter.wait().await;
        let record = self.lookup.lookup(ip).await?;
        label_from_record(&record, &self.cdn_keywords).ok_or(GeoError::NoLocation)
    }
}
