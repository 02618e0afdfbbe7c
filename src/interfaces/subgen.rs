//! End-to-end run: settings in, encoded subscription out.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::error::{FetchError, GenerateError};
use crate::fetcher::SourceFetcher;
use crate::generator::{Subscription, SubscriptionAssembler};
use crate::geo::{DnsResolver, GeoCache, GeoLookup, GeoResolver, IpApiLookup, SystemResolver};
use crate::models::{Node, SourceBatch};
use crate::parser::{apply_default_port, expand_dual_protocol, normalize, parse_template};
use crate::settings::Settings;
use crate::utils::file::file_get;
use crate::utils::http_std::{parse_proxy, HttpClient, ReqwestClient};

/// External services used by a run.
#[derive(Clone)]
pub struct Collaborators {
    pub http: Arc<dyn HttpClient>,
    pub dns: Arc<dyn DnsResolver>,
    pub geo: Arc<dyn GeoLookup>,
}

impl Collaborators {
    /// Real network implementations configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(&parse_proxy(&settings.proxy))?);
        let geo = IpApiLookup::new(
            http.clone(),
            &settings.geo.lang,
            Duration::from_secs(settings.geo.timeout_secs),
        )
        .with_base_url(&settings.geo.api_base_url);

        Ok(Collaborators {
            http,
            dns: Arc::new(SystemResolver),
            geo: Arc::new(geo),
        })
    }
}

/// Build the subscription described by `settings`.
///
/// The template is parsed before anything is fetched, so configuration
/// errors abort the run early.
///
/// # Errors
/// * [`GenerateError::Config`] for an unreadable or invalid template
/// * [`GenerateError::EmptyResult`] when no source produced a usable node
pub async fn generate(
    settings: &Settings,
    collaborators: &Collaborators,
) -> Result<Subscription, GenerateError> {
    let raw_template = file_get(&settings.template_path)?;
    let template = parse_template(&raw_template, &settings.template_overrides())?;
    info!(
        "Loaded {} template from {}",
        template.scheme, settings.template_path
    );

    let fetcher = SourceFetcher::new(collaborators.http.clone(), settings.fetch_timeout());
    let batches = fetcher.fetch_all(&settings.source_descriptors()).await;

    let total: usize = batches.iter().map(|b| b.records.len()).sum();
    if total == 0 {
        warn!("No records from any source");
        return Err(GenerateError::EmptyResult);
    }
    info!("Collected {} records from {} sources", total, batches.len());

    let nodes = build_nodes(settings, collaborators, batches).await;
    SubscriptionAssembler::new(settings.dedupe).build(nodes, &template)
}

/// Normalize every batch and apply its source policy.
async fn build_nodes(
    settings: &Settings,
    collaborators: &Collaborators,
    batches: Vec<SourceBatch>,
) -> Vec<Node> {
    let resolver = if settings.geo.enabled {
        Some(
            GeoResolver::new(
                collaborators.dns.clone(),
                collaborators.geo.clone(),
                Duration::from_millis(settings.geo.min_delay_ms),
            )
            .with_cdn_keywords(settings.geo.cdn_keywords.clone()),
        )
    } else {
        None
    };
    let cache = GeoCache::new();

    let mut nodes = Vec::new();
    for batch in batches {
        let policy = &batch.source.policy;
        let mut batch_nodes = normalize(batch.source.kind.origin(), batch.records);

        if let Some(port) = policy.default_port {
            apply_default_port(&mut batch_nodes, port);
        }

        if let (true, Some(resolver)) = (policy.enrich, resolver.as_ref()) {
            let limit = policy
                .enrich_limit
                .unwrap_or(batch_nodes.len())
                .min(batch_nodes.len());
            info!(
                "Resolving locations for {} nodes from {}",
                limit,
                batch.source.display_name()
            );
            resolver
                .enrich(&cache, &mut batch_nodes[..limit], settings.geo.concurrency)
                .await;
        }

        if policy.dual_protocol {
            batch_nodes = expand_dual_protocol(batch_nodes, settings.plain_port);
        }
        nodes.extend(batch_nodes);
    }
    nodes
}

/// Write the payload as a single opaque blob.
pub fn write_subscription(path: &str, payload: &str) -> Result<(), GenerateError> {
    std::fs::write(path, payload).map_err(|source| GenerateError::Write {
        path: path.to_string(),
        source,
    })
}
