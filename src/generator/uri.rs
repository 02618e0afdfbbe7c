use std::collections::BTreeMap;
use std::net::Ipv6Addr;

use crate::error::RenderError;
use crate::models::{Node, ProtocolHint, TemplateConfig};
use crate::parser::lines::is_valid_host;
use crate::utils::url::{url_encode, url_encode_keep};

/// Characters left as-is when encoding the websocket path.
const PATH_SAFE: &str = "/?&=";

/// Fingerprint used when the template does not pick one.
const DEFAULT_FINGERPRINT: &str = "random";

/// Parameters that only make sense on a TLS connection.
const TLS_ONLY_PARAMS: &[&str] = &["sni", "fp", "alpn", "allowInsecure"];

/// Convert a node to a single URI
///
/// Format: `scheme://credential@host:port?query#fragment`, where the query
/// is the template's parameters plus the per-node overrides, in key order,
/// and the fragment is the percent-encoded display name.
///
/// # Errors
/// * [`RenderError::MissingCredential`] if the template has no credential
/// * [`RenderError::MissingHost`] if the node's host is blank
/// * [`RenderError::InvalidHost`] if the host is neither a DNS name nor an IP
/// * [`RenderError::MissingIndex`] if no sequence index was assigned
pub fn render(node: &Node, config: &TemplateConfig) -> Result<String, RenderError> {
    if config.credential.trim().is_empty() {
        return Err(RenderError::MissingCredential);
    }
    let host = node.host.trim();
    if host.is_empty() {
        return Err(RenderError::MissingHost);
    }
    if !is_valid_host(host) {
        return Err(RenderError::InvalidHost(host.to_string()));
    }
    let name = node
        .display_name(config.remark_prefix.as_deref())
        .ok_or(RenderError::MissingIndex)?;

    let port = node.port.unwrap_or_else(|| config.fallback_port());
    let host = if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]", host)
    } else {
        host.to_string()
    };

    Ok(format!(
        "{}://{}@{}:{}?{}#{}",
        config.scheme,
        config.credential,
        host,
        port,
        build_query(node.protocol_hint, config),
        url_encode(&name)
    ))
}

/// Merge the template parameters with the fixed and protocol-specific ones.
fn build_query(hint: ProtocolHint, config: &TemplateConfig) -> String {
    let mut params: BTreeMap<&str, &str> = config
        .transport_params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    params.insert("encryption", "none");
    params.insert("type", "ws");
    params.insert("path", config.path());

    match hint {
        ProtocolHint::Tls => {
            params.insert("security", "tls");
            if let Some(sni) = config.sni() {
                params.insert("sni", sni);
            }
            params.insert("fp", config.param("fp").unwrap_or(DEFAULT_FINGERPRINT));
        }
        ProtocolHint::Plain => {
            params.insert("security", "none");
            for key in TLS_ONLY_PARAMS {
                params.remove(key);
            }
        }
    }

    params
        .into_iter()
        .map(|(key, value)| {
            let value = if key == "path" {
                url_encode_keep(value, PATH_SAFE)
            } else {
                url_encode(value)
            };
            format!("{}={}", url_encode(key), value)
        })
        .collect::<Vec<_>>()
        .join("&")
}
