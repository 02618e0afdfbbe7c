//! Template parsing
//!
//! The template is a single connection URI such as
//! `vless://UUID@any.host:443?encryption=none&type=ws&host=h.example&path=%2F#name`.
//! Only its scheme, credential, port and query matter; host and fragment
//! are replaced per node.

use std::collections::BTreeMap;

use log::debug;

use crate::error::ConfigError;
use crate::models::TemplateConfig;

/// Run-level adjustments applied while building a [`TemplateConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOverrides {
    /// Forces both the `host` header and `sni` to this value.
    pub override_host: Option<String>,
    pub use_template_port: bool,
    pub remark_prefix: Option<String>,
}

/// Parse the template text into a [`TemplateConfig`].
///
/// The first non-empty, non-comment line is used, so a template file may
/// carry notes above the URI.
///
/// # Errors
/// * [`ConfigError::EmptyTemplate`] when no URI line exists
/// * [`ConfigError::MalformedTemplate`] when the scheme or port is unusable
/// * [`ConfigError::MissingCredential`] when the authority has no userinfo
pub fn parse_template(
    raw: &str,
    overrides: &TemplateOverrides,
) -> Result<TemplateConfig, ConfigError> {
    let line = crate::utils::string::content_lines(raw)
        .next()
        .ok_or(ConfigError::EmptyTemplate)?;

    let (scheme, rest) = line
        .split_once("://")
        .ok_or_else(|| ConfigError::MalformedTemplate(format!("no scheme in '{}'", line)))?;
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return Err(ConfigError::MalformedTemplate(format!(
            "invalid scheme '{}'",
            scheme
        )));
    }

    // Drop the fragment; node names are generated.
    let rest = rest.split('#').next().unwrap_or_default();
    let (before_query, query) = match rest.split_once('?') {
        Some((b, q)) => (b, q),
        None => (rest, ""),
    };
    let authority = before_query.split('/').next().unwrap_or_default();

    let (credential, host_port) = authority
        .rsplit_once('@')
        .ok_or(ConfigError::MissingCredential)?;
    if credential.trim().is_empty() {
        return Err(ConfigError::MissingCredential);
    }

    let template_port = parse_authority_port(host_port)?;

    let mut transport_params = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        transport_params.insert(key.into_owned(), value.into_owned());
    }

    if let Some(host) = overrides.override_host.as_deref().filter(|h| !h.is_empty()) {
        debug!("Overriding template host and sni with {}", host);
        transport_params.insert("host".to_string(), host.to_string());
        transport_params.insert("sni".to_string(), host.to_string());
    }

    Ok(TemplateConfig {
        scheme: scheme.to_ascii_lowercase(),
        credential: credential.trim().to_string(),
        template_port,
        transport_params,
        use_template_port: overrides.use_template_port,
        remark_prefix: overrides.remark_prefix.clone().filter(|p| !p.is_empty()),
    })
}

/// Extract the port from `host:port`, `[v6]:port`, or a port-less host.
fn parse_authority_port(host_port: &str) -> Result<Option<u16>, ConfigError> {
    let port_str = if let Some(stripped) = host_port.strip_prefix('[') {
        match stripped.split_once(']') {
            Some((_, tail)) => tail.strip_prefix(':'),
            None => {
                return Err(ConfigError::MalformedTemplate(format!(
                    "unterminated '[' in '{}'",
                    host_port
                )))
            }
        }
    } else {
        host_port.rsplit_once(':').map(|(_, p)| p)
    };

    match port_str {
        None | Some("") => Ok(None),
        Some(p) => p
            .parse::<u16>()
            .map(Some)
            .map_err(|_| ConfigError::MalformedTemplate(format!("invalid port '{}'", p))),
    }
}
