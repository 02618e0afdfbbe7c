//! Typed form of the connection template

use std::collections::BTreeMap;

/// Fallback for the websocket `path` parameter.
pub const DEFAULT_PATH: &str = "/";

/// Port used when neither the node nor the template supplies one.
pub const DEFAULT_PORT: u16 = 443;

/// Credential and baseline transport parameters shared by every node.
///
/// Built once by [`crate::parser::template::parse_template`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    pub scheme: String,
    pub credential: String,
    /// Port embedded in the template's authority, if any.
    pub template_port: Option<u16>,
    /// Decoded query parameters, kept in key order.
    pub transport_params: BTreeMap<String, String>,
    /// Let port-less nodes use `template_port` before [`DEFAULT_PORT`].
    pub use_template_port: bool,
    /// Optional text prepended to every display name.
    pub remark_prefix: Option<String>,
}

impl TemplateConfig {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.transport_params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Websocket path, `/` when the template has none.
    pub fn path(&self) -> &str {
        self.param("path").unwrap_or(DEFAULT_PATH)
    }

    pub fn host_header(&self) -> Option<&str> {
        self.param("host")
    }

    /// SNI value, falling back to the host header.
    pub fn sni(&self) -> Option<&str> {
        self.param("sni").or_else(|| self.host_header())
    }

    /// Port for a node that carries none.
    pub fn fallback_port(&self) -> u16 {
        if self.use_template_port {
            self.template_port.unwrap_or(DEFAULT_PORT)
        } else {
            DEFAULT_PORT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(params: &[(&str, &str)]) -> TemplateConfig {
        TemplateConfig {
            scheme: "vless".to_string(),
            credential: "uid".to_string(),
            template_port: Some(8443),
            transport_params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            use_template_port: false,
            remark_prefix: None,
        }
    }

    #[test]
    fn test_path_defaults_to_root() {
        assert_eq!(config(&[]).path(), "/");
        assert_eq!(config(&[("path", "")]).path(), "/");
        assert_eq!(config(&[("path", "/ws")]).path(), "/ws");
    }

    #[test]
    fn test_sni_falls_back_to_host_header() {
        assert_eq!(config(&[("host", "h.example")]).sni(), Some("h.example"));
        assert_eq!(
            config(&[("host", "h.example"), ("sni", "s.example")]).sni(),
            Some("s.example")
        );
        assert_eq!(config(&[]).sni(), None);
    }

    #[test]
    fn test_fallback_port_policy() {
        let mut cfg = config(&[]);
        assert_eq!(cfg.fallback_port(), 443);
        cfg.use_template_port = true;
        assert_eq!(cfg.fallback_port(), 8443);
        cfg.template_port = None;
        assert_eq!(cfg.fallback_port(), 443);
    }
}
