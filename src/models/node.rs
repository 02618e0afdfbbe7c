//! Canonical endpoint model
//!
//! Every source, whatever its raw shape, ends up as a list of [`Node`]s.

use std::fmt;

/// Which template parameter set a node is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolHint {
    Tls,
    Plain,
}

impl ProtocolHint {
    /// Tag used at the front of the display name.
    pub fn tag(self) -> &'static str {
        match self {
            ProtocolHint::Tls => "TLS",
            ProtocolHint::Plain => "PLAIN",
        }
    }

    pub fn is_tls(self) -> bool {
        matches!(self, ProtocolHint::Tls)
    }
}

impl fmt::Display for ProtocolHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Source variant a node came from.
///
/// Declaration order is the output order of the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    LocalDomain,
    PlainRemoteIp,
    TableRemoteIp,
    StructuredRemoteIp,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::LocalDomain => "local-domain",
            Origin::PlainRemoteIp => "plain-remote-ip",
            Origin::TableRemoteIp => "table-remote-ip",
            Origin::StructuredRemoteIp => "structured-remote-ip",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate server endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Domain name or literal IP address, never empty.
    pub host: String,
    /// Explicit port; the renderer picks a default when absent.
    pub port: Option<u16>,
    pub protocol_hint: ProtocolHint,
    /// Text used in the visible node name. Defaults to `host`.
    pub label: String,
    pub origin: Origin,
    /// 1-based position in the final subscription, set by the assembler.
    pub sequence_index: Option<usize>,
}

impl Node {
    /// Creates a TLS node whose label is its host.
    pub fn new(host: impl Into<String>, port: Option<u16>, origin: Origin) -> Self {
        let host = host.into();
        Node {
            label: host.clone(),
            host,
            port,
            protocol_hint: ProtocolHint::Tls,
            origin,
            sequence_index: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_protocol(mut self, protocol_hint: ProtocolHint) -> Self {
        self.protocol_hint = protocol_hint;
        self
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Display name carried in the URI fragment, e.g. `TLS-001-a.example`.
    ///
    /// Returns `None` until the assembler has assigned an index.
    pub fn display_name(&self, prefix: Option<&str>) -> Option<String> {
        let index = self.sequence_index?;
        let name = format!("{}-{:03}-{}", self.protocol_hint.tag(), index, self.label);
        Some(match prefix {
            Some(p) if !p.is_empty() => format!("{}-{}", p, name),
            _ => name,
        })
    }

    /// Key used to detect duplicate endpoints.
    pub fn endpoint_key(&self) -> (String, Option<u16>, ProtocolHint) {
        (self.host.to_ascii_lowercase(), self.port, self.protocol_hint)
    }
}
