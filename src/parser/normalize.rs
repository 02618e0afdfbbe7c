//! Raw records to canonical nodes.

use std::collections::HashSet;

use log::debug;

use crate::models::{Node, Origin, ProtocolHint, RawRecord};
use crate::parser::lines::is_valid_host;
use crate::utils::string::{non_blank, strip_whitespace};

/// Convert one source's records into nodes, keeping their order.
///
/// Records whose host is blank or not a DNS name or IP literal are dropped,
/// as are table rows whose secondary column is empty.
pub fn normalize(origin: Origin, records: Vec<RawRecord>) -> Vec<Node> {
    records
        .into_iter()
        .filter_map(|record| normalize_record(origin, record))
        .collect()
}

fn usable_host(origin: Origin, host: &str) -> Option<&str> {
    let host = non_blank(host)?;
    if !is_valid_host(host) {
        debug!("Dropping {} record with malformed host {:?}", origin, host);
        return None;
    }
    Some(host)
}

fn normalize_record(origin: Origin, record: RawRecord) -> Option<Node> {
    match record {
        RawRecord::Line { host, port } => {
            let host = usable_host(origin, &host)?;
            Some(Node::new(host, port, origin))
        }
        RawRecord::TableRow { host, secondary } => {
            let host = usable_host(origin, &host)?;
            let label = strip_whitespace(&secondary);
            if label.is_empty() {
                return None;
            }
            Some(Node::new(host, None, origin).with_label(label))
        }
        RawRecord::Structured { host, port, label } => {
            let host = usable_host(origin, &host)?;
            let label = non_blank(&label).unwrap_or(host).to_string();
            Some(Node::new(host, Some(port), origin).with_label(label))
        }
    }
}

/// Give port-less nodes the source's default port.
pub fn apply_default_port(nodes: &mut [Node], port: u16) {
    for node in nodes.iter_mut().filter(|n| n.port.is_none()) {
        node.port = Some(port);
    }
}

/// Emit a TLS variant followed by a plain variant for every node.
///
/// The TLS variant keeps the node's port; the plain variant is moved to
/// `plain_port`.
pub fn expand_dual_protocol(nodes: Vec<Node>, plain_port: u16) -> Vec<Node> {
    let mut expanded = Vec::with_capacity(nodes.len() * 2);
    for node in nodes {
        let plain = node
            .clone()
            .with_protocol(ProtocolHint::Plain)
            .with_port(Some(plain_port));
        expanded.push(node.with_protocol(ProtocolHint::Tls));
        expanded.push(plain);
    }
    expanded
}

/// Drop nodes whose (host, port, protocol) was already seen. First one wins.
pub fn dedupe(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter(|node| seen.insert(node.endpoint_key()))
        .collect()
}
