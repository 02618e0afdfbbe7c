use log::{info, warn};

use crate::error::{ConfigError, GenerateError, RenderError};
use crate::generator::uri::render;
use crate::models::{Node, TemplateConfig};
use crate::parser::normalize::dedupe;
use crate::utils::base64::base64_encode;

/// Result of assembling one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Ordered nodes with their assigned sequence indices.
    pub nodes: Vec<Node>,
    /// One URI per renderable node, in output order.
    pub uris: Vec<String>,
    /// Nodes skipped because they could not be rendered.
    pub skipped: usize,
    /// Base64 of the newline-joined URIs.
    pub payload: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionAssembler {
    /// Drop repeated (host, port, protocol) endpoints before numbering.
    pub dedupe: bool,
}

impl SubscriptionAssembler {
    pub fn new(dedupe: bool) -> Self {
        SubscriptionAssembler { dedupe }
    }

    /// Order, number, render, join and encode `nodes`.
    ///
    /// # Errors
    /// * [`GenerateError::EmptyResult`] when no node is left to render
    /// * [`GenerateError::Config`] when the template has no credential
    pub fn build(
        &self,
        nodes: Vec<Node>,
        config: &TemplateConfig,
    ) -> Result<Subscription, GenerateError> {
        let nodes = if self.dedupe { dedupe(nodes) } else { nodes };
        let nodes = order_nodes(nodes);
        if nodes.is_empty() {
            return Err(GenerateError::EmptyResult);
        }

        let mut uris = Vec::with_capacity(nodes.len());
        let mut skipped = 0;
        for node in &nodes {
            match render(node, config) {
                Ok(uri) => uris.push(uri),
                Err(RenderError::MissingCredential) => {
                    return Err(ConfigError::MissingCredential.into());
                }
                Err(e) => {
                    warn!("Skipping node {:?} from {}: {}", node.host, node.origin, e);
                    skipped += 1;
                }
            }
        }
        if uris.is_empty() {
            return Err(GenerateError::EmptyResult);
        }

        info!("Rendered {} nodes ({} skipped)", uris.len(), skipped);
        let payload = base64_encode(&uris.join("\n"));
        Ok(Subscription {
            nodes,
            uris,
            skipped,
            payload,
        })
    }

    pub fn assemble(&self, nodes: Vec<Node>, config: &TemplateConfig) -> Result<String, GenerateError> {
        self.build(nodes, config).map(|sub| sub.payload)
    }
}

/// Assemble with default options and return the encoded payload.
pub fn assemble(nodes: Vec<Node>, config: &TemplateConfig) -> Result<String, GenerateError> {
    SubscriptionAssembler::default().assemble(nodes, config)
}

/// Stable sort by origin, then assign 1-based sequence indices.
pub fn order_nodes(mut nodes: Vec<Node>) -> Vec<Node> {
    nodes.sort_by_key(|node| node.origin);
    for (i, node) in nodes.iter_mut().enumerate() {
        node.sequence_index = Some(i + 1);
    }
    nodes
}
