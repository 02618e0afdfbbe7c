//! Core data models for the application
//!
//! This module contains the primary data structures used throughout the
//! pipeline, separated from the logic that operates on them.
//!
//! ```rust
//! use subgen::models::{Node, Origin, ProtocolHint};
//!
//! let node = Node::new("a.example", None, Origin::LocalDomain);
//! assert_eq!(node.protocol_hint, ProtocolHint::Tls);
//! assert_eq!(node.label, "a.example");
//! ```

pub mod node;
pub mod source;
pub mod template;

pub use node::{Node, Origin, ProtocolHint};
pub use source::{RawRecord, SourceBatch, SourceDescriptor, SourceKind, SourcePolicy, TableLayout};
pub use template::{TemplateConfig, DEFAULT_PATH, DEFAULT_PORT};
