//! Source descriptors and raw records

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::node::Origin;

/// The four kinds of address sources the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Newline-separated hosts in a local file.
    LocalList,
    /// Newline-separated hosts served over HTTP.
    RemoteList,
    /// An HTML page with one endpoint per table row.
    RemoteTable,
    /// `host:port#label` lines served over HTTP.
    RemoteStructured,
}

impl SourceKind {
    pub fn origin(self) -> Origin {
        match self {
            SourceKind::LocalList => Origin::LocalDomain,
            SourceKind::RemoteList => Origin::PlainRemoteIp,
            SourceKind::RemoteTable => Origin::TableRemoteIp,
            SourceKind::RemoteStructured => Origin::StructuredRemoteIp,
        }
    }

    pub fn is_remote(self) -> bool {
        !matches!(self, SourceKind::LocalList)
    }
}

/// Column layout of a [`SourceKind::RemoteTable`] page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub host_column: usize,
    pub label_column: usize,
    /// Rows with fewer cells are skipped.
    pub min_columns: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        TableLayout {
            host_column: 0,
            label_column: 4,
            min_columns: 5,
        }
    }
}

/// Everything needed to fetch and post-process one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    /// File path for local sources, URL for remote ones.
    pub location: String,
    pub headers: HashMap<String, String>,
    pub table: TableLayout,
    pub policy: SourcePolicy,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, location: impl Into<String>) -> Self {
        SourceDescriptor {
            kind,
            location: location.into(),
            headers: HashMap::new(),
            table: TableLayout::default(),
            policy: SourcePolicy::default(),
        }
    }

    /// Short name for diagnostics: the file name or the last URL segment.
    pub fn display_name(&self) -> &str {
        let trimmed = self.location.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

/// Per-source post-processing decisions made by the assembler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourcePolicy {
    /// Emit a TLS and a plain variant for every node of this source.
    pub dual_protocol: bool,
    /// Port given to nodes that carry none.
    pub default_port: Option<u16>,
    /// Replace labels with geolocation text.
    pub enrich: bool,
    /// Only enrich the first N nodes of this source.
    pub enrich_limit: Option<usize>,
}

/// A record as produced by a fetcher, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    /// One host from a flat list, optionally with a `:port` suffix.
    Line { host: String, port: Option<u16> },
    /// Host cell and secondary (ISP) cell of an HTML table row.
    TableRow { host: String, secondary: String },
    /// A parsed `host:port#label` line.
    Structured {
        host: String,
        port: u16,
        label: String,
    },
}

/// Records fetched from one source, tagged with their descriptor.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: SourceDescriptor,
    pub records: Vec<RawRecord>,
}
