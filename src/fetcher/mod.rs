//! Source fetching
//!
//! One [`SourceFetcher`] serves all four source kinds. Every fetch is
//! bounded by a timeout, and [`SourceFetcher::fetch_all`] turns per-source
//! failures into empty batches so one bad source never stops the run.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};

use crate::error::FetchError;
use crate::models::{RawRecord, SourceBatch, SourceDescriptor, SourceKind};
use crate::parser::lines::{parse_list_body, parse_structured_body};
use crate::parser::table::{parse_table_rows, table_records};
use crate::utils::file::file_get_async;
use crate::utils::http_std::HttpClient;

/// Default upper bound for a single source.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SourceFetcher {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        SourceFetcher { http, timeout }
    }

    /// Fetch and parse one source.
    ///
    /// # Errors
    /// Any I/O, HTTP, status or format failure, or [`FetchError::Timeout`]
    /// when the whole operation exceeds the configured timeout.
    pub async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawRecord>, FetchError> {
        match tokio::time::timeout(self.timeout, self.fetch_records(source)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }

    /// Fetch every source concurrently. Failed sources yield empty batches.
    ///
    /// The returned batches are in the same order as `sources`.
    pub async fn fetch_all(&self, sources: &[SourceDescriptor]) -> Vec<SourceBatch> {
        join_all(sources.iter().map(|source| async move {
            let records = match self.fetch(source).await {
                Ok(records) => {
                    info!(
                        "Fetched {} records from {} ({:?})",
                        records.len(),
                        source.display_name(),
                        source.kind
                    );
                    records
                }
                Err(e) => {
                    warn!(
                        "Source {} ({:?}) failed, skipping: {}",
                        source.display_name(),
                        source.kind,
                        e
                    );
                    Vec::new()
                }
            };
            SourceBatch {
                source: source.clone(),
                records,
            }
        }))
        .await
    }

    async fn fetch_records(&self, source: &SourceDescriptor) -> Result<Vec<RawRecord>, FetchError> {
        match source.kind {
            SourceKind::LocalList => {
                let body = file_get_async(&source.location).await?;
                Ok(parse_list_body(&body))
            }
            SourceKind::RemoteList => {
                let body = self.get_body(source).await?;
                Ok(parse_list_body(&body))
            }
            SourceKind::RemoteTable => {
                let body = self.get_body(source).await?;
                let rows = parse_table_rows(&body);
                if rows.is_empty() {
                    return Err(FetchError::Format("no table rows found".to_string()));
                }
                Ok(table_records(rows, &source.table))
            }
            SourceKind::RemoteStructured => {
                let body = self.get_body(source).await?;
                Ok(parse_structured_body(&body))
            }
        }
    }

    async fn get_body(&self, source: &SourceDescriptor) -> Result<String, FetchError> {
        let response = self
            .http
            .get(&source.location, self.timeout, &source.headers)
            .await?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status));
        }
        Ok(response.body)
    }
}
