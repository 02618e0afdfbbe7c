//! Error types, one enum per failure scope.

use std::time::Duration;
use thiserror::Error;

/// Fatal problems with the run's inputs. Raised before any fetch starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template is empty")]
    EmptyTemplate,

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("Template has no credential in its authority")]
    MissingCredential,

    #[error("Invalid settings: {0}")]
    Settings(String),
}

/// Failure of a single source. The source contributes nothing; the run goes on.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Http(String),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected format: {0}")]
    Format(String),
}

/// A node that cannot become a URI.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("Node has no host")]
    MissingHost,

    #[error("Node host {0:?} is not a DNS name or IP address")]
    InvalidHost(String),

    #[error("Node has no sequence index")]
    MissingIndex,

    #[error("Template has no credential")]
    MissingCredential,
}

/// Geolocation failures. Never leave the geo module.
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("Geolocation service error: {0}")]
    Service(String),

    #[error("No usable location in response")]
    NoLocation,
}

/// Run-level outcomes surfaced to the caller.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No nodes survived from any source, nothing to generate")]
    EmptyResult,

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
