use crate::error::ConfigError;

/// Reads a whole configuration file, mapping failures to [`ConfigError::Read`].
pub fn file_get(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })
}

/// Async counterpart of [`file_get`] used by the local list fetcher.
pub async fn file_get_async(path: &str) -> std::io::Result<String> {
    tokio::fs::read_to_string(path).await
}
