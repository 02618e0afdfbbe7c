//! System utilities

use std::env;

/// Get system proxy settings from the usual environment variables
///
/// # Returns
///
/// The system proxy server string or empty string if not found
pub fn get_system_proxy() -> String {
    let proxy_env = [
        "all_proxy",
        "ALL_PROXY",
        "http_proxy",
        "HTTP_PROXY",
        "https_proxy",
        "HTTPS_PROXY",
    ];

    for var in &proxy_env {
        if let Ok(proxy) = env::var(var) {
            if !proxy.is_empty() {
                return proxy;
            }
        }
    }

    String::new()
}
