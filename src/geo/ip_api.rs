//! Geolocation lookups against the ip-api.com JSON endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GeoError;
use crate::utils::http_std::HttpClient;

pub const IP_API_BASE_URL: &str = "http://ip-api.com";

const IP_API_FIELDS: &str = "status,message,country,regionName,city,isp,org,as";

/// Location and operator fields of one address. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoRecord {
    pub country: String,
    pub region: String,
    pub city: String,
    pub isp: String,
    pub org: String,
    /// Autonomous system, e.g. `AS13335 Cloudflare, Inc.`
    pub asn: String,
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoRecord, GeoError>;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct IpApiResponse {
    status: String,
    message: String,
    country: String,
    #[serde(rename = "regionName")]
    region_name: String,
    city: String,
    isp: String,
    org: String,
    #[serde(rename = "as")]
    asn: String,
}

/// Parse an ip-api.com response body.
pub fn parse_ip_api_response(body: &str) -> Result<GeoRecord, GeoError> {
    let resp: IpApiResponse = serde_json::from_str(body)
        .map_err(|e| GeoError::Service(format!("invalid JSON: {}", e)))?;
    if resp.status != "success" {
        return Err(GeoError::Service(if resp.message.is_empty() {
            format!("status '{}'", resp.status)
        } else {
            resp.message
        }));
    }
    Ok(GeoRecord {
        country: resp.country,
        region: resp.region_name,
        city: resp.city,
        isp: resp.isp,
        org: resp.org,
        asn: resp.asn,
    })
}

pub struct IpApiLookup {
    http: Arc<dyn HttpClient>,
    base_url: String,
    lang: String,
    timeout: Duration,
}

impl IpApiLookup {
    pub fn new(http: Arc<dyn HttpClient>, lang: &str, timeout: Duration) -> Self {
        IpApiLookup {
            http,
            base_url: IP_API_BASE_URL.to_string(),
            lang: lang.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url_for(&self, ip: IpAddr) -> String {
        format!(
            "{}/json/{}?fields={}&lang={}",
            self.base_url, ip, IP_API_FIELDS, self.lang
        )
    }
}

#[async_trait]
impl GeoLookup for IpApiLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoRecord, GeoError> {
        let response = self
            .http
            .get(&self.url_for(ip), self.timeout, &HashMap::new())
            .await
            .map_err(|e| GeoError::Service(e.to_string()))?;
        if !response.is_success() {
            return Err(GeoError::Service(format!("HTTP error: {}", response.status)));
        }
        parse_ip_api_response(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::utils::http_std::HttpResponse;
    use std::sync::Mutex;

    #[test]
    fn test_parse_success() {
        let body = r#"{"status":"success","country":"Japan","regionName":"Tokyo","city":"Tokyo","isp":"Cloudflare, Inc.","org":"Cloudflare, Inc.","as":"AS13335 Cloudflare, Inc."}"#;
        let record = parse_ip_api_response(body).unwrap();
        assert_eq!(record.country, "Japan");
        assert_eq!(record.region, "Tokyo");
        assert_eq!(record.asn, "AS13335 Cloudflare, Inc.");
    }

    #[test]
    fn test_parse_missing_fields_default_empty() {
        let record = parse_ip_api_response(r#"{"status":"success","country":"Germany"}"#).unwrap();
        assert_eq!(record.country, "Germany");
        assert!(record.city.is_empty());
        assert!(record.asn.is_empty());
    }

    #[test]
    fn test_parse_failure_status() {
        let err = parse_ip_api_response(r#"{"status":"fail","message":"private range"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("private range"));
        assert!(parse_ip_api_response("<html>").is_err());
    }

    struct RecordingHttp {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for RecordingHttp {
        async fn get(
            &self,
            url: &str,
            _timeout: Duration,
            _headers: &HashMap<String, String>,
        ) -> Result<HttpResponse, FetchError> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: 200,
                body: r#"{"status":"success","city":"Frankfurt"}"#.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_lookup_builds_url() {
        let http = Arc::new(RecordingHttp {
            urls: Mutex::new(Vec::new()),
        });
        let lookup = IpApiLookup::new(http.clone(), "en", Duration::from_secs(5))
            .with_base_url("http://geo.test/");

        let record = lookup.lookup("1.2.3.4".parse().unwrap()).await.unwrap();
        assert_eq!(record.city, "Frankfurt");

        let urls = http.urls.lock().unwrap();
        assert_eq!(
            urls[0],
            "http://geo.test/json/1.2.3.4?fields=status,message,country,regionName,city,isp,org,as&lang=en"
        );
    }
}
