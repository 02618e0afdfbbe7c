use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geo::CDN_KEYWORDS;
use crate::models::{SourceDescriptor, SourceKind, SourcePolicy, TableLayout};
use crate::parser::template::TemplateOverrides;
use crate::utils::file::file_get;

pub const DEFAULT_DOMAINS_FILE: &str = "domains.txt";
pub const DEFAULT_PLAIN_IP_URL: &str =
    "https://raw.githubusercontent.com/barry-far/V2ray-Configs/main/All_IPs_port_443.txt";
/// Only the head of the plain IP list is geolocated in a stock run.
pub const DEFAULT_PLAIN_IP_ENRICH_LIMIT: usize = 50;
pub const DEFAULT_TABLE_URL: &str = "https://stock.hostmonit.com/CloudFlareYes";
pub const DEFAULT_STRUCTURED_URL: &str =
    "https://raw.githubusercontent.com/qwer-search/bestip/refs/heads/main/kejilandbestip.txt";

/// Sent to table pages, which tend to reject non-browser clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

// Default value functions for serde
pub fn default_template_path() -> String {
    "vless_template.txt".to_string()
}

pub fn default_output_path() -> String {
    "sub.txt".to_string()
}

pub fn default_timeout_secs() -> u64 {
    10
}

pub fn default_proxy() -> String {
    "NONE".to_string()
}

pub fn default_plain_port() -> u16 {
    80
}

pub fn default_true() -> bool {
    true
}

pub fn default_geo_lang() -> String {
    "en".to_string()
}

pub fn default_geo_min_delay_ms() -> u64 {
    150
}

pub fn default_geo_concurrency() -> usize {
    4
}

pub fn default_geo_timeout_secs() -> u64 {
    5
}

pub fn default_geo_api_base_url() -> String {
    crate::geo::ip_api::IP_API_BASE_URL.to_string()
}

pub fn default_cdn_keywords() -> Vec<String> {
    CDN_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

pub fn default_host_column() -> usize {
    0
}

pub fn default_label_column() -> usize {
    4
}

pub fn default_min_columns() -> usize {
    5
}

/// The four sources of a stock run.
pub fn default_sources() -> Vec<SourceSettings> {
    vec![
        SourceSettings {
            enrich: true,
            ..SourceSettings::new(SourceKind::LocalList, DEFAULT_DOMAINS_FILE)
        },
        SourceSettings {
            enrich: true,
            enrich_limit: Some(DEFAULT_PLAIN_IP_ENRICH_LIMIT),
            ..SourceSettings::new(SourceKind::RemoteList, DEFAULT_PLAIN_IP_URL)
        },
        SourceSettings::new(SourceKind::RemoteTable, DEFAULT_TABLE_URL),
        SourceSettings::new(SourceKind::RemoteStructured, DEFAULT_STRUCTURED_URL),
    ]
}

/// Geolocation enrichment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSettings {
    pub enabled: bool,
    /// Response language passed to the geolocation service.
    pub lang: String,
    /// Minimum spacing between service calls, shared by all workers.
    pub min_delay_ms: u64,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub api_base_url: String,
    pub cdn_keywords: Vec<String>,
}

impl Default for GeoSettings {
    fn default() -> Self {
        GeoSettings {
            enabled: default_true(),
            lang: default_geo_lang(),
            min_delay_ms: default_geo_min_delay_ms(),
            concurrency: default_geo_concurrency(),
            timeout_secs: default_geo_timeout_secs(),
            api_base_url: default_geo_api_base_url(),
            cdn_keywords: default_cdn_keywords(),
        }
    }
}

/// One `[[sources]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// File path or URL.
    pub location: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub enrich: bool,
    #[serde(default)]
    pub enrich_limit: Option<usize>,
    #[serde(default)]
    pub dual_protocol: bool,
    #[serde(default)]
    pub default_port: Option<u16>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_host_column")]
    pub host_column: usize,
    #[serde(default = "default_label_column")]
    pub label_column: usize,
    #[serde(default = "default_min_columns")]
    pub min_columns: usize,
}

impl SourceSettings {
    pub fn new(kind: SourceKind, location: &str) -> Self {
        SourceSettings {
            kind,
            location: location.to_string(),
            enabled: true,
            enrich: false,
            enrich_limit: None,
            dual_protocol: false,
            default_port: None,
            headers: HashMap::new(),
            host_column: default_host_column(),
            label_column: default_label_column(),
            min_columns: default_min_columns(),
        }
    }

    pub fn to_descriptor(&self) -> SourceDescriptor {
        let mut headers = self.headers.clone();
        if self.kind == SourceKind::RemoteTable
            && !headers.keys().any(|k| k.eq_ignore_ascii_case("user-agent"))
        {
            headers.insert("User-Agent".to_string(), BROWSER_USER_AGENT.to_string());
        }

        SourceDescriptor {
            kind: self.kind,
            location: self.location.clone(),
            headers,
            table: TableLayout {
                host_column: self.host_column,
                label_column: self.label_column,
                min_columns: self.min_columns,
            },
            policy: SourcePolicy {
                dual_protocol: self.dual_protocol,
                default_port: self.default_port,
                enrich: self.enrich,
                enrich_limit: self.enrich_limit,
            },
        }
    }
}

/// Settings structure holding the whole run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub template_path: String,
    pub output_path: String,
    /// Forces the template's `host` and `sni` parameters.
    pub override_host: Option<String>,
    pub use_template_port: bool,
    pub remark_prefix: Option<String>,
    pub dedupe: bool,
    pub timeout_secs: u64,
    /// `NONE`, `SYSTEM`, or a proxy URL used for all HTTP traffic.
    pub proxy: String,
    /// Port of the plain variant produced by dual-protocol expansion.
    pub plain_port: u16,
    pub geo: GeoSettings,
    pub sources: Vec<SourceSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            template_path: default_template_path(),
            output_path: default_output_path(),
            override_host: None,
            use_template_port: false,
            remark_prefix: None,
            dedupe: false,
            timeout_secs: default_timeout_secs(),
            proxy: default_proxy(),
            plain_port: default_plain_port(),
            geo: GeoSettings::default(),
            sources: default_sources(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML or YAML file, chosen by extension.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = file_get(path)?;
        let is_yaml = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| ConfigError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.template_path.trim().is_empty() {
            return Err(ConfigError::Settings("template_path is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Settings("timeout_secs must be positive".to_string()));
        }
        if self.plain_port == 0 {
            return Err(ConfigError::Settings("plain_port must be positive".to_string()));
        }
        for source in &self.sources {
            if source.location.trim().is_empty() {
                return Err(ConfigError::Settings(format!(
                    "{:?} source has an empty location",
                    source.kind
                )));
            }
            if source.kind.is_remote() {
                let scheme = url::Url::parse(&source.location)
                    .map(|u| u.scheme().to_string())
                    .unwrap_or_default();
                if scheme != "http" && scheme != "https" {
                    return Err(ConfigError::Settings(format!(
                        "{:?} source location is not an http(s) URL: {}",
                        source.kind, source.location
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Descriptors of every enabled source, in configuration order.
    pub fn source_descriptors(&self) -> Vec<SourceDescriptor> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .map(SourceSettings::to_descriptor)
            .collect()
    }

    pub fn template_overrides(&self) -> TemplateOverrides {
        TemplateOverrides {
            override_host: self.override_host.clone(),
            use_template_port: self.use_template_port,
            remark_prefix: self.remark_prefix.clone(),
        }
    }

    /// Point the local list sources at `path`, adding one if none exists.
    pub fn set_domains_file(&mut self, path: &str) {
        let mut found = false;
        for source in self
            .sources
            .iter_mut()
            .filter(|s| s.kind == SourceKind::LocalList)
        {
            source.location = path.to_string();
            found = true;
        }
        if !found {
            self.sources.insert(
                0,
                SourceSettings {
                    enrich: true,
                    ..SourceSettings::new(SourceKind::LocalList, path)
                },
            );
        }
    }
}
