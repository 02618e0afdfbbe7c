use std::collections::HashMap;
use std::io::Write;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{NamedTempFile, TempDir};

use subgen::error::GeoError;
use subgen::geo::{DnsResolver, GeoLookup, GeoRecord};
use subgen::interfaces::{generate, write_subscription, Collaborators};
use subgen::models::SourceKind;
use subgen::settings::SourceSettings;
use subgen::utils::base64::base64_decode;
use subgen::utils::http_std::{HttpClient, HttpResponse};
use subgen::utils::url::url_decode;
use subgen::{ConfigError, FetchError, GenerateError, Settings};

const TEMPLATE: &str = "vless://UID@host?path=%2F&host=example.com&sni=example.com";

const TABLE_PAGE: &str = r#"<table>
<tr><th>IP</th><th>a</th><th>b</th><th>c</th><th>ISP</th></tr>
<tr><td>104.16.0.1</td><td>0</td><td>0</td><td>0</td><td>China Telecom</td></tr>
<tr><td>104.16.0.2</td><td>0</td></tr>
<tr><td>104.16.0.3</td><td>0</td><td>0</td><td>0</td><td></td></tr>
</table>"#;

struct FakeHttp {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(
        &self,
        url: &str,
        _timeout: Duration,
        _headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(body) => Ok(HttpResponse {
                status: 200,
                body: body.clone(),
            }),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

struct FakeDns;

#[async_trait]
impl DnsResolver for FakeDns {
    async fn resolve(&self, host: &str) -> Result<IpAddr, GeoError> {
        match host {
            "a.example" => Ok("10.1.1.1".parse().unwrap()),
            _ => Err(GeoError::Dns(host.to_string())),
        }
    }
}

struct CountingGeo {
    calls: AtomicUsize,
}

#[async_trait]
impl GeoLookup for CountingGeo {
    async fn lookup(&self, _ip: IpAddr) -> Result<GeoRecord, GeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeoRecord {
            city: "Tokyo".to_string(),
            ..Default::default()
        })
    }
}

struct Fixture {
    _dir: TempDir,
    settings: Settings,
    http: Arc<FakeHttp>,
    geo: Arc<CountingGeo>,
    collaborators: Collaborators,
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn fixture(domains: &str, pages: &[(&str, &str)]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let template_path = write_file(&dir, "template.txt", TEMPLATE);
    let domains_path = write_file(&dir, "domains.txt", domains);

    let mut settings = Settings::default();
    settings.template_path = template_path;
    settings.output_path = dir.path().join("sub.txt").to_str().unwrap().to_string();
    settings.geo.enabled = false;
    settings.geo.min_delay_ms = 0;
    settings.sources = vec![
        SourceSettings::new(SourceKind::RemoteStructured, "http://src/structured"),
        SourceSettings::new(SourceKind::RemoteTable, "http://src/table"),
        SourceSettings::new(SourceKind::RemoteList, "http://src/list"),
        SourceSettings::new(SourceKind::LocalList, &domains_path),
    ];

    let geo = Arc::new(CountingGeo {
        calls: AtomicUsize::new(0),
    });
    let http = Arc::new(FakeHttp {
        pages: pages
            .iter()
            .map(|(url, body)| (url.to_string(), body.to_string()))
            .collect(),
        calls: AtomicUsize::new(0),
    });
    let collaborators = Collaborators {
        http: http.clone(),
        dns: Arc::new(FakeDns),
        geo: geo.clone(),
    };

    Fixture {
        _dir: dir,
        settings,
        http,
        geo,
        collaborators,
    }
}

/// Split a rendered URI into (scheme, credential, host, port, query pairs, fragment).
fn split_uri(uri: &str) -> (String, String, String, u16, HashMap<String, String>, String) {
    let url = url::Url::parse(uri).unwrap();
    let query = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    (
        url.scheme().to_string(),
        url.username().to_string(),
        url.host_str().unwrap().to_string(),
        url.port().unwrap(),
        query,
        url_decode(url.fragment().unwrap()),
    )
}

#[tokio::test]
async fn test_full_run_orders_and_round_trips() {
    let f = fixture(
        "# preferred domains\n\na.example\n",
        &[
            ("http://src/list", "1.1.1.1\n# noise\n\n2.2.2.2:2053\n"),
            ("http://src/table", TABLE_PAGE),
            ("http://src/structured", "1.2.3.4:8443#TestISP\nbroken\n5.6.7.8:443#\n"),
        ],
    );

    let sub = generate(&f.settings, &f.collaborators).await.unwrap();
    let decoded = base64_decode(&sub.payload, false);
    let lines: Vec<&str> = decoded.split('\n').collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines.len(), sub.nodes.len());

    let expected = [
        ("a.example", 443, "TLS-001-a.example"),
        ("1.1.1.1", 443, "TLS-002-1.1.1.1"),
        ("2.2.2.2", 2053, "TLS-003-2.2.2.2"),
        ("104.16.0.1", 443, "TLS-004-ChinaTelecom"),
        ("1.2.3.4", 8443, "TLS-005-TestISP"),
        ("5.6.7.8", 443, "TLS-006-5.6.7.8"),
    ];
    for (line, (host, port, name)) in lines.iter().zip(expected.iter()) {
        let (scheme, credential, parsed_host, parsed_port, query, fragment) = split_uri(line);
        assert_eq!(scheme, "vless");
        assert_eq!(credential, "UID");
        assert_eq!(parsed_host, *host);
        assert_eq!(parsed_port, *port);
        assert_eq!(fragment, *name);
        assert_eq!(query.get("security").map(String::as_str), Some("tls"));
        assert_eq!(query.get("sni").map(String::as_str), Some("example.com"));
        assert_eq!(query.get("type").map(String::as_str), Some("ws"));
        assert_eq!(query.get("path").map(String::as_str), Some("/"));
    }
}

#[tokio::test]
async fn test_malformed_list_entries_never_reach_output() {
    let mut f = fixture(
        "a.example:99999\nhost:abc\nuser@b.example\nc.example\n",
        &[(
            "http://src/list",
            "1.2.3.4:99999\nhttp://x.example/list\nok.example\n[2606:4700::1]:2053\n",
        )],
    );
    f.settings.sources.retain(|s| {
        s.kind == SourceKind::LocalList || s.kind == SourceKind::RemoteList
    });

    let sub = generate(&f.settings, &f.collaborators).await.unwrap();
    assert_eq!(sub.skipped, 0);

    let decoded = base64_decode(&sub.payload, false);
    let hosts: Vec<String> = decoded
        .split('\n')
        .map(|line| split_uri(line).2)
        .collect();
    assert_eq!(hosts, vec!["c.example", "ok.example", "[2606:4700::1]"]);
}

#[tokio::test]
async fn test_scenario_single_local_host() {
    let mut f = fixture("a.example\n", &[]);
    f.settings.sources.retain(|s| s.kind == SourceKind::LocalList);

    let sub = generate(&f.settings, &f.collaborators).await.unwrap();
    assert_eq!(sub.uris.len(), 1);
    let uri = &sub.uris[0];
    assert!(uri.starts_with("vless://UID@a.example:443?"));
    assert!(uri.contains("security=tls&sni=example.com"));
    assert_eq!(uri.rsplit('#').next(), Some("TLS-001-a.example"));
}

#[tokio::test]
async fn test_dual_protocol_policy() {
    let mut f = fixture("a.example\n", &[("http://src/list", "1.1.1.1\n")]);
    for source in f.settings.sources.iter_mut() {
        source.dual_protocol = source.kind == SourceKind::LocalList;
    }

    let sub = generate(&f.settings, &f.collaborators).await.unwrap();
    assert_eq!(sub.uris.len(), 3);

    let (_, _, _, port, query, fragment) = split_uri(&sub.uris[0]);
    assert_eq!(port, 443);
    assert_eq!(fragment, "TLS-001-a.example");
    assert!(query.contains_key("sni"));

    let (_, _, host, port, query, fragment) = split_uri(&sub.uris[1]);
    assert_eq!(host, "a.example");
    assert_eq!(port, 80);
    assert_eq!(fragment, "PLAIN-002-a.example");
    assert_eq!(query.get("security").map(String::as_str), Some("none"));
    assert!(!query.contains_key("sni"));
    assert!(!sub.uris[1].contains("sni="));

    let (_, _, host, _, _, fragment) = split_uri(&sub.uris[2]);
    assert_eq!(host, "1.1.1.1");
    assert_eq!(fragment, "TLS-003-1.1.1.1");
}

#[tokio::test]
async fn test_geo_enrichment_only_for_enabled_sources() {
    let mut f = fixture("a.example\na.example\nb.example.jp\n", &[("http://src/list", "1.1.1.1\n")]);
    f.settings.geo.enabled = true;
    for source in f.settings.sources.iter_mut() {
        source.enrich = source.kind == SourceKind::LocalList;
    }

    let sub = generate(&f.settings, &f.collaborators).await.unwrap();
    let labels: Vec<&str> = sub.nodes.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["Tokyo", "Tokyo", "Japan", "1.1.1.1"]);
    // a.example resolved once; b.example.jp fails DNS; the list source is not enriched
    assert_eq!(f.geo.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_enrich_limit() {
    let mut f = fixture("a.example\nc.example\n", &[]);
    f.settings.geo.enabled = true;
    for source in f.settings.sources.iter_mut() {
        source.enrich = true;
        source.enrich_limit = Some(1);
    }

    let sub = generate(&f.settings, &f.collaborators).await.unwrap();
    let labels: Vec<&str> = sub.nodes.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["Tokyo", "c.example"]);
}

#[tokio::test]
async fn test_all_sources_empty_is_no_content() {
    let f = fixture("# nothing here\n\n", &[("http://src/list", "\n# empty\n")]);

    let result = generate(&f.settings, &f.collaborators).await;
    assert!(matches!(result, Err(GenerateError::EmptyResult)));
    assert!(!std::path::Path::new(&f.settings.output_path).exists());
}

#[tokio::test]
async fn test_missing_local_file_does_not_abort() {
    let mut f = fixture("", &[("http://src/list", "9.9.9.9\n")]);
    for source in f.settings.sources.iter_mut() {
        if source.kind == SourceKind::LocalList {
            source.location = "/no/such/domains.txt".to_string();
        }
    }

    let sub = generate(&f.settings, &f.collaborators).await.unwrap();
    assert_eq!(sub.uris.len(), 1);
    assert!(sub.uris[0].contains("@9.9.9.9:443?"));
}

#[tokio::test]
async fn test_bad_template_aborts_before_fetch() {
    let mut f = fixture("a.example\n", &[]);
    let mut template = NamedTempFile::new().unwrap();
    write!(template, "vless://host-without-credential:443?sni=x").unwrap();
    f.settings.template_path = template.path().to_str().unwrap().to_string();

    let result = generate(&f.settings, &f.collaborators).await;
    assert!(matches!(
        result,
        Err(GenerateError::Config(ConfigError::MissingCredential))
    ));
    assert_eq!(f.http.calls.load(Ordering::SeqCst), 0);

    f.settings.template_path = "/no/such/template.txt".to_string();
    let result = generate(&f.settings, &f.collaborators).await;
    assert!(matches!(
        result,
        Err(GenerateError::Config(ConfigError::Read { .. }))
    ));
    assert_eq!(f.http.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_write_subscription() {
    let f = fixture("a.example\n", &[]);
    let sub = generate(&f.settings, &f.collaborators).await.unwrap();

    write_subscription(&f.settings.output_path, &sub.payload).unwrap();
    let written = std::fs::read_to_string(&f.settings.output_path).unwrap();
    assert_eq!(written, sub.payload);
    assert!(!written.contains('\n'));
}
