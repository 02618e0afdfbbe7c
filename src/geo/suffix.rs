//! Last-resort location guess from the host's top-level domain.

const SUFFIX_REGIONS: &[(&str, &str)] = &[
    (".cn", "China"),
    (".hk", "Hong Kong"),
    (".tw", "Taiwan"),
    (".jp", "Japan"),
    (".kr", "Korea"),
    (".sg", "Singapore"),
    (".us", "United States"),
    (".uk", "United Kingdom"),
    (".de", "Germany"),
    (".fr", "France"),
];

/// Region for a known country-code suffix, else the host without its port.
pub fn fallback_label(host: &str) -> String {
    let bare = super::strip_port(host);
    let lower = bare.to_ascii_lowercase();
    SUFFIX_REGIONS
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
        .map(|(_, region)| region.to_string())
        .unwrap_or_else(|| bare.to_string())
}
