//! String utility functions for text processing

/// Iterate over the meaningful lines of a list body
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
///
/// # Arguments
///
/// * `body` - The raw text, any line ending
///
/// # Returns
///
/// An iterator over the trimmed content lines
pub fn content_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Remove every whitespace character from a string
///
/// `"Cloudflare Inc ."` becomes `"CloudflareInc."`.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Return `s` unless it is blank after trimming
pub fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
