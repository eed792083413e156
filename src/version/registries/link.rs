//! RFC 5988 `Link` header handling for tag-list pagination

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, LINK};

/// Matches a link whose `rel` parameter is `next`, e.g.
///
/// ```text
/// </v2/nginx/tags/list?n=100&last=1.19>; type="application/json"; rel="next"
/// ```
///
/// The URL is supposed to be wrapped in angle brackets but quay.io omits them, and `rel`
/// values are not always quoted.
static NEXT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^ *<?([^;>]+)>? *(?:;[^;]*)*; *rel="?next(?:"|\s*(?:;|$))"#).unwrap()
});

/// Find the target of the `rel="next"` link, if any
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(split_links)
        .find_map(parse_next_link)
}

/// Extract the URL of a single link value when its relation is `next`
pub fn parse_next_link(link: &str) -> Option<String> {
    let captures = NEXT_LINK_RE.captures(link)?;
    let url = captures.get(1)?.as_str().trim();
    (!url.is_empty()).then(|| url.to_string())
}

/// Split a header carrying several comma-separated links.
///
/// Only commas followed by `<` separate links; bare URLs may contain commas themselves.
fn split_links(header: &str) -> Vec<&str> {
    let mut links = Vec::new();
    let mut start = 0;
    for (index, c) in header.char_indices() {
        if c == ',' && header[index + 1..].trim_start().starts_with('<') {
            links.push(&header[start..index]);
            start = index + 1;
        }
    }
    links.push(&header[start..]);
    links
}
