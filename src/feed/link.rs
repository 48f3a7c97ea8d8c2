//! `Link` header pagination

use reqwest::header::{HeaderMap, LINK};
use url::Url;

/// Target of the `rel="next"` link, exactly as written (may be relative)
pub fn next_link(link_header: &str) -> Option<&str> {
    link_header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target.strip_prefix('<')?.strip_suffix('>')
    })
}

/// Extract the `page` query parameter of the `rel="next"` link, if any
pub fn next_page(link_header: &str) -> Option<u32> {
    let url = Url::parse(next_link(link_header)?).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
}

fn link_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(LINK).and_then(|v| v.to_str().ok())
}

/// Next page number from a response's headers
pub fn next_page_from(headers: &HeaderMap) -> Option<u32> {
    link_header(headers).and_then(next_page)
}

/// Next link target from a response's headers
pub fn next_link_from(headers: &HeaderMap) -> Option<String> {
    link_header(headers)
        .and_then(next_link)
        .map(ToString::to_string)
}
