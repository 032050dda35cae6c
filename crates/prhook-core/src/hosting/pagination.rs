//! `Link` header handling for paginated list endpoints.
//!
//! The hosting service advertises further pages with
//! `Link: <url>; rel="next", <url>; rel="last"`. Following `next` until it
//! disappears drains the collection.

/// Page size requested from every list endpoint.
pub const PER_PAGE: u32 = 100;

/// Extract the `rel="next"` target from a `Link` header value.
pub fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Append the first-page query to `url`.
pub fn first_page(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}per_page={PER_PAGE}&page=1")
}
