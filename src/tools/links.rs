//! Safe rendering of course and lesson links.
//!
//! Links come from indexed course documents, so they are untrusted: only
//! absolute http(s) URLs with a host become anchors, and every label and
//! attribute value is HTML-escaped.

use url::Url;

/// Whether `candidate` is an http/https URL with a non-empty host.
pub fn is_safe_http_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Escape text for use in HTML content or a quoted attribute value.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render an anchor that opens in a new tab. Both arguments are escaped here.
pub fn anchor(href: &str, label: &str) -> String {
    format!(
        r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
        escape_html(href),
        escape_html(label)
    )
}

/// Render `label` as an anchor to `link` when the link is safe, otherwise as escaped text.
pub fn linked_label(label: &str, link: Option<&str>) -> String {
    match link {
        Some(href) if is_safe_http_url(href) => anchor(href, label),
        _ => escape_html(label),
    }
}
