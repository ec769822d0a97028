//! Rewrites backend-supplied asset links so they resolve outside the `/api`
//! prefix, even when the frontend origin differs from the backend's (reverse
//! proxies that only forward `/api`, separately hosted exports).

/// Scheme+host+port portion of the configured API base. Empty when the base
/// has no `http(s)` scheme (a bare path like `/api`).
pub fn backend_origin(base: &str) -> String {
    let Some(scheme_len) = scheme_prefix_len(base) else {
        return String::new();
    };
    let authority = &base[scheme_len..];
    let authority_end = authority.find('/').unwrap_or(authority.len());
    if authority_end == 0 {
        return String::new();
    }
    base[..scheme_len + authority_end].to_string()
}

/// Resolves a server-supplied URL fragment against the configured API base.
///
/// Absolute `http(s)` fragments pass through unchanged. Root-relative
/// fragments are prefixed with the backend origin. Anything else is treated
/// as relative to the API prefix: `origin + "/api/" + fragment`.
pub fn resolve_asset_url(base: &str, fragment: &str) -> String {
    if fragment.is_empty() {
        return fragment.to_string();
    }
    if scheme_prefix_len(fragment).is_some() {
        return fragment.to_string();
    }
    let origin = backend_origin(base);
    if fragment.starts_with('/') {
        return format!("{origin}{fragment}");
    }
    format!("{origin}/api/{fragment}")
}

fn scheme_prefix_len(value: &str) -> Option<usize> {
    // case-insensitive, ASCII-only prefixes; safe on multibyte input
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("https://") {
        Some("https://".len())
    } else if lower.starts_with("http://") {
        Some("http://".len())
    } else {
        None
    }
}
