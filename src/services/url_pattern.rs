//! URL-pattern canonicalization.
//!
//! Pages that differ only in query parameter values (pagination, item ids)
//! share one cache entry. A pattern is the URL path without a trailing
//! slash, plus the sorted query parameter names with every value replaced
//! by `*`:
//!
//! ```text
//! https://x/watch?v=abc123&t=42  ->  /watch?t=*&v=*
//! https://x/                     ->  /
//! ```

use std::collections::BTreeSet;

use url::Url;

/// Canonical pattern for `url`. Unparseable input is its own pattern.
pub fn to_pattern(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let mut path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    if path.is_empty() {
        path.push('/');
    }

    let keys: BTreeSet<&str> = parsed
        .query()
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .filter(|key| !key.is_empty())
        .collect();

    if keys.is_empty() {
        return path;
    }

    let query = keys
        .into_iter()
        .map(|key| format!("{key}=*"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

/// Site key for `url`: the host, with the port when it is not the
/// scheme default. Unparseable or host-less input is returned unchanged.
pub fn site_for(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => url.to_string(),
    }
}
