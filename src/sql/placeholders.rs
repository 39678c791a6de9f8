//! Symbolic `$name` placeholders: extraction and translation to router, OpenAPI, and PostgreSQL syntax.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Name of the placeholder filled with the authenticated caller's primary key.
pub const LOGGED_ID: &str = "loggedId";

/// Routes under the API prefix served by the registrar itself.
pub const SUMMARY_ROUTE: &str = "/_endpoints";
pub const OPENAPI_ROUTE: &str = "/_openapi.json";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([A-Za-z_]\w*)").expect("placeholder regex"))
}

fn trailing_placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.*\$[A-Za-z_]\w*/?$").expect("trailing placeholder regex"))
}

/// Placeholder names in order of appearance, sigil stripped, duplicates kept.
pub fn extract_params(text: &str) -> Vec<String> {
    placeholder_re()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// `/users/$id` -> `/users/:id`.
pub fn route_to_axum(route: &str) -> String {
    placeholder_re().replace_all(route, ":$1").into_owned()
}

/// `/users/$id` -> `/users/{id}`.
pub fn route_to_openapi(route: &str) -> String {
    placeholder_re().replace_all(route, "{$1}").into_owned()
}

/// Replace each placeholder occurrence with `$1`, `$2`, ... in order. The n-th marker matches the n-th entry of [`extract_params`].
pub fn query_to_positional(sql: &str) -> String {
    let mut n = 0usize;
    placeholder_re()
        .replace_all(sql, |_: &Captures| {
            n += 1;
            format!("${}", n)
        })
        .into_owned()
}

/// Whether a route ends with a placeholder (single-resource lookup), ignoring one trailing slash.
pub fn ends_with_placeholder(route: &str) -> bool {
    trailing_placeholder_re().is_match(route)
}

fn is_placeholder(segment: &str) -> bool {
    placeholder_re()
        .find(segment)
        .map(|m| m.start() == 0 && m.end() == segment.len())
        .unwrap_or(false)
}

/// Whether the router would refuse to hold both routes: at the first position where their
/// segments differ, both are placeholders under different names.
pub fn routes_conflict(a: &str, b: &str) -> bool {
    for (x, y) in a.split('/').zip(b.split('/')) {
        if x == y {
            continue;
        }
        return is_placeholder(x) && is_placeholder(y);
    }
    false
}

/// Route must be absolute, each placeholder must fill a whole path segment, and literal
/// segments must not use the router's own `:` and `*` syntax.
pub fn check_route_syntax(route: &str) -> Result<(), String> {
    if !route.starts_with('/') {
        return Err("route must start with '/'".into());
    }
    if route == SUMMARY_ROUTE || route == OPENAPI_ROUTE {
        return Err("route is reserved for the endpoint listing".into());
    }
    for segment in route.split('/') {
        if segment.contains('$') {
            if !is_placeholder(segment) {
                return Err(format!("segment '{}' must be exactly one $placeholder", segment));
            }
            continue;
        }
        if segment.contains(':') || segment.contains('*') {
            return Err(format!("segment '{}' may not contain ':' or '*'", segment));
        }
    }
    Ok(())
}
