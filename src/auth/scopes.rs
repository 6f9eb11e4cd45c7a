/// The closed set of permission scopes known to the registry. Scope strings
/// outside this set are silently discarded during filtering.
pub const SCOPES: &[&str] = &[
    "project:read",
    "project:write",
    "version:read",
    "version:write",
    "user:read",
    "user:write",
];

pub fn is_valid_scope(scope: &str) -> bool {
    SCOPES.contains(&scope)
}

/// Intersect a space-delimited requested-scope string with the set a client
/// or token was actually granted. An omitted (or empty) request defaults to
/// the full granted set. Callers reject the request when the result is
/// empty.
pub fn filter_granted(requested: Option<&str>, allowed: &[String]) -> Vec<String> {
    match requested {
        None => allowed
            .iter()
            .filter(|s| is_valid_scope(s))
            .cloned()
            .collect(),
        Some(raw) if raw.trim().is_empty() => allowed
            .iter()
            .filter(|s| is_valid_scope(s))
            .cloned()
            .collect(),
        Some(raw) => {
            let mut granted = Vec::new();
            for scope in raw.split_whitespace() {
                if is_valid_scope(scope)
                    && allowed.iter().any(|a| a == scope)
                    && !granted.iter().any(|g| g == scope)
                {
                    granted.push(scope.to_string());
                }
            }
            granted
        }
    }
}
