/// Join a sanitized base URL and an endpoint path with exactly one slash.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base, trimmed)
}

/// Percent-encode a single path segment (user ids, realm names).
pub fn path_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}
