//! URL helpers for joining provider base URLs with endpoint paths.

/// Strip trailing slashes so endpoint joins never produce `//`.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a provider base URL with an endpoint path.
///
/// # Examples
///
/// ```
/// use parley::utils::url::endpoint_url;
///
/// assert_eq!(
///     endpoint_url("https://api.example.com/v1/", "chat/completions"),
///     "https://api.example.com/v1/chat/completions"
/// );
/// assert_eq!(
///     endpoint_url("http://127.0.0.1:11434", "/api/tags"),
///     "http://127.0.0.1:11434/api/tags"
/// );
/// ```
pub fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    let base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}
