//! URL canonicalization and origin checks.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request URL against the page origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`/manifest.json`) against `origin`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// True when `url` shares scheme, host and port with `origin`.
pub fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:4000").unwrap()
    }

    #[test]
    fn test_canonicalize_relative_path() {
        let url = canonicalize("/manifest.json", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/manifest.json");
    }

    #[test]
    fn test_canonicalize_root() {
        let url = canonicalize("/", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/");
    }

    #[test]
    fn test_canonicalize_absolute_passthrough() {
        let url = canonicalize("https://cdn.example.com/lib.js", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/lib.js");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("http://LOCALHOST:4000/app.css", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("/docs#section", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/docs");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("/app.js?v=3&b=2", &origin()).unwrap();
        assert_eq!(url.query(), Some("v=3&b=2"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("", &origin()), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   ", &origin()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin() {
        let origin = origin();
        assert!(is_same_origin(&Url::parse("http://localhost:4000/a.css").unwrap(), &origin));
        assert!(!is_same_origin(&Url::parse("http://localhost:4001/a.css").unwrap(), &origin));
        assert!(!is_same_origin(&Url::parse("https://localhost:4000/a.css").unwrap(), &origin));
        assert!(!is_same_origin(&Url::parse("http://example.com/a.css").unwrap(), &origin));
    }
}
