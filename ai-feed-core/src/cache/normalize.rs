//! URL normalization for cache keys.

/// Strip a single trailing `/`.
///
/// Nothing else is canonicalized: scheme, host, query and percent-encoding
/// are compared as written.
pub fn normalize_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_trailing_slash() {
        assert_eq!(normalize_url("https://a/x/"), "https://a/x");
    }

    #[test]
    fn test_leaves_other_urls_alone() {
        assert_eq!(normalize_url("https://a/x"), "https://a/x");
        assert_eq!(normalize_url("https://a/x?q=1"), "https://a/x?q=1");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_strips_only_one_slash() {
        assert_eq!(normalize_url("https://a/x//"), "https://a/x/");
    }

    #[test]
    fn test_idempotent_for_feed_urls() {
        for url in ["https://a/x/", "https://a/x", "https://example.com/"] {
            let once = normalize_url(url);
            assert_eq!(normalize_url(once), once);
        }
    }
}
