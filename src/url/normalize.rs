use crate::UrlError;
use url::Url;

/// Schemes a link may carry and still be crawled
const CRAWLABLE_SCHEMES: &[&str] = &["http", "https"];

/// Checks that a candidate link is syntactically fit for the frontier
///
/// # Accepted forms
///
/// - Absolute `http://` and `https://` URLs with a host
/// - Protocol-relative references (`//host/path`)
/// - Absolute-path references (`/path`)
///
/// # Rejected forms
///
/// - Empty or whitespace-only links
/// - Fragment-only links (`#section`)
/// - Any other scheme (`mailto:`, `javascript:`, `file:`, `data:`, `tel:`, ...)
/// - http(s) URLs without a host, and bare relative references
///
/// # Examples
///
/// ```
/// use loopcrawl::url::check_link_format;
///
/// assert!(check_link_format("https://example.com/page").is_ok());
/// assert!(check_link_format("/docs").is_ok());
/// assert!(check_link_format("mailto:someone@example.com").is_err());
/// ```
pub fn check_link_format(link: &str) -> Result<(), UrlError> {
    let link = link.trim();
    let invalid = || UrlError::InvalidFormat(link.to_string());

    if link.is_empty() || link.starts_with('#') {
        return Err(invalid());
    }

    // Protocol-relative and absolute-path references carry no scheme of their own
    if link.starts_with('/') {
        return Ok(());
    }

    match Url::parse(link) {
        Ok(url) => {
            if !CRAWLABLE_SCHEMES.contains(&url.scheme()) {
                return Err(invalid());
            }
            match url.host_str() {
                Some(host) if !host.is_empty() => Ok(()),
                _ => Err(invalid()),
            }
        }
        Err(_) => Err(invalid()),
    }
}

/// Normalizes a link for identity comparison
///
/// Only a single trailing slash is stripped; a lone `/` is kept as-is. Query
/// parameter order and host case are left untouched.
///
/// # Examples
///
/// ```
/// use loopcrawl::url::normalize_link;
///
/// assert_eq!(normalize_link("https://example.com/"), "https://example.com");
/// assert_eq!(normalize_link("https://example.com//"), "https://example.com/");
/// assert_eq!(normalize_link("/"), "/");
/// ```
pub fn normalize_link(link: &str) -> &str {
    let link = link.trim();
    if link.len() > 1 {
        link.strip_suffix('/').unwrap_or(link)
    } else {
        link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(check_link_format("http://example.com").is_ok());
        assert!(check_link_format("https://example.com/a/b?c=d").is_ok());
    }

    #[test]
    fn test_accepts_relative_forms() {
        assert!(check_link_format("/pages/1?number=2").is_ok());
        assert!(check_link_format("//cdn.example.com/lib").is_ok());
    }

    #[test]
    fn test_rejects_disallowed_schemes() {
        for link in [
            "file:///etc/passwd",
            "javascript:void(0)",
            "mailto:test@example.com",
            "data:text/html,<h1>x</h1>",
            "tel:+1234567890",
            "ftp://example.com/file",
        ] {
            assert!(
                matches!(check_link_format(link), Err(UrlError::InvalidFormat(_))),
                "{} should be rejected",
                link
            );
        }
    }

    #[test]
    fn test_rejects_empty_and_fragment() {
        assert!(check_link_format("").is_err());
        assert!(check_link_format("   ").is_err());
        assert!(check_link_format("#section").is_err());
        assert!(check_link_format("#").is_err());
    }

    #[test]
    fn test_rejects_bare_relative_and_garbage() {
        assert!(check_link_format("page.html").is_err());
        assert!(check_link_format("select * from db").is_err());
    }

    #[test]
    fn test_normalize_strips_single_trailing_slash() {
        assert_eq!(normalize_link("https://example.com/"), "https://example.com");
        assert_eq!(normalize_link("https://example.com/page/"), "https://example.com/page");
        assert_eq!(normalize_link("https://example.com/page"), "https://example.com/page");
    }

    #[test]
    fn test_normalize_keeps_lone_slash() {
        assert_eq!(normalize_link("/"), "/");
    }

    #[test]
    fn test_normalize_is_narrow() {
        // Host case and query order are part of the identity
        assert_eq!(normalize_link("https://EXAMPLE.com/?b=1&a=2"), "https://EXAMPLE.com/?b=1&a=2");
    }
}
