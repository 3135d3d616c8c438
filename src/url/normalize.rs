use crate::UrlError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Matches the numeric identifier in a card detail path
static CARD_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/cards/(\d+)(?:[/?#]|$)").expect("card path regex is valid")
});

/// Normalizes a catalog URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but HTTP and HTTPS
/// 3. Remove fragment (everything after #)
/// 4. Remove trailing slash (except for root /)
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use dokkan_archive::url::normalize_url;
///
/// let url = normalize_url("https://dokkaninfo.com/cards/1001/#top").unwrap();
/// assert_eq!(url.as_str(), "https://dokkaninfo.com/cards/1001");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url)
}

/// Resolves an `href` found in a document against the document URL
///
/// Returns `None` for hrefs that do not resolve to an HTTP(S) URL
/// (`javascript:`, `mailto:`, malformed values).
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = base.join(href).ok()?;
    normalize_url(joined.as_str()).ok()
}

/// Extracts the card identifier from an href or URL
///
/// # Examples
///
/// ```
/// use dokkan_archive::url::card_id_from_href;
///
/// assert_eq!(card_id_from_href("/cards/1019281"), Some("1019281".to_string()));
/// assert_eq!(card_id_from_href("/cards?page=2"), None);
/// ```
pub fn card_id_from_href(href: &str) -> Option<String> {
    CARD_PATH
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
