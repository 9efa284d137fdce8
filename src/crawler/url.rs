//! URL resolution, canonicalization and search-template rendering
//!
//! [`normalize_url`] produces the canonical form used as a posting's identity
//! key, so two sightings of the same job that differ only in tracking
//! parameters, parameter order, fragment or a trailing slash collapse to one
//! record.

use url::form_urlencoded;
use url::Url;

use crate::utils::error::FetchError;

/// Query parameters that boards append for click tracking
const TRACKING_PARAMS: &[&str] = &[
    "trk",
    "refid",
    "trackingid",
    "position",
    "pagenum",
    "from",
    "vjk",
    "tk",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Resolve an `href` against a base URL
///
/// Fragment-only links and non-HTTP schemes (`mailto:`, `javascript:`,
/// `tel:`) resolve to `None`.
pub fn resolve_href(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Canonical form of a posting URL
///
/// Lowercases scheme and host, drops the fragment and tracking parameters,
/// sorts the remaining parameters and trims a trailing `/` from the path.
/// Returns `None` for anything that is not an absolute HTTP(S) URL.
///
/// ```
/// use jobharvest::crawler::url::normalize_url;
///
/// assert_eq!(
///     normalize_url("HTTPS://Jobs.Example.com/view/42/?b=2&utm_source=x&a=1#apply").as_deref(),
///     Some("https://jobs.example.com/view/42?a=1&b=2"),
/// );
/// ```
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();

    let mut out = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        out.push_str(&format!(":{port}"));
    }
    out.push_str(url.path().trim_end_matches('/'));

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if !params.is_empty() {
        params.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        out.push('?');
        out.push_str(&query);
    }

    Some(out)
}

/// Keep only the named query parameters of a posting URL
///
/// Boards such as Indeed mint fresh session tokens into every result link;
/// restricting the query to the parameters that name the posting keeps its
/// identity key stable across runs. An empty `keep` list, or a URL that does
/// not parse, leaves the input untouched.
///
/// ```
/// use jobharvest::crawler::url::retain_query_params;
///
/// let keep = vec!["jk".to_string()];
/// assert_eq!(
///     retain_query_params("https://uk.indeed.com/rc/clk?jk=abc&bb=x1&vjs=3", &keep),
///     "https://uk.indeed.com/rc/clk?jk=abc",
/// );
/// ```
pub fn retain_query_params(raw: &str, keep: &[String]) -> String {
    if keep.is_empty() {
        return raw.to_string();
    }
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| keep.iter().any(|k| k.eq_ignore_ascii_case(key)))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

/// Percent-encode a search term for a query string
pub fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.trim().as_bytes()).collect()
}

/// Fill `{keywords}` and `{location}` in a search URL template
pub fn render_search_url(template: &str, keywords: &str, location: &str) -> Result<Url, FetchError> {
    let rendered = template
        .replace("{keywords}", &encode_component(keywords))
        .replace("{location}", &encode_component(location));

    let url = Url::parse(&rendered).map_err(|e| FetchError::InvalidUrl(format!("{rendered}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(rendered));
    }
    Ok(url)
}

/// Parse an absolute HTTP(S) URL
pub fn parse_http_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(FetchError::InvalidUrl(raw.to_string())),
    }
}
