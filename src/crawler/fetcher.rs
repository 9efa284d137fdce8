//! HTTP fetcher with charset detection and optional bounded retry
//!
//! This module provides the HTTP plumbing shared by the page driver and the
//! API connector:
//! - User-Agent rotation (unless one is pinned in config)
//! - Browser-like request headers with an optional referer
//! - Charset detection from the Content-Type header or a `<meta>` tag
//! - Bounded retry with exponential backoff, off by default

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use rand::seq::SliceRandom;
use regex::bytes::Regex;
use reqwest::{
    header::{
        HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER,
        USER_AGENT,
    },
    Client, Response,
};
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry, RetryConfig};

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([a-zA-Z0-9_\-]+)"#).unwrap());

/// HTTP client wrapper used for HTML pages and JSON APIs
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    retry: RetryConfig,
    user_agent: Option<String>,
}

impl PageFetcher {
    /// Create a fetcher from the `[http]` config section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(http: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            retry: http.retry_config(),
            user_agent: http.user_agent.clone().filter(|ua| !ua.trim().is_empty()),
        })
    }

    /// Fetch an HTML document and decode it to a string
    pub async fn fetch_html(&self, url: &Url, referer: Option<&Url>) -> Result<String, FetchError> {
        with_retry(&self.retry, move || async move {
            let response = self
                .client
                .get(url.clone())
                .headers(self.build_headers(referer))
                .send()
                .await
                .map_err(map_send_error)?;

            let response = check_status(response)?;
            decode_response(response).await
        })
        .await
    }

    /// GET a JSON endpoint with query parameters
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        with_retry(&self.retry, move || async move {
            let response = self
                .client
                .get(url.clone())
                .query(query)
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, self.pick_user_agent())
                .send()
                .await
                .map_err(map_send_error)?;

            let response = check_status(response)?;
            let bytes = response.bytes().await?;
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
        })
        .await
    }

    /// Build browser-like request headers
    fn build_headers(&self, referer: Option<&Url>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&self.pick_user_agent()) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-GB,en;q=0.9,en-US;q=0.8"),
        );
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        if let Some(referer) = referer {
            if let Ok(value) = HeaderValue::from_str(referer.as_str()) {
                headers.insert(REFERER, value);
            }
        }

        headers
    }

    fn pick_user_agent(&self) -> String {
        if let Some(ua) = &self.user_agent {
            return ua.clone();
        }
        let mut rng = rand::thread_rng();
        USER_AGENTS
            .choose(&mut rng)
            .copied()
            .unwrap_or(USER_AGENTS[0])
            .to_string()
    }
}

fn map_send_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}

fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::ServerError(status.as_u16()))
    }
}

async fn decode_response(response: Response) -> Result<String, FetchError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();

    let bytes = response.bytes().await?;
    decode_bytes(&bytes, &content_type)
}

/// Decode a response body to UTF-8
///
/// Order of preference:
/// 1. `charset=` in the Content-Type header
/// 2. `<meta charset>` / `http-equiv` in the first 2 KiB
/// 3. strict UTF-8
/// 4. windows-1252, which accepts any byte sequence
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
    let declared = charset_from_content_type(content_type).or_else(|| charset_from_meta(bytes));

    if let Some(encoding) = declared {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok(text.into_owned());
        }
        debug!(charset = encoding.name(), "Declared charset did not decode cleanly");
    }

    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return Ok(text.into_owned());
    }

    let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
    if had_errors {
        return Err(FetchError::Decode(
            "Failed to decode content with declared charset, UTF-8 or windows-1252".to_string(),
        ));
    }
    Ok(text.into_owned())
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Encoding::for_label(value.trim().trim_matches('"').as_bytes())
        } else {
            None
        }
    })
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(2048)];
    let captures = META_CHARSET_REGEX.captures(head)?;
    Encoding::for_label(captures.get(1)?.as_bytes())
}
