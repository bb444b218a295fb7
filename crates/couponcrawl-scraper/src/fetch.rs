//! Single-request HTTP fetching.
//!
//! The fetcher performs exactly one request per call and never sleeps; all
//! pacing, retry, and backoff decisions belong to the dispatcher. Every
//! request carries a fixed browser-like header set matching the target
//! locale, which is deliberately non-configurable.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use scraper::Html;

use crate::error::CrawlError;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";
const TARGET_ACCEPT_LANGUAGE: &str = "ro-RO,ro;q=0.9,en;q=0.6";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Body substrings that mark a Cloudflare-style interstitial rather than real
/// page content. A 200 response containing one of these is an unresolved
/// challenge, not a document.
const CHALLENGE_MARKERS: [&str; 4] = [
    "challenge-running",
    "/cdn-cgi/challenge-platform/",
    "cf-chl-",
    "just a moment...",
];

/// A fetched page: final URL after redirects, status, and raw body.
///
/// The body is kept as text; DOM parsing happens on demand in synchronous
/// helpers because `scraper::Html` is not `Send` and must never be held
/// across an await point.
#[derive(Debug, Clone)]
pub struct Document {
    /// URL the response actually came from, after any redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Document {
    /// Parses the body into a queryable DOM.
    #[must_use]
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// HTTP client wrapper used for every request the crawl makes.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a `Fetcher` with the fixed header set and configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64) -> Result<Self, CrawlError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(TARGET_ACCEPT_LANGUAGE),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    /// Performs one GET and returns the response as a [`Document`].
    ///
    /// # Errors
    ///
    /// - [`CrawlError::Timeout`] when the request exceeded the configured timeout.
    /// - [`CrawlError::HttpStatus`] on a non-2xx response.
    /// - [`CrawlError::Network`] on a connection-level failure.
    /// - [`CrawlError::Challenge`] on a 2xx response whose body is an anti-bot
    ///   interstitial rather than page content.
    pub async fn fetch(&self, url: &str) -> Result<Document, CrawlError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        if looks_like_challenge(&body) {
            return Err(CrawlError::Challenge { url: final_url });
        }

        Ok(Document {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }

    /// Performs one GET and parses the body as JSON. Used by the API reveal
    /// mode against the site's coupon endpoint.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Fetcher::fetch`], plus [`CrawlError::Deserialize`]
    /// when the body is not valid JSON.
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, CrawlError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;
        serde_json::from_str(&body).map_err(|e| CrawlError::Deserialize {
            context: format!("coupon API response from {url}"),
            source: e,
        })
    }
}

fn classify_reqwest_error(url: &str, err: reqwest::Error) -> CrawlError {
    if err.is_timeout() {
        CrawlError::Timeout {
            url: url.to_owned(),
        }
    } else {
        CrawlError::Network {
            url: url.to_owned(),
            source: err,
        }
    }
}

/// Whether a response body is a known anti-bot interstitial.
fn looks_like_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    CHALLENGE_MARKERS.iter().any(|m| lowered.contains(m))
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;
