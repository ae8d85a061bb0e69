//! Remote fetching of linked images
use crate::cell::ImageBlob;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use url::Url;

/// Timeout applied to a whole remote fetch
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Downloads the bytes behind a URL. Every failure is reported as `None`.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Option<ImageBlob>;
}

/// Checks if a link can be fetched over HTTP
pub fn is_fetchable_url(link: &str) -> bool {
    Url::parse(link)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// [`Fetcher`] backed by a blocking HTTP client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Option<ImageBlob> {
        if !is_fetchable_url(url) {
            tracing::debug!(url, "not an http(s) link, skipping fetch");
            return None;
        }

        let response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(url, %error, "failed to fetch linked image");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url, status = %response.status(), "HTTP error fetching linked image");
            return None;
        }

        let media_type = response.headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        match response.bytes() {
            Ok(bytes) => Some(ImageBlob { bytes: bytes.to_vec(), media_type }),
            Err(error) => {
                tracing::warn!(url, %error, "failed to read linked image body");
                None
            }
        }
    }
}
