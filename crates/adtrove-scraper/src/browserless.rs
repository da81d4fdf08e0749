//! [`PageSession`] backed by a Browserless `/function` endpoint.
//!
//! Browserless functions are stateless: every [`PageSession::extract`] call
//! loads the library page afresh and scrolls `scroll_depth` times before
//! collecting creatives. [`PageSession::load_more`] just deepens the scroll
//! for the next call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::json;

use crate::collector::PageSession;
use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;
use crate::types::{CreativeObservation, ExtractionResponse};

const EXTRACT_SCRIPT: &str = include_str!("extract_creatives.js");

const SCROLL_PAUSE_MS: u64 = 1_000;
const MIN_IMAGE_WIDTH: u32 = 100;
// Headroom over the page timeout for the scrolls and the Browserless round trip.
const REQUEST_SLACK_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct BrowserlessConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Ad library search page; the advertiser is appended as the `q` parameter.
    pub library_url: String,
    pub page_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl BrowserlessConfig {
    #[must_use]
    pub fn from_app_config(config: &adtrove_core::AppConfig) -> Self {
        Self {
            base_url: config.browserless_url.clone(),
            token: config.browserless_token.clone(),
            library_url: config.library_url.clone(),
            page_timeout_secs: config.page_timeout_secs,
            max_retries: config.scraper_max_retries,
            backoff_base_secs: config.scraper_retry_backoff_base_secs,
        }
    }
}

pub struct BrowserlessSession {
    client: Client,
    endpoint: Url,
    page_url: Url,
    page_timeout_secs: u64,
    max_retries: u32,
    backoff_base_secs: u64,
    scroll_depth: u32,
}

impl BrowserlessSession {
    /// Opens a session for one advertiser's library listing.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidEndpoint`] if either the Browserless
    /// base URL or the library URL does not parse, or
    /// [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &BrowserlessConfig, advertiser: &str) -> Result<Self, ScraperError> {
        let endpoint = Self::function_url(&config.base_url, config.token.as_deref())?;
        let page_url = Self::library_page_url(&config.library_url, advertiser)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(
                config.page_timeout_secs.saturating_add(REQUEST_SLACK_SECS),
            ))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            page_url,
            page_timeout_secs: config.page_timeout_secs,
            max_retries: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
            scroll_depth: 0,
        })
    }

    #[must_use]
    pub fn page_url(&self) -> &str {
        self.page_url.as_str()
    }

    #[must_use]
    pub fn scroll_depth(&self) -> u32 {
        self.scroll_depth
    }

    fn function_url(base_url: &str, token: Option<&str>) -> Result<Url, ScraperError> {
        let base = base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/function")).map_err(|e| {
            ScraperError::InvalidEndpoint {
                url: base_url.to_owned(),
                reason: e.to_string(),
            }
        })?;
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    fn library_page_url(library_url: &str, advertiser: &str) -> Result<Url, ScraperError> {
        let mut url = Url::parse(library_url).map_err(|e| ScraperError::InvalidEndpoint {
            url: library_url.to_owned(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("active_status", "all")
            .append_pair("ad_type", "all")
            .append_pair("country", "ALL")
            .append_pair("media_type", "all")
            .append_pair("search_type", "keyword_unordered")
            .append_pair("q", advertiser);
        Ok(url)
    }

    async fn run_function(&self) -> Result<ExtractionResponse, ScraperError> {
        let body = json!({
            "code": EXTRACT_SCRIPT,
            "context": {
                "url": self.page_url.as_str(),
                "scrolls": self.scroll_depth,
                "scrollPauseMs": SCROLL_PAUSE_MS,
                "timeoutMs": self.page_timeout_secs.saturating_mul(1000),
                "minImageWidth": MIN_IMAGE_WIDTH,
            }
        });

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let body = &body;
            async move {
                let response = self
                    .client
                    .post(self.endpoint.clone())
                    .json(body)
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        endpoint: self.endpoint.host_str().unwrap_or_default().to_owned(),
                        retry_after_secs,
                    });
                }

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: self.endpoint.path().to_owned(),
                        body,
                    });
                }

                let text = response.text().await?;
                serde_json::from_str::<ExtractionResponse>(&text).map_err(|e| {
                    ScraperError::Deserialize {
                        context: format!("browser function result for {}", self.page_url),
                        source: e,
                    }
                })
            }
        })
        .await
    }
}

#[async_trait]
impl PageSession for BrowserlessSession {
    async fn extract(&mut self) -> Result<Vec<CreativeObservation>, ScraperError> {
        let response = self.run_function().await?;
        tracing::debug!(
            scroll_depth = self.scroll_depth,
            creatives = response.creatives.len(),
            "browser function returned"
        );
        Ok(response.creatives)
    }

    async fn load_more(&mut self) -> Result<(), ScraperError> {
        self.scroll_depth = self.scroll_depth.saturating_add(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_url_appends_token() {
        let url = BrowserlessSession::function_url("http://browserless:3000/", Some("s3cret"))
            .expect("valid url");
        assert_eq!(url.as_str(), "http://browserless:3000/function?token=s3cret");
    }

    #[test]
    fn function_url_without_token_has_no_query() {
        let url = BrowserlessSession::function_url("http://browserless:3000", None)
            .expect("valid url");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn library_page_url_encodes_advertiser() {
        let url = BrowserlessSession::library_page_url(
            "https://www.facebook.com/ads/library/",
            "Acme & Sons",
        )
        .expect("valid url");
        assert!(url.as_str().contains("q=Acme+%26+Sons"), "{url}");
        assert!(url.as_str().contains("country=ALL"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = BrowserlessSession::function_url("not a url", None).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidEndpoint { .. }));
    }

    #[test]
    fn script_returns_json_payload() {
        assert!(EXTRACT_SCRIPT.contains("export default async function"));
        assert!(EXTRACT_SCRIPT.contains("application/json"));
    }
}
