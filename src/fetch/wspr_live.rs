//! HTTP client for the wspr.live downloader.

use crate::dataset::TIMESTAMP_FORMAT;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::fetch::SpotSource;
use crate::models::TimeWindow;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Path of the CSV downloader endpoint, relative to the base URL.
const DOWNLOADER_PATH: &str = "wspr_downloader.php";

/// Queries `wspr_downloader.php` for spots of one transmitter.
#[derive(Debug, Clone)]
pub struct WsprLiveClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl WsprLiveClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> AnalyticsResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wspr-analytics/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, DOWNLOADER_PATH)
    }

    /// Query parameters for a transmitter and window; any reporter matches.
    pub fn query_params(call_sign: &str, window: &TimeWindow) -> Vec<(&'static str, String)> {
        vec![
            ("start", window.start.format(TIMESTAMP_FORMAT).to_string()),
            ("end", window.end().format(TIMESTAMP_FORMAT).to_string()),
            ("tx_sign", call_sign.trim().to_ascii_uppercase()),
            ("rx_sign", "%".to_string()),
            ("format", "CSV".to_string()),
        ]
    }

    /// The full request URL, for logging and `--dry-run`.
    pub fn query_url(&self, call_sign: &str, window: &TimeWindow) -> AnalyticsResult<String> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoint(),
            Self::query_params(call_sign, window),
        )
        .map_err(|e| AnalyticsError::Configuration(format!("invalid base URL: {}", e)))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl SpotSource for WsprLiveClient {
    async fn fetch(&self, call_sign: &str, window: &TimeWindow) -> AnalyticsResult<String> {
        let url = self.query_url(call_sign, window)?;
        debug!("Query URL: {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                AnalyticsError::Retrieval(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                AnalyticsError::Retrieval(format!("request to {} failed: {}", self.base_url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Retrieval(format!(
                "wspr.live returned status {}: {}",
                status,
                body.trim()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalyticsError::Retrieval(format!("failed to read response: {}", e)))?;

        info!("Fetched {} bytes from wspr.live", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        let end = Utc.with_ymd_and_hms(2025, 8, 19, 12, 0, 0).unwrap();
        TimeWindow::ending_at(end, chrono::Duration::minutes(30)).unwrap()
    }

    #[test]
    fn test_query_params() {
        let params = WsprLiveClient::query_params(" 2e0ijc ", &window());
        assert_eq!(params[0], ("start", "2025-08-19 11:30:00".to_string()));
        assert_eq!(params[1], ("end", "2025-08-19 12:00:00".to_string()));
        assert_eq!(params[2], ("tx_sign", "2E0IJC".to_string()));
        assert_eq!(params[3], ("rx_sign", "%".to_string()));
        assert_eq!(params[4], ("format", "CSV".to_string()));
    }

    #[test]
    fn test_query_url_is_encoded() {
        let client = WsprLiveClient::new("http://wspr.live/", Duration::from_secs(5)).unwrap();
        let url = client.query_url("2E0IJC", &window()).unwrap();

        assert!(url.starts_with("http://wspr.live/wspr_downloader.php?"));
        assert!(url.contains("tx_sign=2E0IJC"));
        assert!(url.contains("rx_sign=%25"));
        assert!(url.contains("format=CSV"));
        assert!(url.contains("start=2025-08-19+11%3A30%3A00"));
    }

    #[test]
    fn test_invalid_base_url() {
        let client = WsprLiveClient::new("not a url", Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.query_url("2E0IJC", &window()),
            Err(AnalyticsError::Configuration(_))
        ));
    }
}
