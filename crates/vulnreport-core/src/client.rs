use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{ImageScanDetail, RuntimeResultsPage, ScanDetailResponse, ScanResult};

const RUNTIME_RESULTS_PATH: &str = "secure/vulnerability/v1beta1/runtime-results";
const RESULT_DETAIL_PATH: &str = "secure/vulnerability/v1beta1/results";

/// Pre-encoded filter restricting the list endpoint to workload assets.
/// Host results are out of scope for this report.
const WORKLOAD_FILTER: &str = "asset.type+%3D+'workload'";

/// Bounded back-off for rate-limited requests. A 429 carrying a
/// `Retry-After` header uses that delay instead of the computed one.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following attempt `attempt` (1-based):
    /// `base_delay * 2^(attempt-1)`, capped at `max_delay`, with
    /// multiplicative jitter.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let pow = 1u32
            .checked_shl(attempt.saturating_sub(1) as u32)
            .unwrap_or(u32::MAX);
        let raw = self.base_delay.saturating_mul(pow);
        apply_jitter(raw.min(self.max_delay), self.jitter_factor)
    }
}

fn apply_jitter(delay: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 {
        return delay;
    }
    let nanos = delay.as_nanos() as f64;
    let span = nanos * jitter_factor;
    let offset = (rand::thread_rng().gen::<f64>() * 2.0 - 1.0) * span;
    Duration::from_nanos((nanos + offset).max(0.0) as u64)
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.parse().ok()?;
    Some(Duration::from_secs(secs))
}

/// Accept a bare authority host (`secure.example.com`) or a full base URL.
/// An explicit scheme is honored so tests can target a local mock server.
fn normalize_base_url(authority: &str) -> String {
    let trimmed = authority.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Client for the vendor's Secure vulnerability API. Owns the bearer
/// token; every request made through it carries the auth header.
pub struct SecureClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl SecureClient {
    pub fn new(authority: &str, api_token: &str) -> Result<Self> {
        Self::with_retry_policy(authority, api_token, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        authority: &str,
        api_token: &str,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_token}"))
            .map_err(|_| Error::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(Error::BuildClient)?;

        Ok(Self {
            http,
            base_url: normalize_base_url(authority),
            retry,
        })
    }

    /// GET `url` and return the response body. Retries on 429 up to the
    /// policy bound; any other non-200 status fails immediately.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        for attempt in 1..=self.retry.max_attempts {
            debug!(url, attempt, "sending request");
            let response = self.http.get(url).send().await.map_err(|e| Error::Http {
                url: url.to_string(),
                source: e,
            })?;

            let status = response.status();
            debug!(url, status = status.as_u16(), "response received");

            if status == StatusCode::OK {
                return response.text().await.map_err(|e| Error::Http {
                    url: url.to_string(),
                    source: e,
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == self.retry.max_attempts {
                    break;
                }
                let delay = parse_retry_after(response.headers())
                    .unwrap_or_else(|| self.retry.backoff_delay(attempt));
                warn!(
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "API throttled the request, backing off before retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(Error::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }

        Err(Error::RetriesExhausted {
            attempts: self.retry.max_attempts,
            url: url.to_string(),
        })
    }

    /// Page through the runtime results list, following the `next` cursor
    /// until the last page, and accumulate every page's results.
    pub async fn fetch_runtime_results(&self) -> Result<Vec<ScanResult>> {
        let mut cursor = String::new();
        let mut results = Vec::new();
        let mut pages = 0usize;

        loop {
            let url = format!(
                "{}/{}?cursor={}&filter={}",
                self.base_url, RUNTIME_RESULTS_PATH, cursor, WORKLOAD_FILTER
            );
            let body = self.get_text(&url).await?;
            let page: RuntimeResultsPage =
                serde_json::from_str(&body).map_err(|e| Error::Decode { url, source: e })?;

            pages += 1;
            results.extend(page.data);

            match page.page.next {
                Some(next) => cursor = next,
                None => break,
            }
        }

        debug!(pages, total = results.len(), "finished paging runtime results");
        Ok(results)
    }

    /// Fetch the full scan document for each distinct result ID, keyed by
    /// ID. One request per ID at most; calls are sequential, in list order.
    pub async fn fetch_scan_details(
        &self,
        results: &[ScanResult],
    ) -> Result<HashMap<String, ImageScanDetail>> {
        let mut details: HashMap<String, ImageScanDetail> = HashMap::new();

        for result in results {
            if details.contains_key(&result.result_id) {
                continue;
            }
            let url = format!(
                "{}/{}/{}",
                self.base_url, RESULT_DETAIL_PATH, result.result_id
            );
            let body = self.get_text(&url).await?;
            let parsed: ScanDetailResponse =
                serde_json::from_str(&body).map_err(|e| Error::Decode { url, source: e })?;
            details.insert(result.result_id.clone(), parsed.result);
        }

        Ok(details)
    }
}
