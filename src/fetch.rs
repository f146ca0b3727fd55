use crate::config::CrawlConfig;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Narrow fetch seam: one URL in, page text out. Stage crawlers depend on
/// this trait so tests can substitute canned markup for the live site.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Backoff before retry attempt `attempt` (1-based), doubling each time.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Runs `do_fetch` up to `attempts` times, sleeping `delay` before every
/// try and backing off between failures. The last error wins.
pub(crate) async fn fetch_with_retry<F, Fut>(
    url: &str,
    attempts: u32,
    delay: Duration,
    backoff: Duration,
    mut do_fetch: F,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        debug!(url, attempt, "fetching");
        match do_fetch().await {
            Ok(text) => return Ok(text),
            Err(e) if attempt < attempts => {
                let wait = backoff_delay(backoff, attempt);
                warn!(url, attempt, error = %e, "fetch failed, retrying in {:?}", wait);
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// reqwest-backed fetcher with a per-request timeout, a politeness delay
/// before each request, and bounded retry with exponential backoff.
pub struct HttpFetcher {
    client: reqwest::Client,
    delay: Duration,
    attempts: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(crawl: &CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(crawl.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            delay: Duration::from_millis(crawl.delay_ms),
            attempts: crawl.retry_attempts.max(1),
            backoff: Duration::from_millis(crawl.retry_backoff_ms),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        fetch_with_retry(url, self.attempts, self.delay, self.backoff, || {
            self.fetch_once(url)
        })
        .await
    }
}
