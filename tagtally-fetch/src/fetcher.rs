use crate::error::{FetchError, Result};
use crate::result::FetchOutcome;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

const USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 6.0; Windows NT 5.1; SV1)";

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::with_timeout(10)
    }

    /// The timeout bounds the whole transfer; redirects are followed up to
    /// five hops.
    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Issues a single GET. Only status 200 is a success; any other status
    /// or transport failure is an error.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        debug!("Fetching {}", url);

        let fetched_at = current_timestamp();
        let start = Instant::now();

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let duration_ms = start.elapsed().as_millis() as i64;

        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(FetchOutcome {
            url: url.to_string(),
            fetched_at,
            duration_ms,
            body,
        })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}
