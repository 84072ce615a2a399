use std::time::Duration;

use reqwest::blocking::Client;

/// Default time allowed for the whole artifact download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("cmd-keeper-installer/", env!("CARGO_PKG_VERSION"));

/// Retrieves artifact bytes. A single attempt; callers decide about retries.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Blocking HTTP fetcher with a finite request timeout.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                format!("request timed out: {e}")
            } else {
                format!("request failed: {e}")
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("server returned {status}"));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| format!("failed to read response body: {e}"))?;
        log::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}
