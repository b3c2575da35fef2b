//! Remote fetching with a bounded timeout and retry on transient failures.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use thiserror::Error;

use crate::debug;

/// Base delay between retries; doubled after each attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// A failed fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// The remote answered 404: nothing is published at that URL.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }
}

/// Byte-for-byte download of a URL.
///
/// Implementations must bound every call in time; a hung remote must surface
/// as an error rather than block the run.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP fetcher backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
}

impl HttpFetcher {
    /// Create a fetcher whose every attempt is bounded by `timeout`.
    pub fn new(timeout: Duration, retries: u32) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, retries })
    }

    fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let transport = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                Err(err) if err.is_transient() && attempt < self.retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    debug!("fetch"; "{}, retrying in {:?}", err, delay);
                    thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let not_found = FetchError::Status {
            url: "u".into(),
            status: 404,
        };
        let unavailable = FetchError::Status {
            url: "u".into(),
            status: 503,
        };
        let timeout = FetchError::Timeout { url: "u".into() };

        assert!(!not_found.is_transient());
        assert!(not_found.is_not_found());
        assert!(unavailable.is_transient());
        assert!(!unavailable.is_not_found());
        assert!(timeout.is_transient());
        assert!(!timeout.is_not_found());
    }

    #[test]
    fn test_silent_host_times_out() {
        // Connections land in the backlog but nothing ever answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/state.json", listener.local_addr().unwrap());
        let fetcher = HttpFetcher::new(Duration::from_millis(200), 0).unwrap();

        let started = std::time::Instant::now();
        let err = fetcher.fetch(&url).unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }
}
