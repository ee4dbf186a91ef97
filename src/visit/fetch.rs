//! Page fetching: the network capability behind a visit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::redirect::Policy;

use crate::config::EngineConfig;
use crate::error::{self, VisitError};
use crate::random::{RandomSource, pick};

/// Desktop browser identification strings rotated per request.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Fetches a page and returns its body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`. `referer` is set for sub-page requests made from a
    /// landing page, and absent for the landing page itself.
    async fn fetch(&self, url: &Url, referer: Option<&Url>) -> Result<String, VisitError>;
}

/// reqwest-backed fetcher with a bounded timeout and redirect cap.
///
/// `Accept-Encoding` is left to reqwest so compressed bodies are decoded.
pub struct HttpFetcher {
    client: reqwest::Client,
    rng: Arc<dyn RandomSource>,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &EngineConfig, rng: Arc<dyn RandomSource>) -> error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            rng,
            timeout: config.request_timeout,
        })
    }

    fn user_agent(&self) -> &'static str {
        *pick(self.rng.as_ref(), &USER_AGENTS)
    }

    fn map_error(&self, url: &Url, e: reqwest::Error) -> VisitError {
        if e.is_timeout() {
            VisitError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            VisitError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, referer: Option<&Url>) -> Result<String, VisitError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.user_agent())
            .header(ACCEPT, ACCEPT_HTML);

        request = match referer {
            Some(referer) => request.header(REFERER, referer.as_str()),
            None => request
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
                .header(CONNECTION, "keep-alive")
                .header(UPGRADE_INSECURE_REQUESTS, "1"),
        };

        let response = request.send().await.map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VisitError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| VisitError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
