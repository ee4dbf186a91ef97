//! Visit simulator: one synthetic identity browsing a target site.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use super::fetch::PageFetcher;
use super::identity::FakeIdentity;
use super::links::extract_links;
use crate::config::EngineConfig;
use crate::error::VisitError;
use crate::random::{RandomSource, shuffle};

/// Outcome of one simulated visit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitReport {
    pub identity: FakeIdentity,
    /// Landing page plus every sub-page fetched successfully.
    pub pages_visited: usize,
    pub pages: Vec<String>,
    #[serde(rename = "durationMs", serialize_with = "as_millis")]
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Produces one visit against a target URL.
#[async_trait]
pub trait Visitor: Send + Sync {
    /// Only a failure to load the landing page is an error.
    async fn visit(&self, target_url: &str) -> Result<VisitReport, VisitError>;
}

/// Browses the landing page, then a random handful of same-origin sub-pages
/// with a jittered pause before each.
pub struct VisitSimulator {
    fetcher: Arc<dyn PageFetcher>,
    rng: Arc<dyn RandomSource>,
    page_delay_ms: (u64, u64),
    sub_pages: (usize, usize),
}

impl VisitSimulator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        rng: Arc<dyn RandomSource>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            fetcher,
            rng,
            page_delay_ms: config.page_delay_ms,
            sub_pages: config.sub_pages,
        }
    }

    /// Randomly choose the sub-pages to browse from `links`.
    fn choose_sub_pages(&self, mut links: Vec<Url>) -> Vec<Url> {
        let (min, max) = self.sub_pages;
        let wanted = self.rng.between(min as u64, max as u64) as usize;
        shuffle(self.rng.as_ref(), &mut links);
        links.truncate(wanted.min(links.len()));
        links
    }
}

#[async_trait]
impl Visitor for VisitSimulator {
    async fn visit(&self, target_url: &str) -> Result<VisitReport, VisitError> {
        let started = Instant::now();
        let identity = FakeIdentity::generate(self.rng.as_ref());

        let base = Url::parse(target_url).map_err(|e| VisitError::InvalidUrl {
            url: target_url.to_string(),
            reason: e.to_string(),
        })?;

        let html = self.fetcher.fetch(&base, None).await?;
        let mut pages = vec![target_url.to_string()];

        let selected = self.choose_sub_pages(extract_links(&html, &base));
        for link in selected {
            let (min, max) = self.page_delay_ms;
            tokio::time::sleep(Duration::from_millis(self.rng.between(min, max))).await;

            match self.fetcher.fetch(&link, Some(&base)).await {
                Ok(_) => pages.push(link.to_string()),
                Err(e) => debug!(url = %link, error = %e, "Sub-page visit failed"),
            }
        }

        Ok(VisitReport {
            identity,
            pages_visited: pages.len(),
            pages,
            duration: started.elapsed(),
            finished_at: Utc::now(),
        })
    }
}
