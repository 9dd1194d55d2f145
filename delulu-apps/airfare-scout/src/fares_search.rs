//!  Delulu Airfare Scout
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Aggregator Fares Client
//!
//! Effectful (filesystem, browser) side of a search: obtains the rendered
//! markup for a query and hands it to the side-effect free parser.
//!
//! The result list is built client-side, so a plain HTTP fetch only returns
//! the page shell. Markup comes either from pages saved beforehand or, with
//! the `browser` feature, from a headless Chrome driven over DevTools.

use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

use anyhow::{Context, Result};

use crate::fares_query_builder::FareQuery;
use crate::fares_results_parser::FareSearchResult;
#[cfg(feature = "browser")]
use delulu_page_queues::PageQueue;

#[cfg(feature = "browser")]
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// DevTools websocket of an already running Chrome
    /// (`ws://127.0.0.1:9222/devtools/browser/<id>`). A local headless
    /// Chrome is launched per page when absent.
    pub devtools_url: Option<String>,
    /// How long to wait for the first flight card.
    pub wait_timeout: Duration,
    /// Extra time for the remaining cards to render once the first is there.
    pub render_settle: Duration,
}

#[cfg(feature = "browser")]
impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            devtools_url: None,
            wait_timeout: Duration::from_secs(20),
            render_settle: Duration::from_secs(5),
        }
    }
}

/// Where the raw markup for a query comes from.
#[derive(Debug, Clone)]
pub enum MarkupSource {
    /// One saved page, used for every query.
    File(PathBuf),
    /// Saved pages named after [`FareQuery::slug`]: `<ORIGIN>-<DEST>-<YYYYMMDD>.html`,
    /// with `-1` before the extension for round-trip pages.
    Directory(PathBuf),
    #[cfg(feature = "browser")]
    Browser(RenderConfig),
}

impl MarkupSource {
    pub fn page_path(dir: &std::path::Path, query: &FareQuery) -> PathBuf {
        dir.join(format!("{}.html", query.slug()))
    }
}

/// Why a page produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPageDiagnosis {
    /// Nothing came back at all.
    Blank,
    /// Only the loading shell rendered before the page was read.
    StillLoading,
    /// Cards are in the page but none could be assembled.
    CardsNotParsed,
    /// A rendered page without any flight card: no flights for the query.
    NoCards,
}

const LOADING_MARKERS: &[&str] = &["loading", "読み込み中", "検索中"];

pub fn diagnose_empty_page(html: &str) -> EmptyPageDiagnosis {
    if html.trim().is_empty() {
        EmptyPageDiagnosis::Blank
    } else if html.contains("flight-area") {
        EmptyPageDiagnosis::CardsNotParsed
    } else if LOADING_MARKERS.iter().any(|m| html.contains(m)) {
        EmptyPageDiagnosis::StillLoading
    } else {
        EmptyPageDiagnosis::NoCards
    }
}

#[derive(Debug, Clone)]
pub struct TourFaresClient {
    source: MarkupSource,
    #[cfg(feature = "browser")]
    page_queue: PageQueue,
}

impl TourFaresClient {
    pub fn new(source: MarkupSource) -> Self {
        Self {
            source,
            #[cfg(feature = "browser")]
            page_queue: PageQueue::with_concurrency_limit(1)
                .max_retries(2)
                .settle_delay(Duration::from_secs(1)),
        }
    }

    pub fn source(&self) -> &MarkupSource {
        &self.source
    }

    pub async fn fetch_raw(&self, query: &FareQuery) -> Result<String> {
        let fetch_start = std::time::Instant::now();
        let html = match &self.source {
            MarkupSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read saved page {}", path.display()))?,
            MarkupSource::Directory(dir) => {
                let path = MarkupSource::page_path(dir, query);
                tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read saved page {}", path.display()))?
            }
            #[cfg(feature = "browser")]
            MarkupSource::Browser(config) => {
                let url = query.search_url();
                self.page_queue
                    .with_retry(|| {
                        let url = url.clone();
                        let config = config.clone();
                        async move { headless::render_page(&config, &url).await }
                    })
                    .await
                    .with_context(|| format!("Failed to render {}", query.search_url()))?
            }
        };
        tracing::debug!(
            "[fetch_raw] {}: {} KB in {:?}",
            query,
            html.len() / 1024,
            fetch_start.elapsed()
        );
        Ok(html)
    }

    pub async fn search_fares(&self, query: &FareQuery) -> Result<FareSearchResult> {
        let overall_start = std::time::Instant::now();
        query.validate().context("Invalid search query")?;
        tracing::info!("🔗 {} : {}", query, query.search_url());

        let html = self.fetch_raw(query).await?;

        let parse_start = std::time::Instant::now();
        let result = FareSearchResult::from_html(&html, query.clone());
        tracing::debug!(
            "Parsed {} records in {:?}",
            result.len(),
            parse_start.elapsed()
        );

        if result.is_empty() {
            match diagnose_empty_page(&html) {
                EmptyPageDiagnosis::Blank => {
                    tracing::warn!("{}: empty page, the browser returned nothing", query)
                }
                EmptyPageDiagnosis::StillLoading => tracing::warn!(
                    "{}: page was read while results were still loading. Consider a longer wait.",
                    query
                ),
                EmptyPageDiagnosis::CardsNotParsed => tracing::warn!(
                    "{}: flight cards present but none matched the {:?} layout. Parser may need updating.",
                    query,
                    query.trip
                ),
                EmptyPageDiagnosis::NoCards => {
                    tracing::warn!("{}: no flights listed for this query", query)
                }
            }
        }

        tracing::info!(
            "{}: {} records in {:?}",
            query,
            result.len(),
            overall_start.elapsed()
        );
        Ok(result)
    }
}

#[cfg(feature = "browser")]
mod headless {
    use std::time::{Duration, Instant};

    use anyhow::{Result, anyhow};
    use chromiumoxide::Page;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;

    use super::RenderConfig;

    const CARD_SELECTOR: &str = "div.flight-area";
    const POLL_INTERVAL: Duration = Duration::from_millis(500);

    /// Loads `url` in Chrome and returns the rendered page source.
    ///
    /// A page whose first card never shows up within the wait is still
    /// returned: a partial page parses to fewer (or no) records.
    pub(super) async fn render_page(config: &RenderConfig, url: &str) -> Result<String> {
        let launched = config.devtools_url.is_none();
        let (mut browser, mut handler) = match &config.devtools_url {
            Some(ws) => Browser::connect(ws.clone()).await?,
            None => {
                let browser_config = BrowserConfig::builder()
                    .no_sandbox()
                    .arg("--disable-dev-shm-usage")
                    .build()
                    .map_err(|e| anyhow!("Browser config error: {}", e))?;
                Browser::launch(browser_config).await?
            }
        };
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let source = read_in_new_tab(&browser, config, url).await;

        // A Chrome we only connected to belongs to someone else.
        let closed = if launched {
            browser.close().await.map(drop)
        } else {
            Ok(())
        };
        handler_task.abort();
        let html = source?;
        closed?;
        Ok(html)
    }

    /// The tab is closed on every path once it is open.
    async fn read_in_new_tab(browser: &Browser, config: &RenderConfig, url: &str) -> Result<String> {
        let page = browser.new_page("about:blank").await?;
        let html = navigate_and_read(&page, config, url).await;
        match (page.close().await, &html) {
            (Ok(()), _) => {}
            (Err(e), Err(_)) => tracing::debug!("Failed to close tab after a failed render: {}", e),
            (Err(e), Ok(_)) => return Err(e.into()),
        }
        html
    }

    async fn navigate_and_read(page: &Page, config: &RenderConfig, url: &str) -> Result<String> {
        page.goto(url).await?;
        let deadline = Instant::now() + config.wait_timeout;
        loop {
            match page.find_element(CARD_SELECTOR).await {
                Ok(_) => {
                    tokio::time::sleep(config.render_settle).await;
                    break;
                }
                Err(_) if Instant::now() < deadline => tokio::time::sleep(POLL_INTERVAL).await,
                Err(e) => {
                    tracing::warn!(
                        "No flight card after {:?} ({}), reading partial page",
                        config.wait_timeout,
                        e
                    );
                    break;
                }
            }
        }
        Ok(page.content().await?)
    }
}
