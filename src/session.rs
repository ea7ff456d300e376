//! One search session: build → fetch → extract → append, then export.

use crate::config::Config;
use crate::error::Result;
use crate::exporter::{self, ExportFormat, ExportJob};
use crate::extractor::ResultExtractor;
use crate::fetcher::PageFetcher;
use crate::query::{QueryBuilder, SearchQuery};
use crate::store::ResultStore;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// Summary of a completed search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchReport {
    /// Pages the query asked for
    pub pages_requested: usize,
    /// Pages actually fetched before stopping
    pub pages_fetched: usize,
    /// Records now in the store
    pub records: usize,
}

/// Owns the pipeline components and the session's [`ResultStore`].
#[derive(Debug)]
pub struct SearchSession {
    builder: QueryBuilder,
    fetcher: PageFetcher,
    extractor: ResultExtractor,
    store: ResultStore,
    min_delay: Duration,
    max_delay: Duration,
}

impl SearchSession {
    pub fn new(builder: QueryBuilder, fetcher: PageFetcher, extractor: ResultExtractor) -> Self {
        Self {
            builder,
            fetcher,
            extractor,
            store: ResultStore::new(),
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Assemble a session from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let builder = config.query_builder();
        let fetcher = PageFetcher::new(&config.fetch_options())?;
        let extractor = ResultExtractor::with_base_url(builder.base_url())?;
        let (min_delay, max_delay) = config.delay_range();
        Ok(Self::new(builder, fetcher, extractor).with_delay(min_delay, max_delay))
    }

    /// Random pause between consecutive page requests.
    pub fn with_delay(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Run a search, replacing the stored results.
    ///
    /// The store is cleared only once the first page has been fetched, so a
    /// search that fails up front leaves the previous results in place.
    /// A later page failure stops the search; records from earlier pages are
    /// kept and the error is returned.
    pub async fn search(&mut self, query: &SearchQuery) -> Result<SearchReport> {
        let urls = self.builder.build(query)?;
        let limit = query.max_results as usize;

        info!(
            query = %query.phrase,
            url = %self.builder.base_url(),
            pages = urls.len(),
            "Starting Google Scholar query"
        );

        let mut report = SearchReport {
            pages_requested: urls.len(),
            ..Default::default()
        };

        for (index, url) in urls.iter().enumerate() {
            let page = index + 1;
            if index > 0 {
                self.pause().await;
            }

            let html = match self.fetcher.fetch(url).await {
                Ok(html) => html,
                Err(e) => {
                    error!(page, error = %e, "Failed to fetch page");
                    return Err(e);
                }
            };
            if index == 0 {
                self.store.clear();
            }
            report.pages_fetched += 1;

            let mut records = self.extractor.extract(&html);
            info!(page, count = records.len(), "Parsed results");
            if records.is_empty() {
                debug!(page, "No more results");
                break;
            }

            records.truncate(limit.saturating_sub(self.store.len()));
            self.store.append(records);
            if self.store.len() >= limit {
                break;
            }
        }

        report.records = self.store.len();
        info!(total = report.records, "Query complete");
        Ok(report)
    }

    /// Export the current results.
    pub fn export(&self, format: ExportFormat, destination: impl Into<PathBuf>) -> Result<PathBuf> {
        exporter::export(&ExportJob::new(self.store.snapshot(), format, destination))
    }

    /// Export into `directory` under a timestamped name derived from `phrase`.
    pub fn export_to_dir(&self, format: ExportFormat, directory: &Path, phrase: &str) -> Result<PathBuf> {
        let name = exporter::default_file_name(phrase, format, &chrono::Local::now());
        self.export(format, directory.join(name))
    }

    async fn pause(&self) {
        if self.max_delay.is_zero() {
            return;
        }
        let millis = rand::thread_rng()
            .gen_range(self.min_delay.as_millis()..=self.max_delay.as_millis());
        let delay = Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX));
        debug!(delay_ms = delay.as_millis() as u64, "Waiting before next page");
        tokio::time::sleep(delay).await;
    }
}
