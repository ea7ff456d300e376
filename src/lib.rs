//! # scholar-export
//!
//! Google Scholar search with CSV/XLSX citation export.
//!
//! ## Modules
//!
//! - [`query`] - Search URL construction and keyword composition
//! - [`fetcher`] - HTTP page fetching with proxy, timeout and block detection
//! - [`extractor`] - Result-page parsing into citation records
//! - [`store`] - In-memory result collection
//! - [`exporter`] - Atomic CSV/XLSX export
//! - [`session`] - The search pipeline tying the above together
//! - [`config`] - TOML configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholar_export::{config::Config, exporter::ExportFormat, query::SearchQuery, session::SearchSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = SearchSession::from_config(&Config::default())?;
//!     let query = SearchQuery::new("graph neural networks").with_max_results(20);
//!     let report = session.search(&query).await?;
//!     println!("Found {} results", report.records);
//!     session.export(ExportFormat::Csv, "results.csv")?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod fetcher;
pub mod query;
pub mod record;
pub mod session;
pub mod store;

pub use error::{ErrorKind, Result, ScholarError};
pub use record::CitationRecord;
