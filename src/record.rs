//! The citation record produced by the extractor and consumed by the exporter.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static YEAR_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").ok());

/// A single search result from Google Scholar
///
/// Only `title` is guaranteed. Every other field is `None` (or empty, for
/// `authors`) when it could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Article title, never empty
    pub title: String,
    /// Author names in listing order
    pub authors: Vec<String>,
    /// Venue and year line, e.g. "Advances in neural information processing systems, 2017"
    pub venue_year: Option<String>,
    /// Text snippet from the article
    pub snippet: Option<String>,
    /// Direct URL to the article
    pub url: Option<String>,
    /// Number of citations
    pub cited_by: Option<u32>,
}

impl CitationRecord {
    /// Create a record with only a title.
    ///
    /// Returns `None` if the title is blank.
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title,
            authors: Vec::new(),
            venue_year: None,
            snippet: None,
            url: None,
            cited_by: None,
        })
    }

    /// Publication year, taken from the first 19xx/20xx token of the venue line.
    pub fn year(&self) -> Option<i32> {
        let venue = self.venue_year.as_deref()?;
        YEAR_REGEX.as_ref()?.find(venue)?.as_str().parse().ok()
    }
}
