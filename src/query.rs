//! Search URL construction for Google Scholar.
//!
//! [`QueryBuilder::build`] turns a [`SearchQuery`] into one result-page URL per
//! pagination offset. Building is pure: the same query always yields the same
//! URLs.

use crate::error::{Result, ScholarError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// Results per page Google Scholar serves when `num` is omitted
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size Google Scholar honours
pub const MAX_PAGE_SIZE: u32 = 20;

/// Google Scholar stops serving results past this offset
pub const MAX_RESULTS: u32 = 1000;

/// A single user search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Search phrase, sent verbatim as `q`
    pub phrase: String,
    /// Results from this year onwards (`as_ylo`)
    pub year_from: Option<i32>,
    /// Results up to this year (`as_yhi`)
    pub year_to: Option<i32>,
    /// Upper bound on records collected
    pub max_results: u32,
    /// Results requested per page
    pub page_size: u32,
}

impl SearchQuery {
    /// Query for `phrase` with default paging and no year filter.
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            year_from: None,
            year_to: None,
            max_results: DEFAULT_PAGE_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_years(mut self, year_from: Option<i32>, year_to: Option<i32>) -> Self {
        self.year_from = year_from;
        self.year_to = year_to;
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Check the query invariants.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for a blank phrase, an inverted year range,
    /// a result count outside `1..=1000`, or a page size outside `1..=20`.
    pub fn validate(&self) -> Result<()> {
        if self.phrase.trim().is_empty() {
            return Err(ScholarError::InvalidQuery(
                "search phrase is empty".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(ScholarError::InvalidQuery(format!(
                    "year range is inverted: {} > {}",
                    from, to
                )));
            }
        }
        if self.max_results == 0 {
            return Err(ScholarError::InvalidQuery(
                "max results must be greater than zero".to_string(),
            ));
        }
        if self.max_results > MAX_RESULTS {
            return Err(ScholarError::InvalidQuery(format!(
                "max results must be at most {}, got {}",
                MAX_RESULTS, self.max_results
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ScholarError::InvalidQuery(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }

    /// Number of result pages needed to reach `max_results`.
    pub fn page_count(&self) -> u32 {
        self.max_results.div_ceil(self.page_size.max(1))
    }
}

/// How multiple keywords are combined into one phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    /// Every quoted keyword must match
    #[default]
    And,
    /// Any quoted keyword may match
    Or,
    /// Keywords joined by spaces, unquoted
    Plain,
}

impl FromStr for BooleanOperator {
    type Err = ScholarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "plain" | "none" => Ok(Self::Plain),
            other => Err(ScholarError::InvalidQuery(format!(
                "unknown boolean operator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// Combine keywords into a Scholar search phrase.
///
/// `And`/`Or` quote each keyword so multi-word keywords match as phrases.
/// Blank keywords are skipped.
pub fn compose_phrase<S: AsRef<str>>(keywords: &[S], operator: BooleanOperator) -> String {
    let words = keywords
        .iter()
        .map(|k| k.as_ref().trim())
        .filter(|k| !k.is_empty());

    match operator {
        BooleanOperator::And => words
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(" AND "),
        BooleanOperator::Or => words
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(" OR "),
        BooleanOperator::Plain => words.collect::<Vec<_>>().join(" "),
    }
}

/// Builds result-page URLs for a query
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
    language: String,
    sdt: Option<String>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCHOLAR_URL.to_string(),
            language: "en".to_string(),
            sdt: None,
        }
    }
}

impl QueryBuilder {
    /// Builder targeting `base_url`, e.g. a mirror site.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Interface language (`hl`). English keeps "Cited by" labels stable.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Source data type filter (`as_sdt`), e.g. `"0,5"` for articles only.
    pub fn with_sdt(mut self, sdt: Option<String>) -> Self {
        self.sdt = sdt.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build one URL per pagination offset needed to satisfy `max_results`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the query fails validation, or `Config` if the
    /// base URL cannot be parsed.
    pub fn build(&self, query: &SearchQuery) -> Result<Vec<Url>> {
        query.validate()?;

        (0..query.page_count())
            .map(|page| self.page_url(query, page * query.page_size))
            .collect()
    }

    fn page_url(&self, query: &SearchQuery, start: u32) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/scholar", self.base_url))
            .map_err(|e| ScholarError::Config(format!("Invalid base URL: {}", e)))?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("q", query.phrase.trim());
            params.append_pair("hl", &self.language);
            params.append_pair("start", &start.to_string());
            if query.page_size != DEFAULT_PAGE_SIZE {
                params.append_pair("num", &query.page_size.to_string());
            }
            if let Some(year) = query.year_from {
                params.append_pair("as_ylo", &year.to_string());
            }
            if let Some(year) = query.year_to {
                params.append_pair("as_yhi", &year.to_string());
            }
            if let Some(sdt) = &self.sdt {
                params.append_pair("as_sdt", sdt);
            }
        }

        Ok(url)
    }
}
