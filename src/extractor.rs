//! Google Scholar result-page parsing.
//!
//! Each field of a result is located by its own function, so a markup change
//! that breaks one locator only blanks that field. The container lookup tries
//! several strategies in turn and falls back to the document structure
//! (every `h3` heading and its enclosing block) when none of them matches.

use crate::error::{Result, ScholarError};
use crate::query::DEFAULT_SCHOLAR_URL;
use crate::record::CitationRecord;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Container selectors, most specific first
const CONTAINER_SELECTORS: &[&str] = &["div.gs_r.gs_or.gs_scl", "div[data-cid]", "div.gs_ri"];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScholarError::Parse(format!("{}: {}", css, e)))
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ScholarError::Parse(e.to_string()))
}

/// Parses result pages into [`CitationRecord`]s.
#[derive(Debug)]
pub struct ResultExtractor {
    base_url: Url,
    containers: Vec<Selector>,
    heading: Selector,
    scholar_heading: Selector,
    heading_link: Selector,
    meta: Selector,
    snippet: Selector,
    footer_links: Selector,
    any_link: Selector,
    badge_regex: Regex,
    cite_regex: Regex,
}

impl ResultExtractor {
    /// Extractor resolving relative links against the public Scholar URL.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_SCHOLAR_URL)
    }

    /// Extractor resolving relative links against `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ScholarError::Config(format!("Invalid base URL: {}", e)))?;

        Ok(Self {
            base_url,
            containers: CONTAINER_SELECTORS
                .iter()
                .map(|css| selector(css))
                .collect::<Result<_>>()?,
            heading: selector("h3")?,
            scholar_heading: selector("h3.gs_rt, .gs_rt")?,
            heading_link: selector("h3 a[href], .gs_rt a[href]")?,
            meta: selector("div.gs_a, .gs_a")?,
            snippet: selector("div.gs_rs, .gs_rs")?,
            footer_links: selector("div.gs_fl a, .gs_flb a")?,
            any_link: selector("a")?,
            // Document-type badges written as plain text rather than a gs_ct* span
            badge_regex: regex(r"^(?:\[(?:PDF|HTML|BOOK|B|CITATION|C|DOC|PS)\]\s*)+")?,
            // English ("Cited by X") and Chinese ("被引用次数：X", "被引用 X 次") labels
            cite_regex: regex(r"(?:Cited by|被引用次数[:：]?|被引用)\s*(\d[\d,]*)")?,
        })
    }

    /// Extract every record with a title, in document order.
    pub fn extract(&self, html: &str) -> Vec<CitationRecord> {
        let document = Html::parse_document(html);
        let containers = self.locate_containers(&document);
        debug!(containers = containers.len(), "Located result containers");

        containers
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let record = self.extract_record(item);
                if record.is_none() {
                    debug!(index, "Dropping result without title");
                }
                record
            })
            .collect()
    }

    fn locate_containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for container in &self.containers {
            let found: Vec<ElementRef<'a>> = document.select(container).collect();
            if !found.is_empty() {
                return found;
            }
        }

        // Structural fallback: the nearest enclosing div of each heading, or
        // the heading alone when that div holds several headings.
        let mut found: Vec<ElementRef<'a>> = Vec::new();
        for heading in document.select(&self.heading) {
            let parent = heading
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "div");
            let Some(parent) = parent else { continue };
            if !self.looks_like_result(parent, heading) {
                debug!(heading = %element_text(heading), "Skipping heading without result fields");
                continue;
            }

            let block = if parent.select(&self.heading).count() > 1 {
                heading
            } else {
                parent
            };
            if !found.iter().any(|e| e.id() == block.id()) {
                found.push(block);
            }
        }
        found
    }

    /// A heading is a result when it links somewhere or its block carries an
    /// author line, a snippet, or a citation count.
    fn looks_like_result(&self, block: ElementRef<'_>, heading: ElementRef<'_>) -> bool {
        heading.select(&self.any_link).next().is_some()
            || block.select(&self.meta).next().is_some()
            || block.select(&self.snippet).next().is_some()
            || self.locate_cited_by(block).is_some()
    }

    fn extract_record(&self, item: ElementRef<'_>) -> Option<CitationRecord> {
        let mut record = CitationRecord::new(self.locate_title(item)?)?;

        record.url = self.locate_url(item);
        if let Some((authors, venue_year)) = self.locate_meta(item) {
            record.authors = authors;
            record.venue_year = venue_year;
        }
        record.snippet = self.locate_snippet(item);
        record.cited_by = self.locate_cited_by(item);

        Some(record)
    }

    fn locate_heading<'a>(&self, item: ElementRef<'a>) -> Option<ElementRef<'a>> {
        if item.value().name() == "h3" {
            return Some(item);
        }
        item.select(&self.scholar_heading)
            .next()
            .or_else(|| item.select(&self.heading).next())
    }

    fn locate_title(&self, item: ElementRef<'_>) -> Option<String> {
        let link_title = item
            .select(&self.heading_link)
            .next()
            .map(text_without_badges)
            .filter(|t| !t.is_empty());

        let title = match link_title {
            Some(title) => title,
            None => {
                let heading = text_without_badges(self.locate_heading(item)?);
                self.badge_regex.replace(&heading, "").trim().to_string()
            }
        };

        (!title.is_empty()).then_some(title)
    }

    fn locate_url(&self, item: ElementRef<'_>) -> Option<String> {
        let href = item
            .select(&self.heading_link)
            .find_map(|link| link.value().attr("href"))?
            .trim();

        if href.is_empty() || href.starts_with("javascript:") {
            return None;
        }
        self.base_url.join(href).ok().map(String::from)
    }

    /// Author list and venue/year from the "authors - venue, year - host" line
    fn locate_meta(&self, item: ElementRef<'_>) -> Option<(Vec<String>, Option<String>)> {
        let meta_text = element_text(item.select(&self.meta).next()?);
        if meta_text.is_empty() {
            return None;
        }

        let parts: Vec<&str> = meta_text.split(" - ").collect();
        let authors = parts
            .first()
            .map(|segment| split_author_line(segment))
            .unwrap_or_default();
        let venue_year = parts
            .get(1)
            .map(|segment| segment.trim().to_string())
            .filter(|segment| !segment.is_empty());

        Some((authors, venue_year))
    }

    fn locate_snippet(&self, item: ElementRef<'_>) -> Option<String> {
        item.select(&self.snippet)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty())
    }

    fn locate_cited_by(&self, item: ElementRef<'_>) -> Option<u32> {
        item.select(&self.footer_links)
            .chain(item.select(&self.any_link))
            .find_map(|link| self.parse_cited_by(&element_text(link)))
    }

    fn parse_cited_by(&self, text: &str) -> Option<u32> {
        let caps = self.cite_regex.captures(text)?;
        caps.get(1)?.as_str().replace(',', "").parse().ok()
    }
}

/// Element text with non-breaking spaces and runs of whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Element text leaving out `gs_ct*` badge spans ("[PDF]", "[CITATION]", ...)
fn text_without_badges(element: ElementRef<'_>) -> String {
    let text: String = element
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .filter_map(ElementRef::wrap)
                .any(is_badge)
        })
        .map(|(_, text)| &**text)
        .collect();
    collapse_whitespace(&text)
}

fn is_badge(element: ElementRef<'_>) -> bool {
    element.value().classes().any(|class| class.starts_with("gs_ct"))
}

fn collapse_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_author_line(line: &str) -> Vec<String> {
    line.split(',')
        .map(|name| name.trim().trim_end_matches('…').trim_end_matches("...").trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = include_str!("../tests/fixtures/scholar_page.html");

    fn extractor() -> ResultExtractor {
        ResultExtractor::new().expect("extractor setup failed")
    }

    fn container(i: usize) -> String {
        format!(
            r#"<div class="gs_r gs_or gs_scl" data-cid="c{i}">
                 <div class="gs_ri">
                   <h3 class="gs_rt"><a href="https://example.org/{i}">Paper {i}</a></h3>
                   <div class="gs_a">A Author{i}, B Author - Journal {i}, 2019 - example.org</div>
                   <div class="gs_rs">Snippet {i}</div>
                   <div class="gs_fl"><a href="/scholar?cites={i}">Cited by {i}</a></div>
                 </div>
               </div>"#
        )
    }

    #[test]
    fn test_parse_empty_html() {
        assert!(extractor().extract("<html><body></body></html>").is_empty());
    }

    #[test]
    fn test_n_containers_give_n_records_in_order() {
        for n in [1, 3, 10] {
            let body: String = (0..n).map(container).collect();
            let html = format!("<html><body>{}</body></html>", body);
            let records = extractor().extract(&html);

            assert_eq!(records.len(), n);
            for (i, record) in records.iter().enumerate() {
                assert_eq!(record.title, format!("Paper {}", i));
                assert_eq!(record.cited_by, Some(i as u32));
            }
        }
    }

    #[test]
    fn test_fixture_full_record() {
        let records = extractor().extract(PAGE);
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.title, "Graph neural networks: A review of methods and applications");
        assert_eq!(first.url.as_deref(), Some("https://arxiv.org/abs/1812.08434"));
        assert_eq!(
            first.authors,
            ["J Zhou", "G Cui", "S Hu", "Z Zhang", "C Yang", "Z Liu"]
        );
        assert_eq!(first.venue_year.as_deref(), Some("AI open, 2020"));
        assert_eq!(first.year(), Some(2020));
        assert_eq!(first.cited_by, Some(7321));
        assert!(first
            .snippet
            .as_deref()
            .is_some_and(|s| s.starts_with("Lots of learning tasks require dealing with graph data")));
    }

    #[test]
    fn test_missing_authors_keeps_record() {
        let records = extractor().extract(PAGE);
        let second = &records[1];

        assert_eq!(second.title, "The graph neural network model");
        assert!(second.authors.is_empty());
        assert_eq!(second.venue_year, None);
        assert_eq!(
            second.url.as_deref(),
            Some("https://scholar.google.com/scholar_url?url=https://ieeexplore.ieee.org/document/4700287")
        );
        assert!(second.snippet.is_some());
        assert_eq!(second.cited_by, Some(9876));
    }

    #[test]
    fn test_citation_only_entry() {
        let records = extractor().extract(PAGE);
        let third = &records[2];

        assert_eq!(third.title, "Semi-supervised classification with graph convolutional networks");
        assert_eq!(third.url, None);
        assert_eq!(third.authors, ["TN Kipf", "M Welling"]);
        assert_eq!(
            third.venue_year.as_deref(),
            Some("arXiv preprint arXiv:1609.02907, 2016")
        );
        assert_eq!(third.year(), Some(2016));
        assert_eq!(third.snippet, None);
        assert_eq!(third.cited_by, None);
    }

    #[test]
    fn test_structural_fallback_without_known_classes() {
        let html = r##"<html><body>
            <div class="result"><h3><a href="/paper/1">First paper</a></h3>
              <div class="gs_a">X Li - Some Venue, 2021</div></div>
            <div class="result"><h3>Second paper</h3>
              <a href="#">被引用次数：12</a></div>
            </body></html>"##;
        let records = extractor().extract(html);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "First paper");
        assert_eq!(records[0].url.as_deref(), Some("https://scholar.google.com/paper/1"));
        assert_eq!(records[0].authors, ["X Li"]);
        assert_eq!(records[1].title, "Second paper");
        assert_eq!(records[1].cited_by, Some(12));
    }

    #[test]
    fn test_bracketed_titles_are_kept() {
        let html = r#"<html><body>
            <div class="gs_r gs_or gs_scl" data-cid="p1"><div class="gs_ri">
              <h3 class="gs_rt"><span class="gs_ctg2">[HTML]</span> <a href="https://example.org/pet">[18F]FDG PET/CT in lymphoma staging</a></h3>
            </div></div>
            <div class="gs_r gs_or gs_scl" data-cid="p2"><div class="gs_ri">
              <h3 class="gs_rt"><span class="gs_ctu"><span class="gs_ct1">[BOOK]</span><span class="gs_ct2">[B]</span></span> [Review] Deep learning for graphs</h3>
            </div></div>
            <div class="gs_r gs_or gs_scl" data-cid="p3"><div class="gs_ri">
              <h3 class="gs_rt">[PDF] [CITATION] Plain text badges</h3>
            </div></div>
            </body></html>"#;
        let records = extractor().extract(html);

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "[18F]FDG PET/CT in lymphoma staging",
                "[Review] Deep learning for graphs",
                "Plain text badges",
            ]
        );
    }

    #[test]
    fn test_structural_fallback_skips_headings_without_result_fields() {
        let html = r#"<html><body>
            <div id="sidebar"><h3>Related searches</h3><p>graph theory</p></div>
            <div class="result"><h3><a href="/paper/1">Only paper</a></h3></div>
            </body></html>"#;
        let records = extractor().extract(html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Only paper");
    }

    #[test]
    fn test_structural_fallback_headings_in_one_block() {
        let html = r#"<html><body><div>
            <h3><a href="/paper/1">First</a></h3>
            <h3><a href="/paper/2">Second</a></h3>
            </div></body></html>"#;
        let records = extractor().extract(html);

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
        assert_eq!(records[1].url.as_deref(), Some("https://scholar.google.com/paper/2"));
    }

    #[test]
    fn test_parse_cited_by_labels() {
        let extractor = extractor();
        assert_eq!(extractor.parse_cited_by("Cited by 42"), Some(42));
        assert_eq!(extractor.parse_cited_by("Cited by 1,204"), Some(1204));
        assert_eq!(extractor.parse_cited_by("被引用 7 次"), Some(7));
        assert_eq!(extractor.parse_cited_by("Related articles"), None);
    }
}
