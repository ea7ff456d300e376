//! CSV and XLSX export of citation records.
//!
//! Both formats share one column layout. Files are written to a temporary
//! path in the destination directory and renamed into place, so a failed
//! export never leaves a partial file behind.

use crate::error::{Result, ScholarError};
use crate::record::CitationRecord;
use chrono::{DateTime, TimeZone};
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::info;

/// CSV/XLSX column order
pub const COLUMNS: &[&str] = &["title", "authors", "venue_year", "snippet", "url", "cited_by"];

/// Separator used to join author names into one cell
pub const AUTHOR_DELIMITER: &str = "; ";

/// Longest string an Excel cell accepts
const XLSX_MAX_CELL_CHARS: usize = 32_767;

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ScholarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            other => Err(ScholarError::Export(format!("unknown export format '{}'", other))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One export request
#[derive(Debug, Clone)]
pub struct ExportJob<'a> {
    pub records: &'a [CitationRecord],
    pub format: ExportFormat,
    pub destination: PathBuf,
}

impl<'a> ExportJob<'a> {
    pub fn new(records: &'a [CitationRecord], format: ExportFormat, destination: impl Into<PathBuf>) -> Self {
        Self {
            records,
            format,
            destination: destination.into(),
        }
    }
}

/// One record flattened into the export columns
struct Row<'a> {
    title: &'a str,
    authors: String,
    venue_year: &'a str,
    snippet: &'a str,
    url: &'a str,
    cited_by: Option<u32>,
}

impl<'a> From<&'a CitationRecord> for Row<'a> {
    fn from(record: &'a CitationRecord) -> Self {
        Self {
            title: &record.title,
            authors: join_authors(&record.authors),
            venue_year: record.venue_year.as_deref().unwrap_or(""),
            snippet: record.snippet.as_deref().unwrap_or(""),
            url: record.url.as_deref().unwrap_or(""),
            cited_by: record.cited_by,
        }
    }
}

impl Row<'_> {
    fn cells(&self) -> [String; 6] {
        [
            self.title.to_string(),
            self.authors.clone(),
            self.venue_year.to_string(),
            self.snippet.to_string(),
            self.url.to_string(),
            self.cited_by.map(|n| n.to_string()).unwrap_or_default(),
        ]
    }
}

/// Join author names into a single cell.
pub fn join_authors(authors: &[String]) -> String {
    authors.join(AUTHOR_DELIMITER)
}

/// Split an author cell produced by [`join_authors`].
pub fn split_authors(cell: &str) -> Vec<String> {
    cell.split(AUTHOR_DELIMITER.trim())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// File name for an export: `<timestamp>_<phrase>.<ext>`
pub fn default_file_name<Tz: TimeZone>(phrase: &str, format: ExportFormat, now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let safe_phrase: String = phrase
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let safe_phrase = if safe_phrase.is_empty() {
        "results".to_string()
    } else {
        safe_phrase
    };

    format!(
        "{}_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        safe_phrase,
        format.extension()
    )
}

/// Write the job's records to its destination.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns `Export` when there is nothing to export, the destination cannot
/// be written, or the format encoder fails.
pub fn export(job: &ExportJob<'_>) -> Result<PathBuf> {
    if job.records.is_empty() {
        return Err(ScholarError::Export("no results to export".to_string()));
    }

    let bytes = match job.format {
        ExportFormat::Csv => encode_csv(job.records)?,
        ExportFormat::Xlsx => encode_xlsx(job.records)?,
    };
    write_atomically(&job.destination, &bytes)?;

    info!(
        path = %job.destination.display(),
        format = %job.format,
        rows = job.records.len(),
        "Export complete"
    );
    Ok(job.destination.clone())
}

fn encode_csv(records: &[CitationRecord]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    wtr.write_record(COLUMNS)
        .map_err(|e| ScholarError::Export(format!("Failed to write CSV header: {}", e)))?;
    for record in records {
        wtr.write_record(Row::from(record).cells())
            .map_err(|e| ScholarError::Export(format!("Failed to write CSV record: {}", e)))?;
    }

    wtr.into_inner()
        .map_err(|e| ScholarError::Export(format!("Failed to flush CSV: {}", e)))
}

fn encode_xlsx(records: &[CitationRecord]) -> Result<Vec<u8>> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| ScholarError::Export(format!("XLSX error: {}", e));

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Results").map_err(xlsx_err)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, &header)
            .map_err(xlsx_err)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = u32::try_from(index + 1)
            .map_err(|_| ScholarError::Export("too many rows for XLSX".to_string()))?;
        let cells = Row::from(record);
        let text_cells = [
            cells.title,
            cells.authors.as_str(),
            cells.venue_year,
            cells.snippet,
            cells.url,
        ];
        for (col, value) in text_cells.iter().enumerate() {
            if !value.is_empty() {
                worksheet
                    .write_string(row, col as u16, xlsx_safe(value))
                    .map_err(xlsx_err)?;
            }
        }
        if let Some(count) = cells.cited_by {
            worksheet
                .write_number(row, 5, f64::from(count))
                .map_err(xlsx_err)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

/// Drop characters XML cannot carry and clamp to the Excel cell limit
fn xlsx_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .take(XLSX_MAX_CELL_CHARS)
        .collect()
}

fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| {
        ScholarError::Export(format!("Cannot create directory {}: {}", dir.display(), e))
    })?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| {
        ScholarError::Export(format!("Cannot write to {}: {}", dir.display(), e))
    })?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| ScholarError::Export(format!("Failed to write export: {}", e)))?;

    temp.persist(destination).map_err(|e| {
        ScholarError::Export(format!(
            "Cannot move export into {}: {}",
            destination.display(),
            e.error
        ))
    })?;
    Ok(())
}
