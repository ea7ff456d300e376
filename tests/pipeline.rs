//! End-to-end: mock Scholar server → session → CSV/XLSX files.

use mockito::Matcher;
use pretty_assertions::assert_eq;
use scholar_export::config::Config;
use scholar_export::exporter::{split_authors, ExportFormat, COLUMNS};
use scholar_export::query::SearchQuery;
use scholar_export::session::SearchSession;
use scholar_export::ErrorKind;
use std::io::Read;

const PAGE: &str = include_str!("fixtures/scholar_page.html");
const BLOCK_PAGE: &str = include_str!("fixtures/block_page.html");

fn config_for(server: &mockito::ServerGuard) -> Config {
    let mut config = Config::default();
    config.search.base_url = server.url();
    config.network.min_delay_ms = 0;
    config.network.max_delay_ms = 0;
    config.network.timeout_secs = 5;
    config
}

#[tokio::test]
async fn search_and_export_csv_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/scholar")
        .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(PAGE)
        .create_async()
        .await;

    let mut session = SearchSession::from_config(&config_for(&server)).expect("session setup failed");
    let report = session
        .search(&SearchQuery::new("graph neural networks").with_max_results(10))
        .await
        .expect("search failed");
    assert_eq!(report.records, 3);

    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = session
        .export(ExportFormat::Csv, dir.path().join("results.csv"))
        .expect("export failed");

    let mut reader = csv::Reader::from_path(&path).expect("reopen failed");
    let headers: Vec<String> = reader
        .headers()
        .expect("missing header")
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(headers, COLUMNS);

    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("bad csv");
    assert_eq!(rows.len(), session.store().len());

    for (record, row) in session.store().snapshot().iter().zip(&rows) {
        assert_eq!(&row[0], record.title);
        assert_eq!(split_authors(&row[1]), record.authors);
        assert_eq!(&row[2], record.venue_year.as_deref().unwrap_or(""));
        assert_eq!(&row[4], record.url.as_deref().unwrap_or(""));
        assert_eq!(row[5].parse::<u32>().ok(), record.cited_by);
    }
}

#[tokio::test]
async fn search_and_export_xlsx_to_directory() {
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/scholar")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(PAGE)
        .create_async()
        .await;

    let mut session = SearchSession::from_config(&config_for(&server)).expect("session setup failed");
    session
        .search(&SearchQuery::new("graph").with_max_results(3))
        .await
        .expect("search failed");

    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = session
        .export_to_dir(ExportFormat::Xlsx, dir.path(), "graph")
        .expect("export failed");

    assert!(path.starts_with(dir.path()));
    assert!(path.to_string_lossy().ends_with("_graph.xlsx"));
    let file = std::fs::File::open(&path).expect("open failed");
    let mut archive = zip::ZipArchive::new(file).expect("not a zip archive");
    let mut strings = String::new();
    archive
        .by_name("xl/sharedStrings.xml")
        .expect("missing shared strings")
        .read_to_string(&mut strings)
        .expect("read failed");

    let header_end = strings
        .find(&format!("<t>{}</t>", COLUMNS[COLUMNS.len() - 1]))
        .expect("header missing");
    let first_title = strings
        .find(&format!("<t>{}</t>", session.store().snapshot()[0].title))
        .expect("title missing");
    assert!(header_end < first_title);
}

#[tokio::test]
async fn blocked_search_reports_blocked() {
    let mut server = mockito::Server::new_async().await;
    let _block = server
        .mock("GET", "/scholar")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(BLOCK_PAGE)
        .create_async()
        .await;

    let mut session = SearchSession::from_config(&config_for(&server)).expect("session setup failed");
    let err = session
        .search(&SearchQuery::new("graph"))
        .await
        .expect_err("block page accepted");

    assert_eq!(err.kind(), ErrorKind::Blocked);
    assert!(session.store().is_empty());

    let dir = tempfile::tempdir().expect("tempdir failed");
    let export_err = session
        .export(ExportFormat::Csv, dir.path().join("none.csv"))
        .expect_err("empty export accepted");
    assert_eq!(export_err.kind(), ErrorKind::ExportError);
}
