//! HTTP page fetching for Google Scholar.
//!
//! One call to [`PageFetcher::fetch`] is one GET request. Responses are
//! classified into success, HTTP failure, network failure, or a block page;
//! nothing is retried or cached here.

use crate::error::{Result, ScholarError};
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Raw HTML of one result page, or the reason it could not be fetched
pub type FetchResult = Result<String>;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser user agents rotated across requests
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Elements that only exist on Scholar's block / CAPTCHA pages
const CAPTCHA_SELECTOR: &str = "#gs_captcha_ccl, #gs_captcha_f, form#captcha-form, #recaptcha, .g-recaptcha";

/// Result blocks; a page holding any of these is a results page
const RESULT_SELECTOR: &str = "div.gs_r, div.gs_ri, div[data-cid]";

/// Block-page wording. Result snippets can quote it too, so it only counts
/// on pages without results.
const BLOCK_MARKERS: &[&str] = &[
    "Solving the above CAPTCHA",
    "unusual traffic",
    "not a robot",
    "sending automated queries",
];

/// Proxy settings for outbound requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Proxy URL without credentials, e.g. `http://127.0.0.1:7890`
    pub fn url(&self) -> String {
        if self.host.contains("://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    fn to_proxy(&self) -> Result<reqwest::Proxy> {
        let proxy_url = self.url();
        let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
            ScholarError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;

        Ok(match &self.username {
            Some(username) => proxy.basic_auth(username, self.password.as_deref().unwrap_or("")),
            None => proxy,
        })
    }
}

/// Settings for building a [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub proxy: Option<ProxyConfig>,
    pub timeout: Duration,
    /// Pool of user agents; one is picked at random per request
    pub user_agents: Vec<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}

/// Issues GET requests for result pages.
///
/// The underlying client keeps a cookie jar, so consecutive pages of one
/// search share the session cookies Scholar hands out.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    user_agents: Vec<String>,
    blocks: BlockDetector,
}

impl PageFetcher {
    /// Build a fetcher with optional proxy and bounded timeout.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the proxy URL is invalid or the client cannot be built.
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .cookie_store(true);

        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(proxy.to_proxy()?);
        }

        let client = builder
            .build()
            .map_err(|e| ScholarError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut user_agents = options.user_agents.clone();
        if user_agents.is_empty() {
            user_agents.push(DEFAULT_USER_AGENTS[0].to_string());
        }

        Ok(Self {
            client,
            user_agents,
            blocks: BlockDetector::new()?,
        })
    }

    fn user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    /// Fetch one result page.
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, self.user_agent())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Non-success status");
            return Err(ScholarError::Http {
                status: status.as_u16(),
            });
        }

        if response.url().path().starts_with("/sorry") {
            warn!(url = %url, "Redirected to block page");
            return Err(ScholarError::Blocked(format!(
                "redirected to {}",
                response.url()
            )));
        }

        let body = response.text().await.map_err(network_error)?;

        if let Some(marker) = self.blocks.detect(&body) {
            warn!(url = %url, marker, "CAPTCHA detected");
            return Err(ScholarError::Blocked(format!(
                "block page detected ({})",
                marker
            )));
        }

        Ok(body)
    }
}

/// Recognises block / CAPTCHA pages served with a 2xx status.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    captcha: Selector,
    results: Selector,
}

impl BlockDetector {
    pub fn new() -> Result<Self> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| ScholarError::Parse(format!("{}: {}", css, e)))
        };
        Ok(Self {
            captcha: parse(CAPTCHA_SELECTOR)?,
            results: parse(RESULT_SELECTOR)?,
        })
    }

    /// Why `body` looks like a block page, or `None` for a normal page.
    pub fn detect(&self, body: &str) -> Option<&'static str> {
        let document = Html::parse_document(body);
        if document.select(&self.captcha).next().is_some() {
            return Some("captcha form");
        }
        if document.select(&self.results).next().is_some() {
            return None;
        }
        BLOCK_MARKERS.iter().copied().find(|marker| body.contains(marker))
    }
}

fn network_error(e: reqwest::Error) -> ScholarError {
    if e.is_timeout() {
        ScholarError::Network(format!("request timed out: {}", e))
    } else if e.is_connect() {
        ScholarError::Network(format!("connection failed: {}", e))
    } else {
        ScholarError::Network(e.to_string())
    }
}
