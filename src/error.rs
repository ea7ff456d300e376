//! Error types for scholar-export.
//!
//! Every fallible library call returns `Result<T, ScholarError>`. The variants
//! follow the taxonomy the presentation layer reports to the user: each one
//! maps to an [`ErrorKind`] and carries a short, displayable message.

use thiserror::Error;

/// Coarse classification of a [`ScholarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad user input, fixable by the user
    InvalidQuery,
    /// Timeout or connection failure
    NetworkError,
    /// Non-2xx HTTP response
    HttpError,
    /// Google Scholar served a block page or CAPTCHA
    Blocked,
    /// Destination or format failure while exporting
    ExportError,
    /// Invalid configuration (config file, proxy, client setup)
    Config,
    /// Internal selector/pattern construction failure
    Parse,
}

/// Main error type for scholar-export operations.
#[derive(Debug, Error)]
pub enum ScholarError {
    /// The search query failed validation
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Network/transport failure, including timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("HTTP error: {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// Block page or CAPTCHA detected
    #[error("Blocked by Google Scholar: {0}")]
    Blocked(String),

    /// Export could not be completed
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Selector or regex construction error
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ScholarError {
    /// Classification used by callers to decide how to report the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::Http { .. } => ErrorKind::HttpError,
            Self::Blocked(_) => ErrorKind::Blocked,
            Self::Export(_) => ErrorKind::ExportError,
            Self::Config(_) => ErrorKind::Config,
            Self::Parse(_) => ErrorKind::Parse,
        }
    }

    /// The bare message, without the kind prefix. For HTTP errors this is the
    /// status code, e.g. `"429"`.
    pub fn message(&self) -> String {
        match self {
            Self::Http { status } => status.to_string(),
            Self::InvalidQuery(m)
            | Self::Network(m)
            | Self::Blocked(m)
            | Self::Export(m)
            | Self::Config(m)
            | Self::Parse(m) => m.clone(),
        }
    }

    /// User-facing guidance for the failure.
    pub fn hint(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidQuery => "Check the search keywords and options, then try again.",
            ErrorKind::NetworkError => "The request did not complete. Check your connection and retry.",
            ErrorKind::HttpError => "Google Scholar returned an error status. Wait a while before retrying.",
            ErrorKind::Blocked => {
                "Google Scholar is refusing automated requests. Increase the delay between pages or use a proxy."
            }
            ErrorKind::ExportError => "Check that the destination directory exists and is writable.",
            ErrorKind::Config => "Fix the configuration file or command-line options.",
            ErrorKind::Parse => "Internal parser setup failed.",
        }
    }
}

/// Result type alias using `ScholarError`
pub type Result<T> = std::result::Result<T, ScholarError>;
