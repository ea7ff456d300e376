//! Configuration file support.
//!
//! Settings live in a TOML file; every field has a default so an empty or
//! missing file is valid. Command-line flags override file values.
//!
//! ```toml
//! [search]
//! base_url = "https://scholar.google.com"
//! language = "en"
//! page_size = 10
//! sdt = "0,5"
//!
//! [network]
//! timeout_secs = 30
//! min_delay_ms = 500
//! max_delay_ms = 2000
//!
//! [proxy]
//! host = "127.0.0.1"
//! port = 7890
//!
//! [output]
//! directory = "./output"
//! formats = ["csv", "xlsx"]
//! ```

use crate::error::{Result, ScholarError};
use crate::exporter::ExportFormat;
use crate::fetcher::{FetchOptions, ProxyConfig, DEFAULT_USER_AGENTS};
use crate::query::{QueryBuilder, DEFAULT_PAGE_SIZE, DEFAULT_SCHOLAR_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Query construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Source data type filter, e.g. "0,5" for articles only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdt: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            language: default_language(),
            page_size: default_page_size(),
            sdt: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_SCHOLAR_URL.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Request settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Lower bound of the random pause between pages
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            user_agents: default_user_agents(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_min_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    #[serde(default = "default_formats")]
    pub formats: Vec<ExportFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            formats: default_formats(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_formats() -> Vec<ExportFormat> {
    vec![ExportFormat::Csv]
}

impl Config {
    /// Default config location: `<config dir>/scholar-export/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("scholar-export").join("config.toml"))
            .ok_or_else(|| ScholarError::Config("Cannot determine config directory".to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScholarError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ScholarError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    ///
    /// An explicitly given path must exist.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Ok(default) if default.exists() => {
                debug!(path = %default.display(), "Loading config");
                Self::load(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Write configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ScholarError::Config(format!("Cannot serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ScholarError::Config(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| ScholarError::Config(format!("Cannot write {}: {}", path.display(), e)))
    }

    fn validate(&self) -> Result<()> {
        if self.network.min_delay_ms > self.network.max_delay_ms {
            return Err(ScholarError::Config(format!(
                "network.min_delay_ms ({}) exceeds network.max_delay_ms ({})",
                self.network.min_delay_ms, self.network.max_delay_ms
            )));
        }
        if self.network.timeout_secs == 0 {
            return Err(ScholarError::Config(
                "network.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(&self.search.base_url)
            .with_language(self.search.language.clone())
            .with_sdt(self.search.sdt.clone())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            proxy: self.proxy.clone(),
            timeout: Duration::from_secs(self.network.timeout_secs),
            user_agents: self.network.user_agents.clone(),
        }
    }

    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.network.min_delay_ms),
            Duration::from_millis(self.network.max_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").expect("empty config rejected");
        assert_eq!(config, Config::default());
        assert_eq!(config.search.base_url, DEFAULT_SCHOLAR_URL);
        assert_eq!(config.network.timeout_secs, 30);
        assert_eq!(config.output.formats, vec![ExportFormat::Csv]);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
[search]
page_size = 20
sdt = "0,5"

[network]
timeout_secs = 10

[proxy]
host = "127.0.0.1"
port = 7890
username = "me"
password = "secret"

[output]
directory = "/tmp/scholar"
formats = ["csv", "xlsx"]
"#,
        )
        .expect("config rejected");

        assert_eq!(config.search.page_size, 20);
        assert_eq!(config.search.language, "en");
        assert_eq!(config.network.timeout_secs, 10);
        assert_eq!(config.network.min_delay_ms, 500);
        let proxy = config.proxy.as_ref().expect("proxy missing");
        assert_eq!(proxy.port, 7890);
        assert_eq!(proxy.username.as_deref(), Some("me"));
        assert_eq!(config.output.directory, PathBuf::from("/tmp/scholar"));
        assert_eq!(config.output.formats, vec![ExportFormat::Csv, ExportFormat::Xlsx]);
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_toml("invalid = toml = content").is_err());
        assert!(Config::from_toml("[network]\nmin_delay_ms = 10\nmax_delay_ms = 5").is_err());
        assert!(Config::from_toml("[output]\nformats = [\"pdf\"]").is_err());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempdir().map_err(|e| ScholarError::Config(e.to_string()))?;
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.proxy = Some(ProxyConfig::new("proxy.local", 3128));
        config.network.max_delay_ms = 5000;
        config.save(&path)?;

        assert_eq!(Config::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_path() {
        assert!(Config::resolve(Some(Path::new("/nonexistent/config.toml"))).is_err());
    }
}
