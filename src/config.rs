use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_SITE_URL: &str = "https://epaperlive.timesofindia.com";
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://epaperlive.timesofindia.com/Search/Archives?AspxAutoDetectCookieSupport=1";
pub const DEFAULT_HIGHRES_ATTEMPTS: u32 = 3;

const APP_DIR_NAME: &str = "epaper-app";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub site_url: String,
    pub archive_url: String,
    pub cache_dir: PathBuf,
    /// Log to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    pub http: HttpConfig,
    pub defaults: SelectionDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Lower bound of the randomized pause before every image request.
    pub request_delay_min_ms: u64,
    pub request_delay_max_ms: u64,
    pub highres_attempts: u32,
    /// Also download low-res when high-res succeeded.
    pub always_fetch_lowres: bool,
}

/// Publication and edition used when the command line does not name one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectionDefaults {
    pub publication: Option<String>,
    pub edition: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_owned(),
            archive_url: DEFAULT_ARCHIVE_URL.to_owned(),
            cache_dir: home_dir().join(".cache").join(APP_DIR_NAME),
            log_file: None,
            http: HttpConfig::default(),
            defaults: SelectionDefaults::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("EPaperApp/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 60,
            request_delay_min_ms: 15_000,
            request_delay_max_ms: 30_000,
            highres_attempts: DEFAULT_HIGHRES_ATTEMPTS,
            always_fetch_lowres: false,
        }
    }
}

impl AppConfig {
    /// Loads `path` when given, otherwise the per-user config file if it exists,
    /// otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let user_config = default_config_path();
                if !user_config.exists() {
                    return Ok(Self::default());
                }
                user_config
            }
        };

        let yaml = std::fs::read_to_string(&path)
            .with_context(|| format!("read config: {}", path.display()))?;
        let config = Self::from_yaml(&yaml)
            .with_context(|| format!("parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).context("deserialize config yaml")?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        parse_http_url(&self.site_url).context("site_url")?;
        parse_http_url(&self.archive_url).context("archive_url")?;

        if self.http.request_delay_min_ms > self.http.request_delay_max_ms {
            anyhow::bail!(
                "http.request_delay_min_ms ({}) must not exceed http.request_delay_max_ms ({})",
                self.http.request_delay_min_ms,
                self.http.request_delay_max_ms
            );
        }
        if self.http.highres_attempts == 0 {
            anyhow::bail!("http.highres_attempts must be at least 1");
        }
        if self.cache_dir.as_os_str().is_empty() {
            anyhow::bail!("cache_dir must not be empty");
        }
        Ok(())
    }

    pub fn delay(&self) -> PolitenessDelay {
        PolitenessDelay::new(
            Duration::from_millis(self.http.request_delay_min_ms),
            Duration::from_millis(self.http.request_delay_max_ms),
        )
    }
}

/// Bounds of the randomized pause taken before every image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolitenessDelay {
    pub min: Duration,
    pub max: Duration,
}

impl PolitenessDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    home_dir()
        .join(".config")
        .join(APP_DIR_NAME)
        .join("config.yaml")
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_http_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("parse url: {raw}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("url must be http/https: {url}");
    }
    Ok(url)
}
