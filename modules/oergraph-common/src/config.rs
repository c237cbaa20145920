use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::error::OerGraphError;

const DEFAULT_CATALOG_URL: &str = "https://platform.x5gon.org/api/v1";

/// Crawler configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Catalog (X5GON)
    pub catalog_url: String,
    pub page_size: u32,
    pub start_offset: u64,

    // Knowledge base (Wikipedia)
    pub wikipedia_lang: String,
    pub wikipedia_api_url: String,

    // Filters
    pub target_language: String,
    pub min_description_chars: usize,
    pub min_concept_text_chars: usize,

    // Output
    pub data_dir: PathBuf,

    // HTTP behaviour
    pub enrich_concurrency: usize,
    pub http_timeout_secs: u64,
    pub fetch_max_attempts: u32,
    pub retry_base_ms: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            page_size: 20,
            start_offset: 0,
            wikipedia_lang: "en".to_string(),
            wikipedia_api_url: wikipedia_endpoint("en"),
            target_language: "en".to_string(),
            min_description_chars: 50,
            min_concept_text_chars: 50,
            data_dir: PathBuf::from("data"),
            enrich_concurrency: 4,
            http_timeout_secs: 30,
            fetch_max_attempts: 5,
            retry_base_ms: 500,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, OerGraphError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` is this with
    /// `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OerGraphError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let wikipedia_lang = lookup("WIKIPEDIA_LANG").unwrap_or(defaults.wikipedia_lang);
        let wikipedia_api_url =
            lookup("WIKIPEDIA_API_URL").unwrap_or_else(|| wikipedia_endpoint(&wikipedia_lang));

        let config = Self {
            catalog_url: lookup("X5GON_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.catalog_url),
            page_size: parsed(&lookup, "PAGE_SIZE", defaults.page_size)?,
            start_offset: parsed(&lookup, "START_OFFSET", defaults.start_offset)?,
            wikipedia_lang,
            wikipedia_api_url,
            target_language: lookup("TARGET_LANGUAGE").unwrap_or(defaults.target_language),
            min_description_chars: parsed(
                &lookup,
                "MIN_DESCRIPTION_CHARS",
                defaults.min_description_chars,
            )?,
            min_concept_text_chars: parsed(
                &lookup,
                "MIN_CONCEPT_TEXT_CHARS",
                defaults.min_concept_text_chars,
            )?,
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            enrich_concurrency: parsed(&lookup, "ENRICH_CONCURRENCY", defaults.enrich_concurrency)?,
            http_timeout_secs: parsed(&lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            fetch_max_attempts: parsed(&lookup, "FETCH_MAX_ATTEMPTS", defaults.fetch_max_attempts)?,
            retry_base_ms: parsed(&lookup, "RETRY_BASE_MS", defaults.retry_base_ms)?,
            user_agent: lookup("USER_AGENT").unwrap_or(defaults.user_agent),
        };

        if config.page_size == 0 {
            return Err(OerGraphError::Config("PAGE_SIZE must be at least 1".into()));
        }
        if config.enrich_concurrency == 0 {
            return Err(OerGraphError::Config(
                "ENRICH_CONCURRENCY must be at least 1".into(),
            ));
        }
        if config.fetch_max_attempts == 0 {
            return Err(OerGraphError::Config(
                "FETCH_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }

        Ok(config)
    }

    /// Log the effective settings.
    pub fn log_summary(&self) {
        info!(
            catalog_url = self.catalog_url.as_str(),
            page_size = self.page_size,
            start_offset = self.start_offset,
            wikipedia_api_url = self.wikipedia_api_url.as_str(),
            target_language = self.target_language.as_str(),
            data_dir = %self.data_dir.display(),
            enrich_concurrency = self.enrich_concurrency,
            http_timeout_secs = self.http_timeout_secs,
            fetch_max_attempts = self.fetch_max_attempts,
            "Config loaded"
        );
    }
}

fn wikipedia_endpoint(lang: &str) -> String {
    format!("https://{lang}.wikipedia.org/w/api.php")
}

fn default_user_agent() -> String {
    format!("oergraph-crawler/{}", env!("CARGO_PKG_VERSION"))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, OerGraphError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| OerGraphError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}
