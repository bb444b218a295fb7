//! Crawl configuration loaded from environment variables.
//!
//! Every tunable has a default, so a bare environment produces a working
//! config pointed at the production site with conservative pacing. Tests
//! construct [`CrawlConfig`] directly or drive [`build_crawl_config`] with a
//! `HashMap`-backed lookup instead of mutating process env vars.

use thiserror::Error;

/// Default site root when `COUPONCRAWL_BASE_URL` is unset.
const DEFAULT_BASE_URL: &str = "https://www.lovecoupons.ro";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Where the crawl starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedMode {
    /// Crawl every brand-index letter page (`a`..`z` plus `number` for 0-9)
    /// under `<base_url>/brands/`.
    AllBrandLetters,
    /// Crawl only the given brand-list page URLs.
    Explicit(Vec<String>),
}

/// Tunables for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Site root, used to build letter-page seeds and resolve relative links.
    pub base_url: String,
    pub seed_mode: SeedMode,
    /// Recorded for the scaled multi-worker variant; the serial dispatcher
    /// honors an effective concurrency of 1 regardless.
    pub max_concurrency: usize,
    /// Rate cap for the frontier drain. `0` disables pacing entirely
    /// (used by tests against a local mock server).
    pub requests_per_minute: u64,
    pub request_timeout_secs: u64,
    /// Additional fetch attempts after the first failure, per request.
    pub max_retries: u32,
    /// Base delay for exponential retry backoff: `backoff_base_ms * 2^attempt`.
    pub backoff_base_ms: u64,
    /// Flat re-enqueue delay after an anti-bot challenge page.
    pub challenge_backoff_ms: u64,
    /// Monotonic per-offer delay between coupon-page follow-ups of one brand.
    pub offer_stagger_ms: u64,
    pub log_level: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            seed_mode: SeedMode::AllBrandLetters,
            max_concurrency: 1,
            requests_per_minute: 12,
            request_timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 1000,
            challenge_backoff_ms: 20_000,
            offer_stagger_ms: 500,
            log_level: "info".to_owned(),
        }
    }
}

impl CrawlConfig {
    /// The URLs the frontier is seeded with, in crawl order.
    ///
    /// In [`SeedMode::AllBrandLetters`] this is the 27 letter index pages the
    /// site groups brands under, with `0-9` mapped to its `number` page.
    #[must_use]
    pub fn seed_urls(&self) -> Vec<String> {
        match &self.seed_mode {
            SeedMode::Explicit(urls) => urls.clone(),
            SeedMode::AllBrandLetters => {
                let base = self.base_url.trim_end_matches('/');
                let mut urls = vec![format!("{base}/brands/number")];
                urls.extend(('a'..='z').map(|letter| format!("{base}/brands/{letter}")));
                urls
            }
        }
    }
}

/// Load crawl configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns [`ConfigError`] if a set env var fails to parse.
pub fn load_crawl_config() -> Result<CrawlConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_crawl_config(|key| std::env::var(key))
}

/// Build crawl configuration using the provided env-var lookup function.
///
/// This is the parsing/validation logic decoupled from the actual
/// environment, so it can be tested with a pure `HashMap` lookup.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] if a set env var fails to parse.
pub fn build_crawl_config<F>(lookup: F) -> Result<CrawlConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let base_url = or_default("COUPONCRAWL_BASE_URL", DEFAULT_BASE_URL);

    // A set-but-empty seed list is treated as a config mistake rather than
    // silently falling back to the full-site crawl.
    let seed_mode = match lookup("COUPONCRAWL_SEED_URLS") {
        Ok(raw) => {
            let urls: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            if urls.is_empty() {
                return Err(ConfigError::InvalidEnvVar {
                    var: "COUPONCRAWL_SEED_URLS".to_owned(),
                    reason: "set but contains no URLs".to_owned(),
                });
            }
            SeedMode::Explicit(urls)
        }
        Err(_) => SeedMode::AllBrandLetters,
    };

    Ok(CrawlConfig {
        base_url,
        seed_mode,
        max_concurrency: parse_usize("COUPONCRAWL_MAX_CONCURRENCY", "1")?,
        requests_per_minute: parse_u64("COUPONCRAWL_REQUESTS_PER_MINUTE", "12")?,
        request_timeout_secs: parse_u64("COUPONCRAWL_REQUEST_TIMEOUT_SECS", "30")?,
        max_retries: parse_u32("COUPONCRAWL_MAX_RETRIES", "3")?,
        backoff_base_ms: parse_u64("COUPONCRAWL_BACKOFF_BASE_MS", "1000")?,
        challenge_backoff_ms: parse_u64("COUPONCRAWL_CHALLENGE_BACKOFF_MS", "20000")?,
        offer_stagger_ms: parse_u64("COUPONCRAWL_OFFER_STAGGER_MS", "500")?,
        log_level: or_default("COUPONCRAWL_LOG_LEVEL", "info"),
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
