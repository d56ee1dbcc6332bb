use anyhow::{ensure, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Tunables for the image acquisition pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory downloaded images are written to
    pub image_dir: PathBuf,
    /// URL prefix the image directory is served under
    pub public_prefix: String,
    pub image_extension: String,
    /// Cap on candidates kept per listing
    pub max_candidates: usize,
    /// Stop querying further sites once this many usable candidates exist
    pub early_stop_threshold: usize,
    pub per_site_max_results: usize,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub download_timeout: Duration,
    /// Pause between listings of a batch
    pub batch_delay: Duration,
    /// How long Chrome may go without traffic before the session is dropped
    pub browser_idle_timeout: Duration,
    pub user_agent: String,
    /// Where rendered search pages are dumped, if anywhere
    pub debug_dir: Option<PathBuf>,
    pub headless: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("public/images/kos"),
            public_prefix: "/images/kos".to_string(),
            image_extension: "jpg".to_string(),
            max_candidates: 5,
            early_stop_threshold: 3,
            per_site_max_results: 5,
            navigation_timeout: Duration::from_secs(30),
            selector_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(10),
            batch_delay: Duration::from_secs(2),
            browser_idle_timeout: Duration::from_secs(300),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            debug_dir: None,
            headless: true,
        }
    }
}

impl PipelineConfig {
    /// Idle allowance for the browser session.
    ///
    /// Chrome sees no traffic while a listing's images download and the
    /// throttle waits, so the allowance never drops below that gap plus one
    /// navigation.
    pub fn session_idle_timeout(&self) -> Duration {
        let downloads = self.download_timeout * self.max_candidates as u32;
        let gap = downloads + self.batch_delay + self.navigation_timeout;
        self.browser_idle_timeout.max(gap)
    }

    /// Defaults overlaid with any `KOS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_none() {
                debug!("{key} not set, using default");
            }
            value
        };

        Ok(Self {
            image_dir: get("KOS_IMAGE_DIR").map(PathBuf::from).unwrap_or(defaults.image_dir),
            public_prefix: get("KOS_PUBLIC_PREFIX").unwrap_or(defaults.public_prefix),
            image_extension: get("KOS_IMAGE_EXTENSION").unwrap_or(defaults.image_extension),
            max_candidates: positive(get("KOS_MAX_CANDIDATES"), "KOS_MAX_CANDIDATES", defaults.max_candidates)?,
            early_stop_threshold: positive(get("KOS_EARLY_STOP"), "KOS_EARLY_STOP", defaults.early_stop_threshold)?,
            per_site_max_results: positive(
                get("KOS_SITE_MAX_RESULTS"),
                "KOS_SITE_MAX_RESULTS",
                defaults.per_site_max_results,
            )?,
            navigation_timeout: secs(get("KOS_NAV_TIMEOUT_SECS"), "KOS_NAV_TIMEOUT_SECS", defaults.navigation_timeout)?,
            selector_timeout: secs(
                get("KOS_SELECTOR_TIMEOUT_SECS"),
                "KOS_SELECTOR_TIMEOUT_SECS",
                defaults.selector_timeout,
            )?,
            download_timeout: secs(
                get("KOS_DOWNLOAD_TIMEOUT_SECS"),
                "KOS_DOWNLOAD_TIMEOUT_SECS",
                defaults.download_timeout,
            )?,
            batch_delay: try_load(get("KOS_DELAY_MS"), "KOS_DELAY_MS", defaults.batch_delay.as_millis() as u64)
                .map(Duration::from_millis)?,
            browser_idle_timeout: secs(
                get("KOS_BROWSER_IDLE_SECS"),
                "KOS_BROWSER_IDLE_SECS",
                defaults.browser_idle_timeout,
            )?,
            user_agent: get("KOS_USER_AGENT").unwrap_or(defaults.user_agent),
            debug_dir: get("KOS_DEBUG_DIR").map(PathBuf::from),
            headless: try_load(get("KOS_HEADLESS"), "KOS_HEADLESS", defaults.headless)?,
        })
    }
}

fn try_load<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        None => Ok(default),
    }
}

fn positive(value: Option<String>, key: &str, default: usize) -> Result<usize> {
    let loaded = try_load(value, key, default)?;
    ensure!(loaded > 0, "Invalid {key} value: must be at least 1");
    Ok(loaded)
}

fn secs(value: Option<String>, key: &str, default: Duration) -> Result<Duration> {
    try_load(value, key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<PipelineConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_pipeline_policy() {
        let config = load(&[]).unwrap();
        assert_eq!(config.max_candidates, 5);
        assert_eq!(config.early_stop_threshold, 3);
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.selector_timeout, Duration::from_secs(10));
        assert_eq!(config.download_timeout, Duration::from_secs(10));
        assert_eq!(config.batch_delay, Duration::from_secs(2));
        assert_eq!(config.public_prefix, "/images/kos");
        assert!(config.headless);
        assert!(config.debug_dir.is_none());
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = load(&[
            ("KOS_IMAGE_DIR", "/tmp/kos"),
            ("KOS_DELAY_MS", "250"),
            ("KOS_EARLY_STOP", "2"),
            ("KOS_HEADLESS", "false"),
            ("KOS_DEBUG_DIR", "debug"),
        ])
        .unwrap();

        assert_eq!(config.image_dir, PathBuf::from("/tmp/kos"));
        assert_eq!(config.batch_delay, Duration::from_millis(250));
        assert_eq!(config.early_stop_threshold, 2);
        assert!(!config.headless);
        assert_eq!(config.debug_dir, Some(PathBuf::from("debug")));
    }

    #[test]
    fn test_blank_value_falls_back_to_default() {
        let config = load(&[("KOS_MAX_CANDIDATES", "  ")]).unwrap();
        assert_eq!(config.max_candidates, 5);
    }

    #[test]
    fn test_zero_counts_are_rejected() {
        for key in ["KOS_MAX_CANDIDATES", "KOS_EARLY_STOP", "KOS_SITE_MAX_RESULTS"] {
            let err = load(&[(key, "0")]).unwrap_err();
            assert!(err.to_string().contains(key), "{key} accepted zero");
        }
    }

    #[test]
    fn test_session_idle_timeout_covers_download_gap() {
        let config = load(&[
            ("KOS_BROWSER_IDLE_SECS", "30"),
            ("KOS_DOWNLOAD_TIMEOUT_SECS", "20"),
        ])
        .unwrap();

        // 5 downloads x 20s + 2s delay + 30s navigation
        assert_eq!(config.session_idle_timeout(), Duration::from_secs(132));
    }

    #[test]
    fn test_session_idle_timeout_keeps_larger_configured_value() {
        let config = load(&[("KOS_BROWSER_IDLE_SECS", "900")]).unwrap();
        assert_eq!(config.session_idle_timeout(), Duration::from_secs(900));
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = load(&[("KOS_NAV_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("KOS_NAV_TIMEOUT_SECS"));
    }
}
