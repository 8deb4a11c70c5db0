//! Configuration loading and resolution.
//!
//! Each setting is taken from the command line, then the environment, then
//! the library default.

use std::path::PathBuf;
use std::time::Duration;

use metal_price::source::browser::CHROMIUM_PATH_ENV;
use metal_price::{FetchConfig, PriceError, PriceResult};

pub const URL_ENV: &str = "METAL_PRICE_URL";
pub const MODE_ENV: &str = "METAL_PRICE_MODE";
pub const TIMEOUT_ENV: &str = "METAL_PRICE_TIMEOUT_SECS";
pub const SETTLE_ENV: &str = "METAL_PRICE_SETTLE_SECS";
pub const CAPTURE_ENV: &str = "METAL_PRICE_CAPTURE_CHART";

/// Values given on the command line. `None` / `false` defer to the environment.
#[derive(Debug, Clone, Default)]
pub struct FetchOverrides {
    pub url: Option<String>,
    pub mode: Option<String>,
    pub timeout_secs: Option<u64>,
    pub settle_secs: Option<u64>,
    pub chromium: Option<String>,
    pub capture_chart: bool,
}

/// Resolve the fetch configuration against the process environment.
pub fn resolve_fetch_config(overrides: &FetchOverrides) -> PriceResult<FetchConfig> {
    resolve_fetch_config_with(overrides, |key| std::env::var(key).ok())
}

/// Resolve the fetch configuration against an arbitrary variable lookup.
pub fn resolve_fetch_config_with(
    overrides: &FetchOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> PriceResult<FetchConfig> {
    let mut config = FetchConfig::default();

    if let Some(url) = overrides.url.clone().or_else(|| env(URL_ENV)) {
        config.url = url;
    }

    if let Some(mode) = overrides.mode.clone().or_else(|| env(MODE_ENV)) {
        config.mode = mode.parse()?;
    }

    if let Some(secs) = seconds(overrides.timeout_secs, env(TIMEOUT_ENV), TIMEOUT_ENV)? {
        config.http_timeout = Duration::from_secs(secs);
    }

    if let Some(secs) = seconds(overrides.settle_secs, env(SETTLE_ENV), SETTLE_ENV)? {
        config.settle_timeout = Duration::from_secs(secs);
    }

    config.chromium_path = overrides
        .chromium
        .clone()
        .or_else(|| env(CHROMIUM_PATH_ENV))
        .map(PathBuf::from);

    config.capture_chart =
        overrides.capture_chart || env(CAPTURE_ENV).is_some_and(|v| is_truthy(&v));

    config.validate()?;
    Ok(config)
}

fn seconds(explicit: Option<u64>, from_env: Option<String>, name: &str) -> PriceResult<Option<u64>> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    from_env
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|_| {
                PriceError::InvalidConfig(format!("{name} must be a whole number of seconds, got '{raw}'"))
            })
        })
        .transpose()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use metal_price::FetchMode;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = resolve_fetch_config_with(&FetchOverrides::default(), env_of(&[])).unwrap();
        assert_eq!(config.url, metal_price::fetcher::DEFAULT_URL);
        assert_eq!(config.mode, FetchMode::Auto);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.settle_timeout, Duration::from_secs(8));
        assert!(config.chromium_path.is_none());
        assert!(!config.capture_chart);
    }

    #[test]
    fn test_env_applies() {
        let env = env_of(&[
            (URL_ENV, "http://127.0.0.1:9000/silver"),
            (MODE_ENV, "browser"),
            (TIMEOUT_ENV, "4"),
            (CAPTURE_ENV, "yes"),
        ]);
        let config = resolve_fetch_config_with(&FetchOverrides::default(), env).unwrap();
        assert_eq!(config.url, "http://127.0.0.1:9000/silver");
        assert_eq!(config.mode, FetchMode::Browser);
        assert_eq!(config.http_timeout, Duration::from_secs(4));
        assert!(config.capture_chart);
    }

    #[test]
    fn test_flags_beat_env() {
        let env = env_of(&[(MODE_ENV, "browser"), (SETTLE_ENV, "20")]);
        let overrides = FetchOverrides {
            mode: Some("http".to_string()),
            settle_secs: Some(3),
            ..FetchOverrides::default()
        };
        let config = resolve_fetch_config_with(&overrides, env).unwrap();
        assert_eq!(config.mode, FetchMode::Http);
        assert_eq!(config.settle_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(resolve_fetch_config_with(
            &FetchOverrides::default(),
            env_of(&[(TIMEOUT_ENV, "ten")])
        )
        .is_err());
        assert!(resolve_fetch_config_with(
            &FetchOverrides::default(),
            env_of(&[(MODE_ENV, "wget")])
        )
        .is_err());
        let zero = FetchOverrides {
            timeout_secs: Some(0),
            ..FetchOverrides::default()
        };
        assert!(resolve_fetch_config_with(&zero, env_of(&[])).is_err());
    }
}
