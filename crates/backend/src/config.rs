use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_PLACES_API_BASE: &str = "https://maps.googleapis.com";
const DEFAULT_RADIUS_METERS: u32 = 5000;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub api_base: String,
    pub api_key: String,
    pub radius_m: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub places: PlacesConfig,
}

impl Config {
    /// Read configuration from the process environment, after loading a
    /// `.env` file if one exists.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match read("PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid PORT {raw:?}"))?,
            None => DEFAULT_PORT,
        };
        let radius_m = match read("PLACES_RADIUS_METERS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid PLACES_RADIUS_METERS {raw:?}"))?,
            None => DEFAULT_RADIUS_METERS,
        };
        let timeout_secs = match read("PLACES_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid PLACES_TIMEOUT_SECS {raw:?}"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let api_key = read("PLACES_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("PLACES_API_KEY is not set; nearby searches will be rejected upstream");
        }

        Ok(Config {
            port,
            data_dir: PathBuf::from(read("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            dist_dir: PathBuf::from(read("DIST_DIR").unwrap_or_else(|| "dist".to_string())),
            places: PlacesConfig {
                api_base: read("PLACES_API_BASE")
                    .unwrap_or_else(|| DEFAULT_PLACES_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key,
                radius_m,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.places.api_base, "https://maps.googleapis.com");
        assert_eq!(config.places.radius_m, 5000);
        assert_eq!(config.places.timeout, Duration::from_secs(10));
        assert!(config.places.api_key.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("PLACES_API_KEY", " secret "),
            ("PLACES_API_BASE", "http://127.0.0.1:9000/"),
            ("PLACES_RADIUS_METERS", "2500"),
            ("PLACES_TIMEOUT_SECS", "3"),
            ("DATA_DIR", "/srv/geo"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.places.api_key, "secret");
        assert_eq!(config.places.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.places.radius_m, 2500);
        assert_eq!(config.places.timeout, Duration::from_secs(3));
        assert_eq!(config.data_dir, PathBuf::from("/srv/geo"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "  "), ("DIST_DIR", "")]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let err = config_from(&[("PORT", "abc")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config_from(&[("PLACES_RADIUS_METERS", "-5")]).is_err());
        assert!(config_from(&[("PLACES_TIMEOUT_SECS", "ten")]).is_err());
    }
}
