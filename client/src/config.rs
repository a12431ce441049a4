use std::path::PathBuf;

use anyhow::anyhow;
use chrono_tz::Tz;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_STORAGE_PATH: &str = "./attendance-store.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub time_zone: Tz,
    pub http_timeout_secs: u64,
    pub storage_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            time_zone: Tz::UTC,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
        }
    }
}

impl ClientConfig {
    /// Loads `.env` (if any) and then reads the process environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("API_BASE_URL")
            .map(|raw| normalize_base_url(&raw))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(anyhow!("Invalid API_BASE_URL value: {}", api_base_url));
        }

        let time_zone_name = lookup("APP_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let http_timeout_secs = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow!("Invalid HTTP_TIMEOUT_SECS value: {}", raw))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let storage_path = lookup("STORAGE_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));

        Ok(Self {
            api_base_url,
            time_zone,
            http_timeout_secs,
            storage_path,
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.time_zone, Tz::UTC);
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(config.storage_path, PathBuf::from(DEFAULT_STORAGE_PATH));
    }

    #[test]
    fn overrides_are_read_and_base_url_is_trimmed() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("API_BASE_URL", " http://10.0.2.2:5000/api/ "),
            ("APP_TIMEZONE", "Asia/Karachi"),
            ("HTTP_TIMEOUT_SECS", "30"),
            ("STORAGE_PATH", "/tmp/store.json"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://10.0.2.2:5000/api");
        assert_eq!(config.time_zone.name(), "Asia/Karachi");
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.storage_path, PathBuf::from("/tmp/store.json"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ClientConfig::from_lookup(lookup_from(&[("APP_TIMEZONE", "Mars/Base")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[("HTTP_TIMEOUT_SECS", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[("API_BASE_URL", "ftp://x")])).is_err());
    }
}
