use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

const DEFAULT_DB_PATH: &str = "data/lotto.db";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    /// Upper bound on any single store call before it fails.
    pub store_timeout_secs: u64,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_PATH.to_string(),
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }
}

pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| env::var(key).ok())
}

/// Builds the config from any key lookup; empty values count as unset.
pub fn from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let database_url = get("LOTTO_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

    let store_timeout_secs = match get("LOTTO_STORE_TIMEOUT_SECS") {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("LOTTO_STORE_TIMEOUT_SECS is not a number: {}", raw))?,
        None => DEFAULT_STORE_TIMEOUT_SECS,
    };

    Ok(Config {
        database_url,
        store_timeout_secs,
        telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
        telegram_chat_id: get("TELEGRAM_CHAT_ID"),
    })
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
    fn test_defaults() {
        let config = from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, "data/lotto.db");
        assert_eq!(config.store_timeout_secs, 10);
        assert!(config.telegram_bot_token.is_none());
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = from_lookup(lookup_from(&[
            ("LOTTO_DB_PATH", "/tmp/x.db"),
            ("LOTTO_STORE_TIMEOUT_SECS", "3"),
            ("TELEGRAM_BOT_TOKEN", "abc"),
            ("TELEGRAM_CHAT_ID", "  "),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "/tmp/x.db");
        assert_eq!(config.store_timeout_secs, 3);
        assert_eq!(config.telegram_bot_token.as_deref(), Some("abc"));
        assert!(config.telegram_chat_id.is_none());
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        assert!(from_lookup(lookup_from(&[("LOTTO_STORE_TIMEOUT_SECS", "soon")])).is_err());
    }
}
