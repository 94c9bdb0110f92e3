use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use twelf::{Layer, config};

use crate::abs_client::HttpSettings;
use crate::app::AppSettings;
use crate::player::PlayerSettings;

pub const CONFIG_FILE: &str = "abs_player.yaml";
pub const ENV_PREFIX: &str = "ABS_PLAYER_";

const DEFAULT_DB_CONNECTION_STRING: &str = "sqlite://abs_player.sqlite?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[config]
#[derive(Debug, Clone)]
pub struct Config {
    #[serde(default = "default_db_connection_string")]
    pub db_connection_string: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_thirty", deserialize_with = "lenient_u64")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_thirty", deserialize_with = "lenient_u64")]
    pub skip_seconds: u64,
    #[serde(default = "default_thirty", deserialize_with = "lenient_u64")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_book_cache_ttl", deserialize_with = "lenient_u64")]
    pub book_cache_ttl_secs: u64,
}

fn default_db_connection_string() -> String {
    DEFAULT_DB_CONNECTION_STRING.into()
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.into()
}

fn default_thirty() -> u64 {
    30
}

fn default_book_cache_ttl() -> u64 {
    300
}

/// Environment values arrive as strings; YAML values may be numbers.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// `abs_player.yaml` when present, then `ABS_PLAYER_*` variables on top.
    pub fn load() -> anyhow::Result<Self> {
        let mut layers = Vec::new();
        if Path::new(CONFIG_FILE).exists() {
            layers.push(Layer::Yaml(CONFIG_FILE.into()));
        }
        layers.push(Layer::Env(Some(ENV_PREFIX.to_string())));
        Config::with_layers(&layers).with_context(|| "Failed to load configuration")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.db_connection_string.trim().is_empty() {
            return Err("ABS_PLAYER_DB_CONNECTION_STRING is empty".into());
        }
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("ABS_PLAYER_BIND_ADDR is not a socket address: {}", self.bind_addr));
        }
        if self.sync_interval_secs == 0 {
            return Err("ABS_PLAYER_SYNC_INTERVAL_SECS must be positive".into());
        }
        if self.request_timeout_secs == 0 {
            return Err("ABS_PLAYER_REQUEST_TIMEOUT_SECS must be positive".into());
        }
        Ok(())
    }

    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            http: HttpSettings {
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                ..HttpSettings::default()
            },
            player: PlayerSettings {
                sync_interval: Duration::from_secs(self.sync_interval_secs),
                skip_seconds: self.skip_seconds as f64,
            },
            book_ttl: Duration::from_secs(self.book_cache_ttl_secs),
        }
    }
}
