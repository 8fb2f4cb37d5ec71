use config::{File, FileFormat, Map, Value};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config.ini";
pub const CONFIG_PATH_ENV: &str = "SENTINEL_CONFIG";

const IBKR_SECTION: &str = "IBKR";
const NEWS_API_SECTION: &str = "NEWS_API";

#[derive(Debug, Clone, Serialize)]
pub struct IbkrConfig {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsApiConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub ibkr: IbkrConfig,
    pub news_api: NewsApiConfig,
}

/// Path of the configuration file: `SENTINEL_CONFIG` if set, else `config.ini`.
pub fn config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from {}", path.display());

    if !path.is_file() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }

    let source = File::from(path).format(FileFormat::Ini);
    let raw = build_sections(config::Config::builder().add_source(source))?;
    Config::from_sections(&raw)
}

impl Config {
    /// Parses INI text directly, bypassing the filesystem.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        let raw = build_sections(
            config::Config::builder().add_source(File::from_str(contents, FileFormat::Ini)),
        )?;
        Self::from_sections(&raw)
    }

    fn from_sections(raw: &Map<String, Value>) -> Result<Self, ConfigError> {
        let ibkr = section(raw, IBKR_SECTION)?;
        let host = option(&ibkr, IBKR_SECTION, "HOST")?;
        let port = parse_option(&ibkr, IBKR_SECTION, "PORT")?;
        let client_id = parse_option(&ibkr, IBKR_SECTION, "CLIENT_ID")?;

        let news = section(raw, NEWS_API_SECTION)?;
        let api_key = option(&news, NEWS_API_SECTION, "API_KEY")?;

        debug!("Configuration parsed: IBKR {}:{} client {}", host, port, client_id);

        Ok(Self {
            ibkr: IbkrConfig {
                host,
                port,
                client_id,
            },
            news_api: NewsApiConfig { api_key },
        })
    }
}

fn build_sections(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Map<String, Value>, ConfigError> {
    builder
        .build()
        .and_then(|c| c.try_deserialize::<Map<String, Value>>())
        .map_err(|e| ConfigError::Parse(e.to_string()))
}

// INI section and key names are matched case-insensitively.
fn lookup<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn section(raw: &Map<String, Value>, name: &str) -> Result<Map<String, Value>, ConfigError> {
    lookup(raw, name)
        .cloned()
        .and_then(|value| value.into_table().ok())
        .ok_or_else(|| ConfigError::missing_section(name))
}

fn option(table: &Map<String, Value>, section: &str, name: &str) -> Result<String, ConfigError> {
    let value = lookup(table, name).ok_or_else(|| ConfigError::missing_option(section, name))?;
    value
        .clone()
        .into_string()
        .map(|s| s.trim().to_string())
        .map_err(|_| ConfigError::invalid_value(section, name, value.to_string()))
}

fn parse_option<T: std::str::FromStr>(
    table: &Map<String, Value>,
    section: &str,
    name: &str,
) -> Result<T, ConfigError> {
    let raw = option(table, section, name)?;
    raw.parse()
        .map_err(|_| ConfigError::invalid_value(section, name, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\
[IBKR]
HOST = 127.0.0.1
PORT = 7497
CLIENT_ID = 7

[NEWS_API]
API_KEY = secret-key
";

    #[test]
    fn test_parses_valid_config() {
        let config = Config::from_ini_str(VALID).unwrap();
        assert_eq!(config.ibkr.host, "127.0.0.1");
        assert_eq!(config.ibkr.port, 7497);
        assert_eq!(config.ibkr.client_id, 7);
        assert_eq!(config.news_api.api_key, "secret-key");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/definitely/not/here/config.ini").unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(ref p) if p.ends_with("config.ini")));
    }

    #[test]
    fn test_missing_section() {
        let err = Config::from_ini_str("[IBKR]\nHOST = h\nPORT = 1\nCLIENT_ID = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(ref s) if s == "NEWS_API"));
    }

    #[test]
    fn test_missing_option() {
        let err = Config::from_ini_str("[IBKR]\nHOST = h\nCLIENT_ID = 2\n[NEWS_API]\nAPI_KEY = k\n")
            .unwrap_err();
        match err {
            ConfigError::MissingOption { section, option } => {
                assert_eq!(section, "IBKR");
                assert_eq!(option, "PORT");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_ini_str(
            "[IBKR]\nHOST = h\nPORT = seven\nCLIENT_ID = 2\n[NEWS_API]\nAPI_KEY = k\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref option, .. } if option == "PORT"));
    }

    #[test]
    fn test_loads_from_disk() {
        let path = env::temp_dir().join(format!("sentinel-config-{}.ini", std::process::id()));
        std::fs::write(&path, VALID).unwrap();
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.ibkr.port, 7497);
    }
}
