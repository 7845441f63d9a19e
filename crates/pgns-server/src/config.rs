use anyhow::Context;
use pgns_core::ProxyError;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

pub const TARGET_HOST: &str = "TARGET_HOST";
pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
pub const CONN_POOL_SIZE: &str = "CONN_POOL_SIZE";
pub const LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const RESULT_FORMAT: &str = "RESULT_FORMAT";
pub const DEFAULT_NAMESPACE: &str = "DEFAULT_NAMESPACE";
pub const METRICS_ADDR: &str = "METRICS_ADDR";

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_POOL_SIZE: usize = 100;
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5432";

/// How query results are sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
    /// Raw query text in, one human-readable line per row out.
    #[default]
    Text,
    /// Framed simple-query protocol in both directions.
    Wire,
}

impl FromStr for ResultFormat {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ResultFormat::Text),
            "wire" => Ok(ResultFormat::Wire),
            other => Err(ProxyError::Configuration(format!(
                "{RESULT_FORMAT} must be `text` or `wire`, got `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub target_host: String,
    pub target_port: u16,
    /// Maximum number of backend sessions open at the same time.
    pub connection_pool_size: usize,
    pub listen_addr: String,
    pub result_format: ResultFormat,
    pub default_namespace: String,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Builds the configuration from a key/value source. Pure: the same
    /// lookup always yields the same result.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProxyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target_host = lookup(TARGET_HOST)
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| {
                ProxyError::Configuration(format!("target postgres must be configured ({TARGET_HOST})"))
            })?;
        let target_port = parse_or(&lookup, POSTGRES_PORT, DEFAULT_PORT)?;
        let connection_pool_size = parse_or(&lookup, CONN_POOL_SIZE, DEFAULT_POOL_SIZE)?;
        let listen_addr = lookup(LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let result_format = match lookup(RESULT_FORMAT) {
            Some(raw) => raw.parse()?,
            None => ResultFormat::default(),
        };
        let default_namespace = lookup(DEFAULT_NAMESPACE)
            .unwrap_or_else(|| pgns_rewrite::namespace::DEFAULT_NAMESPACE.to_string());
        let metrics_addr = lookup(METRICS_ADDR)
            .map(|raw| parse_value(METRICS_ADDR, &raw))
            .transpose()?;

        let config = Self {
            target_host,
            target_port,
            connection_pool_size,
            listen_addr,
            result_format,
            default_namespace,
            metrics_addr,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ProxyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment first, then the optional TOML file whose keys are the
    /// lower-case variable names (`target_host = "db"`).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::from_env()?);
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let table: toml::Table = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        let config = Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_value(&table, key))
        })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProxyError> {
        if self.connection_pool_size == 0 {
            return Err(ProxyError::Configuration(format!(
                "{CONN_POOL_SIZE} must be at least 1"
            )));
        }
        if self.default_namespace.trim().is_empty() {
            return Err(ProxyError::Configuration(format!(
                "{DEFAULT_NAMESPACE} must not be empty"
            )));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ProxyError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ProxyError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err| ProxyError::Configuration(format!("env {key} err {err}")))
}

fn file_value(table: &toml::Table, key: &str) -> Option<String> {
    match table.get(&key.to_ascii_lowercase())? {
        toml::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
