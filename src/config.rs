//! Configuration types.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;

use crate::bridges::StorageTables;
use crate::conversation::DEFAULT_IDLE_TIMEOUT;
use crate::error::ConfigError;
use crate::llm::{DEFAULT_MODEL, LlmConfig};

/// Supabase connection settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: SecretString,
    pub tables: StorageTables,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// `None` when no API key is set; chat and extraction then report
    /// themselves unconfigured.
    pub llm: Option<LlmConfig>,
    /// `None` when the Supabase URL or key is missing.
    pub storage: Option<StorageConfig>,
    /// Sessions untouched for this long are dropped.
    pub session_idle_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            llm: None,
            storage: None,
            session_idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("REALTECH_PORT") {
            Some(raw) => parse_value("REALTECH_PORT", &raw)?,
            None => defaults.port,
        };
        let session_idle_timeout = match get("REALTECH_SESSION_IDLE_SECS") {
            Some(raw) => Duration::from_secs(parse_value("REALTECH_SESSION_IDLE_SECS", &raw)?),
            None => defaults.session_idle_timeout,
        };

        let llm = get("GEMINI_API_KEY").map(|key| LlmConfig {
            api_key: SecretString::from(key),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("GEMINI_BASE_URL"),
        });

        let storage = match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_KEY")) {
            (Some(url), Some(key)) => {
                let default_tables = StorageTables::default();
                Some(StorageConfig {
                    url,
                    service_key: SecretString::from(key),
                    tables: StorageTables {
                        leads: get("REALTECH_LEADS_TABLE").unwrap_or(default_tables.leads),
                        conversations: get("REALTECH_CONVERSATIONS_TABLE")
                            .unwrap_or(default_tables.conversations),
                    },
                })
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("Only one of SUPABASE_URL / SUPABASE_SERVICE_KEY is set, storage disabled");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            host: get("REALTECH_HOST").unwrap_or(defaults.host),
            port,
            llm,
            storage,
            session_idle_timeout,
        })
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: "REALTECH_HOST".to_string(),
            message: format!("{raw}: {e}"),
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}
