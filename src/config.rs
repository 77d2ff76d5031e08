use std::sync::Once;
use std::time::Duration;

use anyhow::Context;

use crate::utils::RetryConfig;

// ============================================================================
// Configuration - read from the environment (and .env, once)
// ============================================================================
//
// DATABASE_URL                   optional, absent = in-memory event log
// DATABASE_MIN_CONNECTIONS       default 1
// DATABASE_MAX_CONNECTIONS       default 8
// LEDGER_RETRY_MAX_ATTEMPTS      default 3
// LEDGER_RETRY_INITIAL_DELAY_MS  default 100
// LEDGER_LOG_FILTER              default "info,account_ledger=debug"
//
// ============================================================================

static DOTENV: Once = Once::new();

pub const DEFAULT_LOG_FILTER: &str = "info,account_ledger=debug";

/// Connection settings for the PostgreSQL event log
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub retry: RetryConfig,
    pub log_filter: String,
}

impl AppConfig {
    /// Load from process environment; a `.env` file is read the first time
    pub fn from_env() -> anyhow::Result<Self> {
        DOTENV.call_once(|| {
            // a missing .env is fine
            let _ = dotenvy::dotenv();
        });
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let min_connections = parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 1u32)?;
                let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 8u32)?;
                if min_connections > max_connections {
                    anyhow::bail!(
                        "DATABASE_MIN_CONNECTIONS ({min_connections}) exceeds DATABASE_MAX_CONNECTIONS ({max_connections})"
                    );
                }
                Some(DatabaseConfig {
                    url,
                    min_connections,
                    max_connections,
                })
            }
            None => None,
        };

        let defaults = RetryConfig::default();
        let max_attempts = parse_or(&lookup, "LEDGER_RETRY_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            anyhow::bail!("LEDGER_RETRY_MAX_ATTEMPTS must be at least 1");
        }
        let initial_delay_ms = parse_or(
            &lookup,
            "LEDGER_RETRY_INITIAL_DELAY_MS",
            defaults.initial_delay.as_millis() as u64,
        )?;

        let log_filter = lookup("LEDGER_LOG_FILTER")
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            database,
            retry: RetryConfig {
                max_attempts,
                initial_delay: Duration::from_millis(initial_delay_ms),
                ..defaults
            },
            log_filter,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
