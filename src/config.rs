//! Configuration read from the environment.
//!
//! Values come from process environment variables, optionally seeded from a
//! `config.env` file in the working directory. Everything is read once at
//! startup and handed to constructors explicitly.

use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

use crate::wallet::BalancePrecision;

const CONFIG_FILE: &str = "config.env";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" => Ok(StoreBackend::Postgres),
            other => Err(format!("unknown store backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    /// Create the wallets table on startup when missing.
    pub migrate: bool,
    pub max_connections: u32,
    /// `None` waits for row locks indefinitely.
    pub lock_timeout: Option<Duration>,
}

impl DbConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub store: StoreBackend,
    pub db: DbConfig,
    pub precision: BalancePrecision,
}

impl LedgerConfig {
    /// Loads `config.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::from_filename(CONFIG_FILE) {
            tracing::debug!("{CONFIG_FILE} not loaded, using process environment: {err}");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);
        let db = DbConfig {
            host: vars.string("DB_HOST", "localhost"),
            port: vars.parsed("DB_PORT", 5432)?,
            user: vars.string("DB_USER", "postgres"),
            password: vars.string("DB_PASSWORD", "postgres"),
            database: vars.string("DB_NAME", "walletdb"),
            ssl_mode: vars.string("DB_SSL_MODE", "disable"),
            migrate: vars.parsed("DB_MIGRATE", true)?,
            max_connections: vars.parsed("DB_MAX_CONNECTIONS", 10)?,
            // 0 is how Postgres spells "no timeout"
            lock_timeout: vars
                .optional::<u64>("DB_LOCK_TIMEOUT_MS")?
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
        };

        let defaults = BalancePrecision::default();
        let digits = vars.parsed("BALANCE_PRECISION", defaults.digits())?;
        let scale = vars.parsed("BALANCE_SCALE", defaults.scale())?;
        let precision = BalancePrecision::new(digits, scale).ok_or_else(|| {
            // blame the scale only when the digit count is usable on its own
            let key = if digits > 0 && digits <= BalancePrecision::MAX_DIGITS {
                "BALANCE_SCALE"
            } else {
                "BALANCE_PRECISION"
            };
            ConfigError::InvalidValue {
                key,
                message: format!(
                    "{digits} digits with scale {scale} is not a valid decimal column"
                ),
            }
        })?;

        Ok(Self {
            store: vars.parsed("LEDGER_STORE", StoreBackend::Memory)?,
            db,
            precision,
        })
    }
}

struct Vars<L>(L);

impl<L> Vars<L>
where
    L: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    fn optional<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.get(key)
            .map(|value| {
                value.parse::<T>().map_err(|err| ConfigError::InvalidValue {
                    key,
                    message: err.to_string(),
                })
            })
            .transpose()
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        Ok(self.optional(key)?.unwrap_or(default))
    }
}
