//! Application settings loaded from environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Default dotenv file consulted by [`Settings::from_env`].
pub const ENV_FILE: &str = ".env";

const DEFAULT_APP_NAME: &str = "FastAPI Health Application";
const DEFAULT_LOG_LEVEL: &str = "INFO";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Errors raised while reading settings. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid boolean for {key}: {value:?}")]
    InvalidBool { key: &'static str, value: String },

    #[error("invalid port {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("failed to read env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Service settings.
///
/// Reads from environment variables (names are case-insensitive):
/// - `APP_NAME` — application title (default: `"FastAPI Health Application"`)
/// - `DEBUG` — debug mode flag (default: `false`)
/// - `LOG_LEVEL` — minimum log severity (default: `"INFO"`)
/// - `HOST` — bind address (default: `"127.0.0.1"`)
/// - `PORT` — listen port (default: `8000`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub app_name: String,
    pub debug: bool,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Loads settings from `.env` in the working directory, overridden by the
    /// process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_env_file(ENV_FILE)
    }

    /// Loads settings from the given dotenv file, overridden by the process
    /// environment. A missing file is not an error.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let mut vars = read_env_file(path.as_ref())?;
        vars.extend(normalize(process_env()));
        Self::from_map(&vars)
    }

    /// Builds settings from explicit key/value pairs. Later pairs win.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = normalize(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self::from_map(&vars)
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_map(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let debug = match vars.get("DEBUG") {
            Some(value) => parse_bool("DEBUG", value)?,
            None => defaults.debug,
        };

        let port = match vars.get("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| SettingsError::InvalidPort {
                    value: value.clone(),
                    source,
                })?,
            None => defaults.port,
        };

        Ok(Self {
            app_name: vars.get("APP_NAME").cloned().unwrap_or(defaults.app_name),
            debug,
            log_level: vars.get("LOG_LEVEL").cloned().unwrap_or(defaults.log_level),
            host: vars.get("HOST").cloned().unwrap_or(defaults.host),
            port,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            debug: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Returns the process-wide settings, loading them on first access.
///
/// Every successful call returns the same instance. A failed load is not
/// cached, so callers see the error until the environment is fixed.
pub fn get_settings() -> Result<&'static Settings, SettingsError> {
    SETTINGS.get_or_try_init(Settings::from_env)
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, SettingsError> {
    let to_error = |source| SettingsError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(err) if err.not_found() => return Ok(HashMap::new()),
        Err(err) => return Err(to_error(err)),
    };

    let pairs = iter.collect::<Result<Vec<_>, _>>().map_err(to_error)?;
    Ok(normalize(pairs))
}

/// Process environment, skipping entries that are not valid UTF-8.
fn process_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

fn normalize(vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.into_iter()
        .map(|(key, value)| (key.to_ascii_uppercase(), value))
        .collect()
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidBool {
            key,
            value: value.to_string(),
        }),
    }
}
