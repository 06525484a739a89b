use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recommendations::TieBreak;

pub const CONFIG_FILE_NAME: &str = "expireassist.toml";
pub const NESTED_CONFIG_FILE: &str = "config/expireassist.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub recommendations: RecommendationsConfig,
    pub inventory: InventoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecommendationsConfig {
    pub tie_break: TieBreak,
    pub min_score: Option<f64>,
    pub hide_complete: bool,
    pub max_results: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Shelf life used for items created without one.
    pub default_shelf_life_days: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub tie_break: Option<TieBreak>,
    pub min_score: Option<f64>,
    pub hide_complete: Option<bool>,
    pub max_results: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://expireassist.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            recommendations: RecommendationsConfig {
                tie_break: TieBreak::CatalogOrder,
                min_score: None,
                hide_complete: false,
                max_results: None,
            },
            inventory: InventoryConfig { default_shelf_life_days: 7 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(recommendations) = patch.recommendations {
            if let Some(tie_break) = recommendations.tie_break {
                self.recommendations.tie_break = tie_break;
            }
            if let Some(min_score) = recommendations.min_score {
                self.recommendations.min_score = Some(min_score);
            }
            if let Some(hide_complete) = recommendations.hide_complete {
                self.recommendations.hide_complete = hide_complete;
            }
            if let Some(max_results) = recommendations.max_results {
                self.recommendations.max_results = Some(max_results);
            }
        }

        if let Some(inventory) = patch.inventory {
            if let Some(days) = inventory.default_shelf_life_days {
                self.inventory.default_shelf_life_days = days;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("EXPIREASSIST_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("EXPIREASSIST_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_value("EXPIREASSIST_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("EXPIREASSIST_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_value("EXPIREASSIST_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("EXPIREASSIST_RECOMMENDATIONS_TIE_BREAK") {
            self.recommendations.tie_break = value.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "EXPIREASSIST_RECOMMENDATIONS_TIE_BREAK".to_string(),
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = read_env("EXPIREASSIST_RECOMMENDATIONS_MIN_SCORE") {
            self.recommendations.min_score =
                Some(parse_value("EXPIREASSIST_RECOMMENDATIONS_MIN_SCORE", &value)?);
        }
        if let Some(value) = read_env("EXPIREASSIST_RECOMMENDATIONS_HIDE_COMPLETE") {
            self.recommendations.hide_complete =
                parse_value("EXPIREASSIST_RECOMMENDATIONS_HIDE_COMPLETE", &value)?;
        }
        if let Some(value) = read_env("EXPIREASSIST_RECOMMENDATIONS_MAX_RESULTS") {
            self.recommendations.max_results =
                Some(parse_value("EXPIREASSIST_RECOMMENDATIONS_MAX_RESULTS", &value)?);
        }

        if let Some(value) = read_env("EXPIREASSIST_INVENTORY_DEFAULT_SHELF_LIFE_DAYS") {
            self.inventory.default_shelf_life_days =
                parse_value("EXPIREASSIST_INVENTORY_DEFAULT_SHELF_LIFE_DAYS", &value)?;
        }

        let log_level =
            read_env("EXPIREASSIST_LOGGING_LEVEL").or_else(|| read_env("EXPIREASSIST_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("EXPIREASSIST_LOGGING_FORMAT").or_else(|| read_env("EXPIREASSIST_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(tie_break) = overrides.tie_break {
            self.recommendations.tie_break = tie_break;
        }
        if let Some(min_score) = overrides.min_score {
            self.recommendations.min_score = Some(min_score);
        }
        if let Some(hide_complete) = overrides.hide_complete {
            self.recommendations.hide_complete = hide_complete;
        }
        if let Some(max_results) = overrides.max_results {
            self.recommendations.max_results = Some(max_results);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_recommendations(&self.recommendations)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_recommendations(recommendations: &RecommendationsConfig) -> Result<(), ConfigError> {
    if let Some(min_score) = recommendations.min_score {
        if !(0.0..=1.0).contains(&min_score) {
            return Err(ConfigError::Validation(
                "recommendations.min_score must be in range 0.0..=1.0".to_string(),
            ));
        }
    }

    if recommendations.max_results == Some(0) {
        return Err(ConfigError::Validation(
            "recommendations.max_results must be greater than zero when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    recommendations: Option<RecommendationsPatch>,
    inventory: Option<InventoryPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationsPatch {
    tie_break: Option<TieBreak>,
    min_score: Option<f64>,
    hide_complete: Option<bool>,
    max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct InventoryPatch {
    default_shelf_life_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::recommendations::TieBreak;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.database.url.starts_with("sqlite://"), "default url should be sqlite")?;
        ensure(
            config.recommendations.tie_break == TieBreak::CatalogOrder,
            "catalog order should be the default tie break",
        )?;
        ensure(config.inventory.default_shelf_life_days == 7, "default shelf life is a week")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PANTRY_DB", "sqlite://pantry-from-env.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("expireassist.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_PANTRY_DB}"

[recommendations]
tie_break = "meal_id"
hide_complete = true
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://pantry-from-env.db",
                "database url should be interpolated from environment",
            )?;
            ensure(
                config.recommendations.tie_break == TieBreak::MealId,
                "tie break should be read from file",
            )?;
            ensure(config.recommendations.hide_complete, "hide_complete should be read from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_PANTRY_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("EXPIREASSIST_LOG_LEVEL", "warn");
        env::set_var("EXPIREASSIST_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["EXPIREASSIST_LOG_LEVEL", "EXPIREASSIST_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("EXPIREASSIST_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("EXPIREASSIST_RECOMMENDATIONS_MAX_RESULTS", "10");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("expireassist.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[recommendations]
max_results = 3
min_score = 0.25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.recommendations.max_results == Some(10),
                "env max_results should win over file",
            )?;
            ensure(
                config.recommendations.min_score == Some(0.25),
                "file min_score should win over default",
            )?;
            Ok(())
        })();

        clear_vars(&["EXPIREASSIST_DATABASE_URL", "EXPIREASSIST_RECOMMENDATIONS_MAX_RESULTS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("EXPIREASSIST_RECOMMENDATIONS_MIN_SCORE", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("recommendations.min_score")
            );
            ensure(has_message, "validation failure should mention recommendations.min_score")
        })();

        clear_vars(&["EXPIREASSIST_RECOMMENDATIONS_MIN_SCORE"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("EXPIREASSIST_DATABASE_MAX_CONNECTIONS", "many");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, value }) => ensure(
                key == "EXPIREASSIST_DATABASE_MAX_CONNECTIONS" && value == "many",
                "invalid override should carry key and value",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override error".to_string()),
        };

        clear_vars(&["EXPIREASSIST_DATABASE_MAX_CONNECTIONS"]);
        result
    }
}
