use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use expireassist_core::config::{LoadOptions, CONFIG_FILE_NAME, NESTED_CONFIG_FILE};
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One rendered setting: dotted key, env var(s) that can set it, rendered value.
struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

/// Effective settings with their sources. A config that fails validation yields the
/// usual `config_validation` outcome instead of a listing.
pub fn run() -> CommandResult {
    let config = match load_config("config", LoadOptions::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let max_connections = config.database.max_connections.to_string();
    let timeout_secs = config.database.timeout_secs.to_string();
    let tie_break = config.recommendations.tie_break.to_string();
    let min_score = optional(config.recommendations.min_score);
    let hide_complete = config.recommendations.hide_complete.to_string();
    let max_results = optional(config.recommendations.max_results);
    let shelf_life = config.inventory.default_shelf_life_days.to_string();
    let log_format = config.logging.format.to_string();

    let fields = [
        Field {
            key_path: "database.url",
            env_keys: &["EXPIREASSIST_DATABASE_URL"],
            value: &config.database.url,
        },
        Field {
            key_path: "database.max_connections",
            env_keys: &["EXPIREASSIST_DATABASE_MAX_CONNECTIONS"],
            value: &max_connections,
        },
        Field {
            key_path: "database.timeout_secs",
            env_keys: &["EXPIREASSIST_DATABASE_TIMEOUT_SECS"],
            value: &timeout_secs,
        },
        Field {
            key_path: "recommendations.tie_break",
            env_keys: &["EXPIREASSIST_RECOMMENDATIONS_TIE_BREAK"],
            value: &tie_break,
        },
        Field {
            key_path: "recommendations.min_score",
            env_keys: &["EXPIREASSIST_RECOMMENDATIONS_MIN_SCORE"],
            value: &min_score,
        },
        Field {
            key_path: "recommendations.hide_complete",
            env_keys: &["EXPIREASSIST_RECOMMENDATIONS_HIDE_COMPLETE"],
            value: &hide_complete,
        },
        Field {
            key_path: "recommendations.max_results",
            env_keys: &["EXPIREASSIST_RECOMMENDATIONS_MAX_RESULTS"],
            value: &max_results,
        },
        Field {
            key_path: "inventory.default_shelf_life_days",
            env_keys: &["EXPIREASSIST_INVENTORY_DEFAULT_SHELF_LIFE_DAYS"],
            value: &shelf_life,
        },
        Field {
            key_path: "logging.level",
            env_keys: &["EXPIREASSIST_LOGGING_LEVEL", "EXPIREASSIST_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["EXPIREASSIST_LOGGING_FORMAT", "EXPIREASSIST_LOG_FORMAT"],
            value: &log_format,
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn optional(value: Option<impl ToString>) -> String {
    value.map(|value| value.to_string()).unwrap_or_else(|| "<unset>".to_string())
}

fn detect_config_path() -> Option<PathBuf> {
    [CONFIG_FILE_NAME, NESTED_CONFIG_FILE].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source, optional};

    #[test]
    fn nested_keys_resolve_through_tables() {
        let doc: Value = "[recommendations]\nmin_score = 0.25\n".parse().expect("toml");

        assert!(contains_path(&doc, "recommendations.min_score"));
        assert!(!contains_path(&doc, "recommendations.max_results"));
        assert!(!contains_path(&doc, "logging.level"));
    }

    #[test]
    fn file_source_beats_default_when_env_is_absent() {
        let doc: Value = "[inventory]\ndefault_shelf_life_days = 3\n".parse().expect("toml");

        let source = field_source(
            "inventory.default_shelf_life_days",
            &["EXPIREASSIST_TEST_UNSET_SHELF_LIFE"],
            Some(&doc),
            None,
        );
        assert_eq!(source, "file (config file)");
        assert_eq!(field_source("logging.level", &[], Some(&doc), None), "default");
    }

    #[test]
    fn unset_optionals_render_placeholder() {
        assert_eq!(optional(None::<usize>), "<unset>");
        assert_eq!(optional(Some(5usize)), "5");
    }
}
