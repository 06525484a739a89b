pub mod config;
pub mod doctor;
pub mod inventory;
pub mod migrate;
pub mod photos;
pub mod recommend;
pub mod seed;

use std::future::Future;

use expireassist_core::config::{AppConfig, LoadOptions};
use expireassist_core::errors::ApplicationError;
use expireassist_db::{connect_with_config, migrations, DbPool, RepositoryError};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Error class, message and exit code of a failed command step.
pub(crate) type Failure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success outcome carrying a structured `data` payload next to the message.
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => {
                let payload = CommandOutcome {
                    command: command.to_string(),
                    status: "ok".to_string(),
                    error_class: None,
                    message: message.into(),
                    data: Some(data),
                };
                Self { exit_code: 0, output: serialize_payload(payload) }
            }
            Err(error) => Self::failure(command, "serialization", error.to_string(), 5),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str, options: LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        let error = ApplicationError::Configuration(error.to_string());
        CommandResult::failure(command, error.error_class(), error.to_string(), error.exit_code())
    })
}

/// Run `work` against a migrated pool on a current-thread runtime.
///
/// Runtime, connection and migration failures map to exit codes 3, 4 and 5.
/// The pool is closed whether `work` succeeds or not.
pub(crate) fn with_database<T, F, Fut>(
    command: &str,
    config: &AppConfig,
    work: F,
) -> Result<T, CommandResult>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        },
    )?;

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return Err(("migration", error.to_string(), 5u8));
        }

        let outcome = work(pool.clone()).await;
        pool.close().await;
        outcome
    });

    result.map_err(|failure| CommandResult::from_failure(command, failure))
}

/// Domain problems are the caller's input; everything else is an execution failure.
pub(crate) fn repository_failure(error: RepositoryError) -> Failure {
    let error = match error {
        RepositoryError::Domain(domain) => ApplicationError::Domain(domain),
        RepositoryError::UnknownItem(name) => {
            return ("invalid_input", format!("unknown item `{name}`"), 6);
        }
        other => ApplicationError::Persistence(other.to_string()),
    };
    (error.error_class(), error.to_string(), error.exit_code())
}

#[cfg(test)]
mod tests {
    use expireassist_core::errors::DomainError;
    use expireassist_db::RepositoryError;
    use serde_json::Value;

    use super::{repository_failure, CommandResult};

    #[test]
    fn failure_payload_carries_class_and_code() {
        let result = CommandResult::failure("recommend", "db_connectivity", "refused", 4);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 4);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "db_connectivity");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn success_with_data_embeds_payload() {
        let result = CommandResult::success_with_data("photos", "2 updated", &vec!["Milk", "Eggs"]);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["error_class"], Value::Null);
        assert_eq!(payload["data"][1], "Eggs");
    }

    #[test]
    fn repository_failures_split_input_from_execution() {
        let unknown = repository_failure(RepositoryError::UnknownItem("Saffron".to_string()));
        assert_eq!(unknown, ("invalid_input", "unknown item `Saffron`".to_string(), 6));

        let quantity = repository_failure(RepositoryError::Domain(DomainError::InvalidQuantity {
            item: "Milk".to_string(),
        }));
        assert_eq!(quantity.0, "invalid_input");
        assert_eq!(quantity.2, 6);

        let decode = repository_failure(RepositoryError::Decode("bad timestamp".to_string()));
        assert_eq!(decode.0, "persistence");
        assert_eq!(decode.2, 5);
    }
}
