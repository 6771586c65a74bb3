pub mod config;
pub mod doctor;
pub mod import_legacy;
pub mod migrate;
pub mod movement;
pub mod notifications;
pub mod seed;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;
use uuid::Uuid;

use staffmove_core::config::{AppConfig, LoadOptions};
use staffmove_core::{ErrorKind, MovementService, WorkflowError};
use staffmove_db::{
    connect_with_settings, migrations, DbPool, SqlMovementStore, SqlNotificationOutbox,
    SqlPersonnelDirectory,
};

pub type SqlService =
    MovementService<SqlPersonnelDirectory, SqlMovementStore, SqlNotificationOutbox>;

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
    user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            user_message: None,
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
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
            user_message: None,
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Keeps the detailed message for operators and adds the user-safe wording, tied together
    /// by a correlation id that also lands in the log.
    pub fn workflow_failure(command: &str, error: &WorkflowError) -> Self {
        let interface = error.clone().into_interface(Uuid::new_v4().to_string());
        tracing::warn!(
            event_name = "cli.workflow_refused",
            command,
            correlation_id = interface.correlation_id(),
            error_kind = error.kind().as_str(),
            "{error}"
        );

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error.kind().as_str().to_string()),
            message: error.to_string(),
            user_message: Some(interface.user_message().to_string()),
            correlation_id: Some(interface.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code: workflow_exit_code(error), output: serialize_payload(payload) }
    }
}

/// 7 for refusals the caller has to fix, 8 for conflicts worth retrying as-is.
fn workflow_exit_code(error: &WorkflowError) -> u8 {
    match error.kind() {
        ErrorKind::Persistence => 4,
        ErrorKind::ConcurrentModification | ErrorKind::Timeout => 8,
        ErrorKind::Validation
        | ErrorKind::InvalidState
        | ErrorKind::Authorization
        | ErrorKind::NoValidator
        | ErrorKind::NotFound => 7,
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\",\"data\":null}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

/// Loads configuration and a current-thread runtime, or the failure to print instead.
pub(crate) fn prepare(command: &str) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, (&'static str, String, u8)> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) fn service(pool: &DbPool, config: &AppConfig) -> SqlService {
    MovementService::new(
        Arc::new(SqlPersonnelDirectory::new(pool.clone())),
        Arc::new(SqlMovementStore::new(pool.clone())),
        Arc::new(SqlNotificationOutbox::new(pool.clone())),
        &config.workflow,
    )
}

/// Runs one workflow operation against the configured database and wraps its outcome in the
/// JSON envelope.
pub(crate) fn execute<T, F, Fut>(command: &str, operation: F) -> CommandResult
where
    T: Serialize,
    F: FnOnce(SqlService) -> Fut,
    Fut: Future<Output = Result<(String, T), WorkflowError>>,
{
    let (config, runtime) = match prepare(command) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let pool = match open_pool(&config).await {
            Ok(pool) => pool,
            Err((error_class, message, exit_code)) => {
                return CommandResult::failure(command, error_class, message, exit_code)
            }
        };

        let outcome = operation(service(&pool, &config)).await;
        pool.close().await;

        match outcome {
            Ok((message, data)) => {
                CommandResult::success_with_data(command, message, to_data(&data))
            }
            Err(error) => CommandResult::workflow_failure(command, &error),
        }
    })
}
