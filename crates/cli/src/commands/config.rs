use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use staffmove_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        field_source(
            "database.url",
            &["STAFFMOVE_DATABASE_URL"],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        field_source(
            "database.max_connections",
            &["STAFFMOVE_DATABASE_MAX_CONNECTIONS"],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        field_source(
            "database.timeout_secs",
            &["STAFFMOVE_DATABASE_TIMEOUT_SECS"],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "workflow.hr_service",
        &config.workflow.hr_service,
        field_source(
            "workflow.hr_service",
            &["STAFFMOVE_WORKFLOW_HR_SERVICE"],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "workflow.io_timeout_ms",
        &config.workflow.io_timeout_ms.to_string(),
        field_source(
            "workflow.io_timeout_ms",
            &["STAFFMOVE_WORKFLOW_IO_TIMEOUT_MS"],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source(
            "logging.level",
            &["STAFFMOVE_LOGGING_LEVEL", "STAFFMOVE_LOG_LEVEL"],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source(
            "logging.format",
            &["STAFFMOVE_LOGGING_FORMAT", "STAFFMOVE_LOG_FORMAT"],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("staffmove.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/staffmove.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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
    // First alias wins, matching the loader.
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
    use std::path::Path;

    use super::{contains_path, field_source};

    #[test]
    fn file_source_requires_the_full_key_path() {
        let doc: toml::Value = "[workflow]\nhr_service = \"DRH\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "workflow.hr_service"));
        assert!(!contains_path(&doc, "workflow.io_timeout_ms"));
        assert_eq!(
            field_source(
                "workflow.hr_service",
                &["STAFFMOVE_TEST_UNSET_HR_SERVICE"],
                Some(&doc),
                Some(Path::new("staffmove.toml")),
            ),
            "file (staffmove.toml)"
        );
        assert_eq!(
            field_source("workflow.io_timeout_ms", &[], Some(&doc), None),
            "default"
        );
    }
}
