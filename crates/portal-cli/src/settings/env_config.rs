use std::env;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::config::{LogFormat, PortalConfig};

pub(super) fn load_config(path: &str) -> PortalConfig {
    if !Path::new(path).exists() {
        return PortalConfig::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(event = "config_read_failed", path, error = %err);
            return PortalConfig::default();
        }
    };
    match serde_yaml::from_str(&contents) {
        Ok(config) => config,
        Err(err) => {
            warn!(event = "config_parse_failed", path, error = %err);
            PortalConfig::default()
        }
    }
}

pub(super) fn apply_db_env_overrides(config: &mut PortalConfig) {
    if let Ok(value) = env::var("PORTAL_DB_APP_ROLE") {
        let value = value.trim();
        config.db.app_role = (!value.is_empty()).then(|| value.to_string());
    }
    if let Ok(value) = env::var("PORTAL_DB_OPERATION_TIMEOUT_MS") {
        match value.trim().parse::<u64>() {
            Ok(0) => config.db.operation_timeout_ms = None,
            Ok(ms) => config.db.operation_timeout_ms = Some(ms),
            Err(_) => {
                warn!(
                    event = "config_invalid",
                    field = "PORTAL_DB_OPERATION_TIMEOUT_MS",
                    value = %value
                );
            }
        }
    }
}

pub(super) fn apply_log_env_overrides(config: &mut PortalConfig) {
    if let Ok(value) = env::var("LOG_FORMAT") {
        if let Some(format) = parse_log_format(&value) {
            config.log.format = format;
        } else {
            warn!(event = "config_invalid", field = "LOG_FORMAT", value = %value);
        }
    }
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "text" | "" => Some(LogFormat::Pretty),
        _ => None,
    }
}
