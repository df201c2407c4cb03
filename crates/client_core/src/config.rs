use std::{collections::HashMap, fs, path::Path};

use tracing::warn;
use url::Url;

use crate::controller::DEFAULT_NOTICE_TIMEOUT_MS;

pub const SETTINGS_FILE: &str = "docgen.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Single JSON endpoint every backend action is posted to. `None` leaves
    /// the controller unable to run any action.
    pub backend_url: Option<Url>,
    pub credentials_database_url: String,
    pub notice_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            credentials_database_url: "sqlite://./data/docgen-credentials.db".into(),
            notice_timeout_ms: DEFAULT_NOTICE_TIMEOUT_MS,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = value` file, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_value(&file_cfg, "backend_url") {
                    settings.backend_url = parse_backend_url(&v);
                }
                if let Some(v) = file_value(&file_cfg, "credentials_database_url") {
                    settings.credentials_database_url = normalize_database_url(&v);
                }
                if let Some(v) = file_value(&file_cfg, "notice_timeout_ms") {
                    apply_notice_timeout(&mut settings, &v);
                }
            }
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("NEXT_PUBLIC_BACKEND_URL") {
        settings.backend_url = parse_backend_url(&v);
    }
    if let Some(v) = env("APP__BACKEND_URL") {
        settings.backend_url = parse_backend_url(&v);
    }

    if let Some(v) = env("APP__CREDENTIALS_DATABASE_URL") {
        settings.credentials_database_url = normalize_database_url(&v);
    }

    if let Some(v) = env("APP__NOTICE_TIMEOUT_MS") {
        apply_notice_timeout(&mut settings, &v);
    }

    settings
}

fn file_value(file_cfg: &HashMap<String, toml::Value>, key: &str) -> Option<String> {
    match file_cfg.get(key)? {
        toml::Value::String(v) => Some(v.clone()),
        toml::Value::Integer(v) => Some(v.to_string()),
        other => {
            warn!(key, value = %other, "ignoring settings value of unexpected type");
            None
        }
    }
}

fn parse_backend_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            warn!(scheme = url.scheme(), "backend url must be http or https; treating as unset");
            None
        }
        Err(err) => {
            warn!(url = raw, error = %err, "invalid backend url; treating as unset");
            None
        }
    }
}

fn apply_notice_timeout(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(parsed) => settings.notice_timeout_ms = parsed,
        Err(_) => warn!(value = raw, "ignoring non-numeric notice timeout"),
    }
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().credentials_database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
