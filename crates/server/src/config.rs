use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use audio_core::DEFAULT_MAX_OUTPUT_SAMPLES;
use axum::http::HeaderValue;
use serde::Deserialize;
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub max_upload_bytes: usize,
    /// Upper bound on samples in the decoded input and every processed clip.
    pub max_output_samples: usize,
    pub cors_allowed_origin: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            max_upload_bytes: 64 * 1024 * 1024,
            max_output_samples: DEFAULT_MAX_OUTPUT_SAMPLES,
            cors_allowed_origin: None,
        }
    }
}

impl Settings {
    pub fn cors_origin(&self) -> anyhow::Result<Option<HeaderValue>> {
        self.cors_allowed_origin
            .as_deref()
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid CORS origin '{origin}'"))
            })
            .transpose()
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `server.toml`, then environment. Later sources win.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
                    settings.server_bind = v.to_string();
                }
                if let Some(v) = file_cfg
                    .get("max_upload_bytes")
                    .and_then(toml::Value::as_integer)
                    .and_then(|v| usize::try_from(v).ok())
                {
                    settings.max_upload_bytes = v;
                }
                if let Some(v) = file_cfg
                    .get("max_output_samples")
                    .and_then(toml::Value::as_integer)
                    .and_then(|v| usize::try_from(v).ok())
                {
                    settings.max_output_samples = v;
                }
                if let Some(v) = file_cfg
                    .get("cors_allowed_origin")
                    .and_then(toml::Value::as_str)
                {
                    settings.cors_allowed_origin = Some(v.to_string());
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__MAX_UPLOAD_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_upload_bytes = parsed;
        }
    }

    if let Some(v) = env("APP__MAX_OUTPUT_SAMPLES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_output_samples = parsed;
        }
    }

    if let Some(v) = env("APP__CORS_ALLOWED_ORIGIN") {
        settings.cors_allowed_origin = Some(v);
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
