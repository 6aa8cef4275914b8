#![allow(clippy::result_large_err)]

use super::EditorConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "dagboard.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/dagboard.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<EditorConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<EditorConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: EditorConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Environment variables take precedence over config file values.
    /// Unparseable numeric values are ignored.
    fn apply_env_overrides(config: &mut EditorConfig) {
        if let Ok(url) = env::var("DAGBOARD_BACKEND_URL") {
            config.backend.base_url = url;
        }

        if let Ok(token) = env::var("DAGBOARD_BACKEND_TOKEN") {
            config.backend.token = Some(token).filter(|t| !t.is_empty());
        }

        if let Ok(raw) = env::var("DAGBOARD_PROJECT_CODE") {
            if let Ok(project_code) = raw.trim().parse::<i64>() {
                config.backend.project_code = project_code;
            }
        }

        if let Ok(raw) = env::var("DAGBOARD_TIMEOUT_SECONDS") {
            if let Ok(timeout) = raw.trim().parse::<u64>() {
                config.backend.timeout_seconds = timeout;
            }
        }

        if let Ok(raw) = env::var("DAGBOARD_POLL_INTERVAL_SECONDS") {
            if let Ok(interval) = raw.trim().parse::<u64>() {
                config.overlay.poll_interval_seconds = interval;
            }
        }

        if let Ok(raw) = env::var("DAGBOARD_LAYOUT_KIND") {
            match raw.parse() {
                Ok(kind) => config.layout.kind = kind,
                Err(err) => tracing::warn!("ignoring DAGBOARD_LAYOUT_KIND: {}", err),
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "DAGBOARD_BACKEND_URL - Override the REST API base URL",
            "DAGBOARD_BACKEND_TOKEN - Session token sent with every request",
            "DAGBOARD_PROJECT_CODE - Project code scoping every call",
            "DAGBOARD_TIMEOUT_SECONDS - Per-request timeout (default: 30)",
            "DAGBOARD_POLL_INTERVAL_SECONDS - Status polling interval (default: 5)",
            "DAGBOARD_LAYOUT_KIND - Default auto-layout, grid or dagre (default: dagre)",
        ]
    }
}
