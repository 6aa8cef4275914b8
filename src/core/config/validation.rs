#![allow(clippy::result_large_err)]

use super::EditorConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &EditorConfig) -> Result<(), AppError> {
        let url = Url::parse(&config.backend.base_url).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("backend.base_url '{}' is not a valid URL: {}", config.backend.base_url, e),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "backend.base_url must use http or https",
            ));
        }

        if config.backend.timeout_seconds == 0 {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "backend.timeout_seconds must be greater than 0",
            ));
        }

        if config.overlay.poll_interval_seconds == 0 {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "overlay.poll_interval_seconds must be greater than 0",
            ));
        }

        let layout = &config.layout;
        for (name, value) in [
            ("nodesep", layout.nodesep),
            ("ranksep", layout.ranksep),
            ("padding", layout.padding),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::new(
                    ErrorCategory::ConfigError,
                    format!("layout.{} must be a non-negative number", name),
                ));
            }
        }

        if layout.cols == Some(0) || layout.rows == Some(0) {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "layout.cols and layout.rows must be at least 1",
            ));
        }

        Ok(())
    }
}
