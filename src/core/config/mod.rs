use crate::core::dag::layout::LayoutConfig;
use serde::{Deserialize, Serialize};

/// Editor configuration loaded from dagboard.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EditorConfig {
    /// Scheduler REST API
    #[serde(default)]
    pub backend: BackendConfig,

    /// Instance status polling
    #[serde(default)]
    pub overlay: OverlayConfig,

    /// Auto-layout defaults
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Canvas editing behaviour
    #[serde(default)]
    pub editor: EditorSettings,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the REST API, including the context path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session token sent in the `token` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Project that scopes every call
    #[serde(default)]
    pub project_code: i64,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayConfig {
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorSettings {
    /// Offset applied to a copied node
    #[serde(default = "default_copy_offset")]
    pub copy_offset_x: f64,
    #[serde(default = "default_copy_offset")]
    pub copy_offset_y: f64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:12345/dolphinscheduler".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_copy_offset() -> f64 {
    100.0
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            token: None,
            project_code: 0,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            copy_offset_x: default_copy_offset(),
            copy_offset_y: default_copy_offset(),
        }
    }
}

impl EditorSettings {
    pub fn copy_offset(&self) -> (f64, f64) {
        (self.copy_offset_x, self.copy_offset_y)
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
