pub mod config;
pub mod dag;
pub mod error;
pub mod types;

pub use config::{ConfigLoader, ConfigValidator, EditorConfig};
pub use error::{AppError, Notifier, RecordingNotifier, TracingNotifier};
pub use types::*;
