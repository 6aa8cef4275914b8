use crate::core::types::{ErrorCategory, ErrorSeverity};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub code: String,
    pub message: String,
    pub context: HashMap<String, String>,
    pub recovery_suggestions: Vec<String>,
    pub occurred_at: DateTime<Utc>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        let severity = match category {
            ErrorCategory::ValidationError => ErrorSeverity::Warning,
            ErrorCategory::NetworkError
            | ErrorCategory::CorruptGraph
            | ErrorCategory::SerializationError
            | ErrorCategory::ConfigError
            | ErrorCategory::IoError
            | ErrorCategory::InternalError => ErrorSeverity::Error,
        };
        AppError {
            category,
            severity,
            code: format!("ERR-{}", uuid::Uuid::new_v4()),
            message: message.into(),
            context: HashMap::new(),
            recovery_suggestions: vec![],
            occurred_at: Utc::now(),
            source: None,
        }
    }

    pub fn with_source<T: Into<String>>(
        category: ErrorCategory,
        message: T,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        let mut error = AppError::new(category, message);
        error.source = Some(anyhow::anyhow!(source));
        error
    }

    pub fn with_context<T: Into<String>>(mut self, context: T) -> Self {
        self.context.insert("context".to_string(), context.into());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_suggestion<T: Into<String>>(mut self, suggestion: T) -> Self {
        self.recovery_suggestions.push(suggestion.into());
        self
    }

    pub fn add_context(&mut self, key: &str, value: &str) {
        self.context.insert(key.to_string(), value.to_string());
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        if !self.context.is_empty() {
            write!(f, " (Context: {:?})", self.context)?;
        }
        if let Some(ref source) = self.source {
            write!(f, "\nCaused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        let mut error = AppError::new(ErrorCategory::InternalError, e.to_string())
            .with_code("ANYHOW_ERROR");
        error.source = Some(e);
        error
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        let mut error = AppError::new(ErrorCategory::IoError, e.to_string())
            .with_code("IO_ERROR")
            .with_suggestion("Check file permissions and paths");
        error.source = Some(anyhow::anyhow!(e));
        error
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        let mut error = AppError::new(ErrorCategory::SerializationError, e.to_string())
            .with_code("JSON_ERROR");
        error.source = Some(anyhow::anyhow!(e));
        error
    }
}

/// Sink for user-visible messages (toasts in the console, stderr in the CLI).
pub trait Notifier: Send + Sync {
    fn notify_error(&self, error: &AppError);
    fn notify_warning(&self, message: &str);
    fn notify_info(&self, message: &str);
}

/// Routes notifications into the tracing pipeline.
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        TracingNotifier
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for TracingNotifier {
    fn notify_error(&self, error: &AppError) {
        tracing::error!(code = %error.code, category = %error.category, "{}", error.message);
    }

    fn notify_warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn notify_info(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// A delivered notification, as recorded by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Error {
        category: ErrorCategory,
        message: String,
    },
    Warning(String),
    Info(String),
}

/// Keeps every notification in memory; embedders drain it to render toasts.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }

    fn push(&self, notification: Notification) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(notification);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, error: &AppError) {
        self.push(Notification::Error {
            category: error.category,
            message: error.message.clone(),
        });
    }

    fn notify_warning(&self, message: &str) {
        self.push(Notification::Warning(message.to_string()));
    }

    fn notify_info(&self, message: &str) {
        self.push(Notification::Info(message.to_string()));
    }
}
